use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{error, instrument};

use crate::error::{AdminError, AdminResult, StoreOp};
use crate::users::repo_types::{NewUser, User, UserPatch};
use crate::users::store::UserStore;

/// `UserStore` over a PostgREST endpoint (`{base}/rest/v1/{table}`).
///
/// PostgREST has no multi-statement transactions, so `update_and_delete`
/// keeps the trait's delete-first ordering. A failed target update after
/// the delete can leave no admin row until the command is re-run.
#[derive(Clone)]
pub struct RestUserStore {
    client: Client,
    table_url: String,
    api_key: String,
}

impl RestUserStore {
    pub fn new(base_url: &str, api_key: &str, table: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            table_url: table_url(base_url, table),
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: reqwest::Method) -> RequestBuilder {
        self.client
            .request(method, &self.table_url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .header(header::ACCEPT, "application/json")
    }

    async fn send<T: DeserializeOwned>(
        &self,
        op: StoreOp,
        email: &str,
        req: RequestBuilder,
    ) -> AdminResult<T> {
        let res = req.send().await.map_err(|e| transport(op, e))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(classify_status(op, email, status, &body));
        }
        res.json::<T>().await.map_err(|e| transport(op, e))
    }
}

fn table_url(base_url: &str, table: &str) -> String {
    format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table)
}

fn eq(email: &str) -> [(&'static str, String); 1] {
    [("email", format!("eq.{email}"))]
}

fn transport(op: StoreOp, err: reqwest::Error) -> AdminError {
    error!(%op, error = %err, "user store request failed");
    if err.is_timeout() {
        AdminError::unavailable(op, "request timed out")
    } else {
        AdminError::unavailable(op, err)
    }
}

/// Auth failures, server errors and any non-success read mean the store is
/// unavailable to us; a client error on a write is the store declining it.
pub(crate) fn classify_status(op: StoreOp, email: &str, status: StatusCode, body: &str) -> AdminError {
    let reason = if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    };
    let auth = matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN);
    if op.is_write() && status.is_client_error() && !auth {
        error!(%op, email, %status, "write rejected by user store");
        AdminError::rejected(op, email, reason)
    } else {
        error!(%op, email, %status, "user store unavailable");
        AdminError::unavailable(op, reason)
    }
}

#[async_trait]
impl UserStore for RestUserStore {
    #[instrument(skip(self))]
    async fn find(&self, email: &str) -> AdminResult<Option<User>> {
        let req = self
            .request(reqwest::Method::GET)
            .query(&[("select", "*")])
            .query(&eq(email));
        let rows: Vec<User> = self.send(StoreOp::Find, email, req).await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn list(&self) -> AdminResult<Vec<User>> {
        let req = self
            .request(reqwest::Method::GET)
            .query(&[("select", "*"), ("order", "created_at.asc")]);
        self.send(StoreOp::List, "*", req).await
    }

    #[instrument(skip(self, user), fields(email = %user.email, id = %user.id))]
    async fn insert(&self, user: NewUser) -> AdminResult<User> {
        let req = self.request(reqwest::Method::POST).json(&user);
        let rows: Vec<User> = self.send(StoreOp::Insert, &user.email, req).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AdminError::rejected(StoreOp::Insert, &user.email, "no row returned"))
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, email: &str, patch: &UserPatch) -> AdminResult<User> {
        let req = self
            .request(reqwest::Method::PATCH)
            .query(&eq(email))
            .json(patch);
        let rows: Vec<User> = self.send(StoreOp::Update, email, req).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AdminError::rejected(StoreOp::Update, email, "no row matched"))
    }

    #[instrument(skip(self))]
    async fn delete(&self, email: &str) -> AdminResult<()> {
        let req = self.request(reqwest::Method::DELETE).query(&eq(email));
        let _removed: Vec<User> = self.send(StoreOp::Delete, email, req).await?;
        Ok(())
    }
}
