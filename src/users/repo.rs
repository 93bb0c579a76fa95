use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgArguments, query::QueryAs, PgPool, Postgres};
use tracing::{error, instrument};

use crate::error::{AdminError, AdminResult, StoreOp};
use crate::users::repo_types::{NewUser, User, UserPatch};
use crate::users::store::UserStore;

/// `UserStore` backed directly by the Postgres `users` table.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
    timeout: Duration,
}

impl PgUserStore {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    async fn bounded<T>(
        &self,
        op: StoreOp,
        email: &str,
        fut: impl Future<Output = Result<T, sqlx::Error>>,
    ) -> AdminResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(|e| classify(op, email, e)),
            Err(_) => Err(timed_out(op, self.timeout)),
        }
    }
}

fn timed_out(op: StoreOp, after: Duration) -> AdminError {
    AdminError::unavailable(op, format!("timed out after {}s", after.as_secs()))
}

/// Constraint and other database-side errors on a write are rejections;
/// everything else (io, tls, pool, protocol, failures on reads) means the
/// store itself is not usable right now.
pub(crate) fn classify(op: StoreOp, email: &str, err: sqlx::Error) -> AdminError {
    match err {
        sqlx::Error::Database(db) if op.is_write() => {
            error!(%op, email, error = %db, "write rejected by database");
            AdminError::rejected(op, email, db.message())
        }
        other => {
            error!(%op, email, error = %other, "database unavailable");
            AdminError::unavailable(op, other)
        }
    }
}

fn update_query<'q>(
    email: &'q str,
    patch: &'q UserPatch,
) -> QueryAs<'q, Postgres, User, PgArguments> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
           SET email = COALESCE($2, email),
               name = COALESCE($3, name),
               password_hash = COALESCE($4, password_hash),
               is_admin = COALESCE($5, is_admin)
         WHERE email = $1
        RETURNING id, email, COALESCE(name, '') AS name, password_hash,
                  COALESCE(is_admin, FALSE) AS is_admin, created_at
        "#,
    )
    .bind(email)
    .bind(patch.email.as_deref())
    .bind(patch.name.as_deref())
    .bind(patch.password_hash.as_deref())
    .bind(patch.is_admin)
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip(self))]
    async fn find(&self, email: &str) -> AdminResult<Option<User>> {
        let query = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, COALESCE(name, '') AS name, password_hash,
                   COALESCE(is_admin, FALSE) AS is_admin, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email);
        self.bounded(StoreOp::Find, email, query.fetch_optional(&self.db))
            .await
    }

    #[instrument(skip(self))]
    async fn list(&self) -> AdminResult<Vec<User>> {
        let query = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, COALESCE(name, '') AS name, password_hash,
                   COALESCE(is_admin, FALSE) AS is_admin, created_at
            FROM users
            ORDER BY created_at
            "#,
        );
        self.bounded(StoreOp::List, "*", query.fetch_all(&self.db))
            .await
    }

    #[instrument(skip(self, user), fields(email = %user.email, id = %user.id))]
    async fn insert(&self, user: NewUser) -> AdminResult<User> {
        let query = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, password_hash, is_admin, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, email, COALESCE(name, '') AS name, password_hash,
                  COALESCE(is_admin, FALSE) AS is_admin, created_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(user.created_at);
        self.bounded(StoreOp::Insert, &user.email, query.fetch_one(&self.db))
            .await
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, email: &str, patch: &UserPatch) -> AdminResult<User> {
        self.bounded(
            StoreOp::Update,
            email,
            update_query(email, patch).fetch_optional(&self.db),
        )
        .await?
        .ok_or_else(|| AdminError::rejected(StoreOp::Update, email, "no row matched"))
    }

    #[instrument(skip(self))]
    async fn delete(&self, email: &str) -> AdminResult<()> {
        let query = sqlx::query("DELETE FROM users WHERE email = $1").bind(email);
        self.bounded(StoreOp::Delete, email, query.execute(&self.db))
            .await?;
        Ok(())
    }

    /// Both writes share one transaction; dropping it on any error rolls back.
    #[instrument(skip(self, patch))]
    async fn update_and_delete(
        &self,
        email: &str,
        patch: &UserPatch,
        stale_email: &str,
    ) -> AdminResult<User> {
        let work = async {
            let mut tx = self
                .db
                .begin()
                .await
                .map_err(|e| classify(StoreOp::Update, email, e))?;

            let updated = update_query(email, patch)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| classify(StoreOp::Update, email, e))?
                .ok_or_else(|| AdminError::rejected(StoreOp::Update, email, "no row matched"))?;

            sqlx::query("DELETE FROM users WHERE email = $1")
                .bind(stale_email)
                .execute(&mut *tx)
                .await
                .map_err(|e| classify(StoreOp::Delete, stale_email, e))?;

            tx.commit()
                .await
                .map_err(|e| classify(StoreOp::Update, email, e))?;
            Ok::<_, AdminError>(updated)
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(res) => res,
            Err(_) => Err(timed_out(StoreOp::Update, self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_unavailable_even_on_writes() {
        let err = classify(StoreOp::Insert, "a@b.io", sqlx::Error::PoolTimedOut);
        assert!(matches!(
            err,
            AdminError::StoreUnavailable {
                op: StoreOp::Insert,
                ..
            }
        ));
    }

    #[test]
    fn read_failures_are_unavailable() {
        let err = classify(StoreOp::Find, "a@b.io", sqlx::Error::RowNotFound);
        assert!(matches!(err, AdminError::StoreUnavailable { op: StoreOp::Find, .. }));
    }

    #[test]
    fn timeout_message_names_the_bound() {
        let err = timed_out(StoreOp::Delete, Duration::from_secs(10));
        assert_eq!(
            err.to_string(),
            "user store unavailable during delete: timed out after 10s"
        );
    }
}
