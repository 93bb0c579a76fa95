use anyhow::Context;

mod admin;
mod cli;
mod config;
mod db;
mod error;
mod report;
mod state;
mod users;

use crate::admin::{dto::DEMO_ACCOUNTS, maintenance, AdminReconciler};
use crate::cli::Cmd;
use crate::config::{AppConfig, StoreConfig};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "fundai_admin=info,sqlx=warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let matches = cli::command().get_matches();
    let Some(cmd) = cli::parse(&matches) else {
        anyhow::bail!("unknown subcommand");
    };

    if cmd == Cmd::Migrate {
        let config = AppConfig::from_env()?;
        return migrate(&config).await;
    }

    let state = AppState::init().await.context("initialise user store")?;
    tracing::debug!(timeout_secs = state.config.store_timeout.as_secs(), "store ready");

    run(&state, cmd).await
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    let StoreConfig::Postgres {
        database_url,
        max_connections,
    } = &config.store
    else {
        anyhow::bail!("migrations apply only to the postgres store; manage the REST schema on the server");
    };
    let pool = db::connect(database_url, *max_connections, config.store_timeout).await?;
    db::migrate(&pool).await
}

async fn run(state: &AppState, cmd: Cmd) -> anyhow::Result<()> {
    match cmd {
        Cmd::ReconcileAdmin {
            legacy_email,
            email,
            password,
            name,
        } => {
            let report = AdminReconciler::from_state(state)
                .reconcile(&legacy_email, &email, &password, &name)
                .await
                .with_context(|| format!("reconcile admin {email} (legacy {legacy_email})"))?;
            print!("{}", report::reconcile(&report));
        }
        Cmd::ResetPassword { email, password } => {
            let report = maintenance::reset_password(state, &email, &password)
                .await
                .with_context(|| format!("reset password for {email}"))?;
            print!("{}", report::reset(&report));
            if !report.verified {
                anyhow::bail!("stored hash for {email} does not verify");
            }
        }
        Cmd::SeedUsers => {
            let outcomes = maintenance::seed_demo_users(state, DEMO_ACCOUNTS).await;
            print!("{}", report::seed(&outcomes));
            let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
            if failed > 0 {
                anyhow::bail!("{failed} of {} demo users failed", outcomes.len());
            }
        }
        Cmd::Migrate => migrate(&state.config).await?,
        Cmd::ListUsers { json } => {
            let listing = maintenance::list_users(state).await.context("list users")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                print!("{}", report::listing(&listing));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreOp;

    #[tokio::test]
    async fn reconcile_command_runs_against_injected_store() {
        let (state, store) = AppState::fake();
        let cmd = Cmd::ReconcileAdmin {
            legacy_email: "admin123@gmail.com".into(),
            email: "prabhakar@gmail.com".into(),
            password: "prabhakar@123".into(),
            name: "Prabhakar".into(),
        };

        run(&state, cmd).await.unwrap();

        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_admin);
        let digest = rows[0].password_hash.as_deref().unwrap();
        assert!(digest.starts_with("$2b$"), "expected a bcrypt digest, got {digest}");
        assert!(bcrypt::verify("prabhakar@123", digest).unwrap());
    }

    #[tokio::test]
    async fn failures_become_nonzero_exit() {
        let (state, store) = AppState::fake();
        store.fail(StoreOp::Find);
        let cmd = Cmd::ResetPassword {
            email: "prabhakar@gmail.com".into(),
            password: "pw".into(),
        };

        let err = run(&state, cmd).await.unwrap_err();

        assert!(format!("{err:#}").contains("reset password for prabhakar@gmail.com"));
    }

    #[tokio::test]
    async fn migrate_refuses_rest_store() {
        let (state, store) = AppState::fake();

        let err = run(&state, Cmd::Migrate).await.unwrap_err();

        assert!(err.to_string().contains("postgres"));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn seed_failure_is_reported() {
        let (state, store) = AppState::fake();
        store.reject(StoreOp::Insert);

        let err = run(&state, Cmd::SeedUsers).await.unwrap_err();

        assert!(err.to_string().contains("5 of 5"));
    }
}
