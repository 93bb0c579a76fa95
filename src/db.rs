use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub async fn connect(
    database_url: &str,
    max_connections: u32,
    timeout: Duration,
) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(timeout)
        .connect(database_url)
        .await
        .context("connect to database")
}

/// Applies `migrations/`. Only the `migrate` subcommand calls this; the
/// maintenance commands never change the schema.
pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("apply migrations")?;
    tracing::info!("migrations applied");
    Ok(())
}
