//! Database connection pool management.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::config::Config;
use crate::engine::schema;

/// Create a PostgreSQL connection pool.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.database_acquire_timeout)
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    Ok(pool)
}

/// Create the category and item tables if they do not exist yet.
///
/// Runs every statement in one transaction so a half-created schema is never
/// left behind.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    let mut tx = pool.begin().await.context("failed to start transaction")?;

    for statement in schema::create_statements() {
        sqlx::query(&statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to apply schema statement: {statement}"))?;
    }

    tx.commit().await.context("failed to commit schema")?;
    info!("Schema ensured");

    Ok(())
}

/// Check if the database connection is healthy.
pub async fn check_health(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}
