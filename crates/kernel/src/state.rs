//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::engine::{FetchMode, QueryEngine};
use crate::metrics::Metrics;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool.
    db: PgPool,

    /// Paginated access to categories and items.
    engine: QueryEngine,

    /// Prometheus metrics.
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create new application state with database connections.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        db::ensure_schema(&db)
            .await
            .context("failed to ensure schema")?;

        info!(fetch = %config.fetch_mode, "Query engine ready");

        Ok(Self::from_parts(
            db,
            config.fetch_mode,
            config.statement_timeout,
        ))
    }

    /// Assemble state from an existing pool.
    ///
    /// Used by tests, which manage their own pool and schema.
    pub fn from_parts(
        db: PgPool,
        fetch: FetchMode,
        statement_timeout: std::time::Duration,
    ) -> Self {
        let metrics = Arc::new(Metrics::new());
        let engine = QueryEngine::new(db.clone(), fetch, statement_timeout, metrics.clone());

        Self {
            inner: Arc::new(AppStateInner {
                db,
                engine,
                metrics,
            }),
        }
    }

    /// Get the database pool.
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Get the query engine.
    pub fn engine(&self) -> &QueryEngine {
        &self.inner.engine
    }

    /// Get the metrics registry.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }
}
