//! Configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::engine::FetchMode;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 8080).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// How long a request may wait for a pooled connection (default: 30s).
    pub database_acquire_timeout: Duration,

    /// Per-transaction statement timeout (default: 10s).
    pub statement_timeout: Duration,

    /// Whether list/detail reads join the parent category (USE_JOIN_FETCH, default: true).
    pub fetch_mode: FetchMode,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let acquire_secs: u64 = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("DATABASE_ACQUIRE_TIMEOUT_SECS must be a valid u64")?;

        let statement_timeout_ms: u64 = env::var("STATEMENT_TIMEOUT_MS")
            .unwrap_or_else(|_| "10000".to_string())
            .parse()
            .context("STATEMENT_TIMEOUT_MS must be a valid u64")?;

        let fetch_mode = FetchMode::from_flag(env::var("USE_JOIN_FETCH").ok().as_deref());

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            database_acquire_timeout: Duration::from_secs(acquire_secs),
            statement_timeout: Duration::from_millis(statement_timeout_ms),
            fetch_mode,
            cors_allowed_origins,
        })
    }
}
