//! Catalog Kernel Library
//!
//! Paginated relational access to categories and items, served over HTTP.
//! The `catalog` binary and the integration tests build the same router
//! through [`app`].

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;

use axum::Router;

pub use config::Config;
pub use state::AppState;

/// Build the application router: every route plus request metrics.
pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::track_requests,
        ))
        .with_state(state)
}
