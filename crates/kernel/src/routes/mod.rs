//! HTTP route handlers.

pub mod category;
pub mod health;
pub mod item;
pub mod metrics;

use axum::Router;

use crate::state::AppState;

/// All API routes, without state or middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(metrics::router())
        .merge(category::router())
        .merge(item::router())
}
