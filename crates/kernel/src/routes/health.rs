//! Health check endpoint.
//!
//! Returns 200 OK if PostgreSQL is reachable, 503 Service Unavailable
//! otherwise.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::db;
use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    postgres: bool,
    fetch: &'static str,
}

/// Health check handler.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let postgres = db::check_health(state.db()).await;

    let (status_code, status) = if postgres {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            postgres,
            fetch: state.engine().fetch_mode().as_str(),
        }),
    )
}

/// Create the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
