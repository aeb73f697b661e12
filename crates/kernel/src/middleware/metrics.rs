//! Request metrics middleware.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Path label for requests that matched no route.
pub const UNMATCHED_PATH: &str = "unmatched";

/// Record method, route template, status and latency for every request.
///
/// Requests are labelled by the route they matched (`/items/{id}`), never
/// by the raw URI, so arbitrary ids cannot grow the label set.
pub async fn track_requests(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_PATH, MatchedPath::as_str)
        .to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    state.metrics().record_request(
        &method,
        &route,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );

    response
}
