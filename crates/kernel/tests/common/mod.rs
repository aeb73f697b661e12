#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Tests drive the REAL router returned by [`catalog_kernel::app`], backed
//! either by an isolated schema from [`TestDb`] or by a pool that can never
//! connect. The latter proves a request was rejected before the store was
//! touched.

#![allow(dead_code)]

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use catalog_kernel::AppState;
use catalog_kernel::engine::FetchMode;
use catalog_test_utils::TestDb;

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    db: Option<TestDb>,
}

impl TestApp {
    /// Application over an isolated schema with the tables created.
    pub async fn new(db: TestDb, fetch: FetchMode) -> Self {
        catalog_kernel::db::ensure_schema(&db.pool)
            .await
            .expect("Failed to create schema");

        let state = AppState::from_parts(db.pool.clone(), fetch, Duration::from_secs(10));
        Self {
            router: catalog_kernel::app(state.clone()),
            state,
            db: Some(db),
        }
    }

    /// Application whose pool points at a closed port.
    ///
    /// Any request that reaches the store fails (500 or 503).
    pub fn offline(fetch: FetchMode) -> Self {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(100))
            .connect_lazy("postgres://nobody@127.0.0.1:1/offline")
            .expect("Failed to build lazy pool");

        let state = AppState::from_parts(pool, fetch, Duration::from_secs(1));
        Self {
            router: catalog_kernel::app(state.clone()),
            state,
            db: None,
        }
    }

    /// Pool of the backing schema.
    pub fn pool(&self) -> &sqlx::PgPool {
        self.state.db()
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// `GET` a path and decode the JSON body.
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");
        let response = self.request(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    /// Send a JSON body and return status, headers and decoded body.
    pub async fn send(&self, method: Method, uri: &str, body: &Value) -> (StatusCode, HeaderMap, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        let response = self.request(request).await;
        let status = response.status();
        let headers = response.headers().clone();
        (status, headers, body_json(response).await)
    }

    /// Send a raw body with a JSON content type.
    pub async fn send_raw(&self, method: Method, uri: &str, body: &'static str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("Failed to build request");
        let response = self.request(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    /// `DELETE` a path and return the status.
    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");
        let response = self.request(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    /// Drop the backing schema.
    pub async fn cleanup(self) {
        if let Some(db) = self.db {
            db.cleanup().await;
        }
    }
}

/// Read a response body as JSON; empty bodies become `Value::Null` and
/// non-JSON bodies become a string.
pub async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}
