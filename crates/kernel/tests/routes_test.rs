#![allow(clippy::unwrap_used, clippy::expect_used)]
//! HTTP route tests.
//!
//! The first group runs against an application whose pool cannot connect:
//! a 400 there proves the request was rejected before any store access.
//! The rest need `DATABASE_URL` and are skipped without it.

mod common;

use axum::http::{Method, StatusCode, header};
use serde_json::json;

use catalog_kernel::engine::FetchMode;
use catalog_test_utils::{assert, payloads, require_db, seed_scenario};
use common::TestApp;

// =============================================================================
// Rejected before store access
// =============================================================================

#[tokio::test]
async fn invalid_pagination_is_bad_request() {
    let app = TestApp::offline(FetchMode::Eager);

    for uri in [
        "/items?size=1001",
        "/items?page=-1",
        "/items?size=0",
        "/items?size=1001&categoryId=1",
        "/categories?size=1001",
        "/categories?page=-3",
        "/categories/1/items?size=0",
    ] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}: {body}");
        assert::error_body(&body);
    }
}

#[tokio::test]
async fn malformed_parameters_are_bad_request() {
    let app = TestApp::offline(FetchMode::Lazy);

    for uri in [
        "/items?page=abc",
        "/items?categoryId=x",
        "/items/not-a-number",
        "/categories/1.5",
    ] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}: {body}");
    }
}

#[tokio::test]
async fn invalid_payloads_are_bad_request() {
    let app = TestApp::offline(FetchMode::Eager);

    let (status, _) = app.send_raw(Method::POST, "/items", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send_raw(Method::POST, "/categories", r#"{"code": 5}"#)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let cases = [
        json!({ "name": "No SKU", "price": 1.5, "stock": 1, "categoryId": 1 }),
        json!({ "sku": "S1", "name": "No price", "stock": 1, "categoryId": 1 }),
        json!({ "sku": "S1", "name": "Negative", "price": -1, "stock": 1, "categoryId": 1 }),
        json!({ "sku": "S1", "name": "No category", "price": 1.5, "stock": 1 }),
        json!({ "sku": "S1", "name": "Bad stock", "price": 1.5, "stock": -4, "categoryId": 1 }),
    ];
    for body in cases {
        let (status, _, response) = app.send(Method::POST, "/items", &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}: {response}");
        assert::error_body(&response);
    }

    let (status, _, _) = app
        .send(Method::PUT, "/categories/3", &payloads::category("", "Blank code"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_failure_is_internal_error() {
    let app = TestApp::offline(FetchMode::Eager);

    let (status, body) = app.get("/items").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal server error");
}

#[tokio::test]
async fn health_reports_unreachable_store() {
    let app = TestApp::offline(FetchMode::Lazy);

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["postgres"], false);
    assert_eq!(body["fetch"], "lazy");
}

#[tokio::test]
async fn metrics_endpoint_counts_requests() {
    let app = TestApp::offline(FetchMode::Eager);
    app.get("/items?size=0").await;

    let (status, body) = app.get("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert::contains_all(text, &["http_requests_total", "path=\"/items\"", "status=\"400\""]);
}

#[tokio::test]
async fn request_metrics_are_labelled_by_route() {
    let app = TestApp::offline(FetchMode::Eager);
    for i in 0..20 {
        let (status, _) = app.get(&format!("/items/junk{i}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        app.get(&format!("/no/such/path/{i}")).await;
    }

    let (_, body) = app.get("/metrics").await;
    let text = body.as_str().unwrap();
    let series: Vec<&str> = text
        .lines()
        .filter(|line| line.starts_with("http_requests_total{"))
        .collect();

    let item_series: Vec<&&str> = series
        .iter()
        .filter(|line| line.contains("path=\"/items/{id}\""))
        .collect();
    assert_eq!(item_series.len(), 1, "{series:#?}");
    assert!(item_series[0].ends_with(" 20"), "{item_series:?}");

    let unmatched = format!("path=\"{}\"", catalog_kernel::middleware::UNMATCHED_PATH);
    assert_eq!(
        series.iter().filter(|line| line.contains(&unmatched)).count(),
        1,
        "{series:#?}"
    );
    assert!(!text.contains("junk"), "raw path leaked into labels");
    assert!(!text.contains("/no/such/path"), "raw path leaked into labels");
}

// =============================================================================
// Against a real schema
// =============================================================================

#[tokio::test]
async fn category_crud() {
    let db = require_db!();
    let app = TestApp::new(db, FetchMode::Eager).await;

    let (status, headers, created) = app
        .send(Method::POST, "/categories", &payloads::category("CAT9001", "Outdoor"))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = created["id"].as_i64().unwrap();
    assert_eq!(headers[header::LOCATION], format!("/categories/{id}"));
    assert::has_key(&created, "updatedAt");

    let (status, fetched) = app.get(&format!("/categories/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, _, updated) = app
        .send(
            Method::PUT,
            &format!("/categories/{id}"),
            &payloads::category("CAT9001", "Outdoor Living"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Outdoor Living");

    let (status, page) = app.get("/categories?page=0&size=10").await;
    assert_eq!(status, StatusCode::OK);
    assert::page(&page, 1, 1, 1);

    let (status, _) = app.delete(&format!("/categories/{id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get(&format!("/categories/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert::error_body(&body);

    let (status, _) = app.delete(&format!("/categories/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = app
        .send(
            Method::PUT,
            &format!("/categories/{id}"),
            &payloads::category("CAT9001", "Gone"),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.cleanup().await;
}

#[tokio::test]
async fn item_crud_embeds_category_in_both_modes() {
    for mode in [FetchMode::Eager, FetchMode::Lazy] {
        let db = require_db!();
        let app = TestApp::new(db, mode).await;
        let scenario = seed_scenario(app.pool()).await;
        let category_id = scenario.categories[1];

        let (status, headers, created) = app
            .send(Method::POST, "/items", &payloads::item("NEW-1", category_id))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{mode}: {created}");
        let id = created["id"].as_i64().unwrap();
        assert_eq!(headers[header::LOCATION], format!("/items/{id}"));
        assert_eq!(created["category"]["id"], category_id, "{mode}");
        assert_eq!(created["price"], 12.5);

        let (status, fetched) = app.get(&format!("/items/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created, "{mode}");

        let moved_to = scenario.categories[2];
        let (status, _, updated) = app
            .send(
                Method::PUT,
                &format!("/items/{id}"),
                &payloads::item("NEW-1", moved_to),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["categoryId"], moved_to);
        assert_eq!(updated["category"]["id"], moved_to, "{mode}");

        let (status, body) = app.delete(&format!("/items/{id}")).await;
        assert_eq!(status, StatusCode::NO_CONTENT, "{body}");
        let (status, _) = app.get(&format!("/items/{id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.delete(&format!("/items/{id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        app.cleanup().await;
    }
}

#[tokio::test]
async fn item_with_missing_category_is_bad_request() {
    let db = require_db!();
    let app = TestApp::new(db, FetchMode::Eager).await;
    let scenario = seed_scenario(app.pool()).await;

    let (status, _, body) = app
        .send(Method::POST, "/items", &payloads::item("LOST-1", 999_999))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert::error_body(&body);

    let (item_id, _) = scenario.items[0];
    let (status, _, _) = app
        .send(
            Method::PUT,
            &format!("/items/{item_id}"),
            &payloads::item("LOST-2", 999_999),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, page) = app.get("/items?size=1").await;
    assert_eq!(page["totalElements"], 12);

    let (status, _, _) = app
        .send(Method::PUT, "/items/999999", &payloads::item("LOST-3", scenario.categories[0]))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.cleanup().await;
}

#[tokio::test]
async fn category_items_listing() {
    let db = require_db!();
    let app = TestApp::new(db, FetchMode::Lazy).await;
    let scenario = seed_scenario(app.pool()).await;
    let first = scenario.categories[0];

    let (status, page) = app
        .get(&format!("/categories/{first}/items?page=0&size=10"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert::page(&page, 4, 4, 1);
    assert_eq!(assert::content_ids(&page), scenario.items_in(first));
    for item in page["content"].as_array().unwrap() {
        assert_eq!(item["category"]["id"], first);
    }

    let (status, page) = app
        .get(&format!("/categories/{first}/items?page=1&size=10"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert::page(&page, 0, 4, 1);

    let (status, by_query) = app.get(&format!("/items?categoryId={first}&size=10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assert::content_ids(&by_query), scenario.items_in(first));

    let (status, _) = app.get("/categories/999999/items").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get("/items?categoryId=999999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.cleanup().await;
}

#[tokio::test]
async fn deleting_referenced_category_conflicts() {
    let db = require_db!();
    let app = TestApp::new(db, FetchMode::Eager).await;
    let scenario = seed_scenario(app.pool()).await;
    let first = scenario.categories[0];

    let (status, body) = app.delete(&format!("/categories/{first}")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert::error_body(&body);

    let (status, _) = app.get(&format!("/categories/{first}")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, page) = app.get(&format!("/categories/{first}/items")).await;
    assert_eq!(page["totalElements"], 4);

    let empty = scenario.categories[4];
    let (status, _) = app.delete(&format!("/categories/{empty}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    app.cleanup().await;
}

#[tokio::test]
async fn lazy_listing_pays_one_lookup_per_item() {
    let db = require_db!();
    let app = TestApp::new(db, FetchMode::Lazy).await;
    seed_scenario(app.pool()).await;

    let (status, page) = app.get("/items?page=0&size=5").await;
    assert_eq!(status, StatusCode::OK);
    assert::page(&page, 5, 12, 3);

    let metrics = app.state.metrics();
    assert_eq!(metrics.query_count("item", "page", "lazy"), 1);
    assert_eq!(metrics.query_count("item", "count", "lazy"), 1);
    assert_eq!(metrics.query_count("category", "resolve", "lazy"), 5);

    app.cleanup().await;
}

#[tokio::test]
async fn eager_and_lazy_responses_match() {
    let eager_db = require_db!();
    let eager = TestApp::new(eager_db, FetchMode::Eager).await;
    seed_scenario(eager.pool()).await;

    // Same schema, other mode.
    let lazy_state = catalog_kernel::AppState::from_parts(
        eager.pool().clone(),
        FetchMode::Lazy,
        std::time::Duration::from_secs(10),
    );
    let lazy = catalog_kernel::app(lazy_state);

    for uri in ["/items?page=0&size=5", "/items?page=2&size=5", "/items?page=9&size=5"] {
        let (_, a) = eager.get(uri).await;
        let response = tower::ServiceExt::oneshot(
            lazy.clone(),
            axum::http::Request::builder()
                .uri(uri)
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
        let b = common::body_json(response).await;
        assert_eq!(a, b, "{uri}");
    }

    let (status, beyond) = eager.get("/items?page=9&size=5").await;
    assert_eq!(status, StatusCode::OK);
    assert::page(&beyond, 0, 12, 3);

    eager.cleanup().await;
}
