//! Catalog test utilities.
//!
//! Helpers for integration testing: an isolated PostgreSQL schema per test,
//! a small fixed data set, request payload builders, and assertion helpers
//! for page envelopes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Connection, PgConnection};

static SCHEMA_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A connection pool bound to a fresh, empty schema.
///
/// Every connection in the pool has `search_path` set to the schema, so
/// unqualified table names resolve inside it and tests never see each
/// other's rows.
pub struct TestDb {
    pub pool: PgPool,
    pub schema: String,
    url: String,
}

impl TestDb {
    /// Connect using `DATABASE_URL`.
    ///
    /// Returns `None` when `DATABASE_URL` is unset so callers can skip.
    pub async fn connect() -> Option<Self> {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL").ok()?;

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or_default();
        let schema = format!(
            "catalog_test_{}_{}_{nanos}",
            std::process::id(),
            SCHEMA_COUNTER.fetch_add(1, Ordering::Relaxed)
        );

        let mut conn = PgConnection::connect(&url)
            .await
            .expect("Failed to connect to DATABASE_URL");
        sqlx::query(&format!("CREATE SCHEMA \"{schema}\""))
            .execute(&mut conn)
            .await
            .expect("Failed to create test schema");
        conn.close().await.ok();

        let options: PgConnectOptions = url.parse().expect("Invalid DATABASE_URL");
        let options = options.options([("search_path", schema.as_str())]);
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .expect("Failed to create test pool");

        Some(Self { pool, schema, url })
    }

    /// Close the pool and drop the schema with everything in it.
    pub async fn cleanup(self) {
        self.pool.close().await;

        if let Ok(mut conn) = PgConnection::connect(&self.url).await {
            sqlx::query(&format!("DROP SCHEMA IF EXISTS \"{}\" CASCADE", self.schema))
                .execute(&mut conn)
                .await
                .ok();
            conn.close().await.ok();
        }
    }
}

/// Get a [`TestDb`] or return early from the test when no database is
/// configured.
#[macro_export]
macro_rules! require_db {
    () => {
        match $crate::TestDb::connect().await {
            Some(db) => db,
            None => {
                eprintln!("skipping: DATABASE_URL is not set");
                return;
            }
        }
    };
}

/// Items per category in the fixed scenario.
///
/// Five categories and twelve items; the first category has four items and
/// the last has none.
pub const SCENARIO_ITEMS_PER_CATEGORY: [usize; 5] = [4, 3, 3, 2, 0];

/// Ids created by [`seed_scenario`].
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Category ids in insertion order.
    pub categories: Vec<i64>,
    /// `(item id, category id)` in insertion (and id) order.
    pub items: Vec<(i64, i64)>,
}

impl Scenario {
    /// Item ids referencing one category, ascending.
    pub fn items_in(&self, category_id: i64) -> Vec<i64> {
        self.items
            .iter()
            .filter(|(_, c)| *c == category_id)
            .map(|(id, _)| *id)
            .collect()
    }

    /// All item ids, ascending.
    pub fn item_ids(&self) -> Vec<i64> {
        self.items.iter().map(|(id, _)| *id).collect()
    }
}

/// Insert the fixed scenario.
///
/// The `category` and `item` tables must already exist. Items are inserted
/// round-robin across categories so a category's items are not contiguous
/// by id.
pub async fn seed_scenario(pool: &PgPool) -> Scenario {
    let mut categories = Vec::new();
    for n in 1..=SCENARIO_ITEMS_PER_CATEGORY.len() {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO category (code, name, updated_at) VALUES ($1, $2, clock_timestamp()) RETURNING id",
        )
        .bind(format!("TST{n:04}"))
        .bind(format!("Test Category {n}"))
        .fetch_one(pool)
        .await
        .expect("Failed to insert category");
        categories.push(id);
    }

    let rounds = SCENARIO_ITEMS_PER_CATEGORY.iter().max().copied().unwrap_or(0);
    let mut items = Vec::new();
    for round in 0..rounds {
        for (idx, &count) in SCENARIO_ITEMS_PER_CATEGORY.iter().enumerate() {
            if round >= count {
                continue;
            }
            let n = items.len() + 1;
            let category_id = categories[idx];
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO item (sku, name, price, stock, category_id, updated_at)
                VALUES ($1, $2, $3::numeric, $4, $5, clock_timestamp())
                RETURNING id
                "#,
            )
            .bind(format!("TSTSKU{n:04}"))
            .bind(format!("Test Item {n}"))
            .bind(format!("{}.99", 10 + n))
            .bind(i32::try_from(n * 5).unwrap())
            .bind(category_id)
            .fetch_one(pool)
            .await
            .expect("Failed to insert item");
            items.push((id, category_id));
        }
    }

    Scenario { categories, items }
}

/// Request payload builders.
pub mod payloads {
    use serde_json::{Value, json};

    /// Body for `POST /categories`.
    pub fn category(code: &str, name: &str) -> Value {
        json!({ "code": code, "name": name })
    }

    /// Body for `POST /items`.
    pub fn item(sku: &str, category_id: i64) -> Value {
        json!({
            "sku": sku,
            "name": format!("Item {sku}"),
            "price": 12.5,
            "stock": 7,
            "categoryId": category_id,
        })
    }
}

/// Assertion helpers for JSON content.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Assert the page envelope shape and totals.
    pub fn page(value: &Value, len: usize, total_elements: u64, total_pages: u64) {
        for key in ["content", "page", "size", "totalElements", "totalPages"] {
            has_key(value, key);
        }
        let content = value["content"].as_array().expect("content is an array");
        assert_eq!(content.len(), len, "content length in {value}");
        assert_eq!(value["totalElements"], total_elements, "in {value}");
        assert_eq!(value["totalPages"], total_pages, "in {value}");
    }

    /// Ids of the rows in a page envelope, in order.
    pub fn content_ids(value: &Value) -> Vec<i64> {
        value["content"]
            .as_array()
            .expect("content is an array")
            .iter()
            .map(|row| row["id"].as_i64().expect("row has an integer id"))
            .collect()
    }

    /// Assert that text contains every needle.
    pub fn contains_all(text: &str, needles: &[&str]) {
        for needle in needles {
            assert!(text.contains(needle), "Expected '{needle}' in:\n{text}");
        }
    }

    /// Assert that an error body carries a message.
    pub fn error_body(value: &Value) {
        let message = value["error"].as_str().unwrap_or_default();
        assert!(!message.is_empty(), "Expected error message, got: {value}");
    }
}
