//! Category model and write payload.

use std::convert::Infallible;

use chrono::{DateTime, Utc};
use sea_query::{SelectStatement, SimpleExpr};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::query::QueryScalar;

use super::require_text;
use crate::engine::schema::{CATEGORY_COLUMNS, CategoryIden};
use crate::engine::{Draft, EngineResult, Entity, EntityKind, FetchMode};

/// Maximum length of a category code.
pub const CODE_MAX_LEN: usize = 32;

/// Maximum length of a category name.
pub const NAME_MAX_LEN: usize = 128;

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Surrogate key assigned on insert.
    pub id: i64,

    /// Short unique code, e.g. `CAT0001`.
    pub code: String,

    /// Display name.
    pub name: String,

    /// Set on every insert and update.
    pub updated_at: DateTime<Utc>,
}

impl Entity for Category {
    type Iden = CategoryIden;

    /// Categories are only ever listed unfiltered.
    type Filter = Infallible;

    const KIND: EntityKind = EntityKind::Category;
    const TABLE: CategoryIden = CategoryIden::Table;
    const ID: CategoryIden = CategoryIden::Id;

    fn select_columns(query: &mut SelectStatement, _mode: FetchMode) {
        query.columns(CATEGORY_COLUMNS.map(|column| (CategoryIden::Table, column)));
    }

    fn filter_condition(filter: &Infallible) -> SimpleExpr {
        match *filter {}
    }
}

/// Input for creating or replacing a category.
///
/// The id comes from the request path, never from the body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDraft {
    #[serde(skip)]
    pub id: Option<i64>,

    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub name: String,
}

impl CategoryDraft {
    /// Target an existing row.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

impl Draft for CategoryDraft {
    type Entity = Category;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> EngineResult<()> {
        require_text("code", &self.code, CODE_MAX_LEN)?;
        require_text("name", &self.name, NAME_MAX_LEN)
    }

    fn insert(&self) -> QueryScalar<'_, sqlx::Postgres, i64, PgArguments> {
        sqlx::query_scalar(
            r#"
            INSERT INTO category (code, name, updated_at)
            VALUES ($1, $2, clock_timestamp())
            RETURNING id
            "#,
        )
        .bind(&self.code)
        .bind(&self.name)
    }

    fn update(&self, id: i64) -> QueryScalar<'_, sqlx::Postgres, i64, PgArguments> {
        sqlx::query_scalar(
            r#"
            UPDATE category
            SET code = $1,
                name = $2,
                updated_at = GREATEST(clock_timestamp(), updated_at + INTERVAL '1 microsecond')
            WHERE id = $3
            RETURNING id
            "#,
        )
        .bind(&self.code)
        .bind(&self.name)
        .bind(id)
    }
}
