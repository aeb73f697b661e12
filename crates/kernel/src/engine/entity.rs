//! Entities the engine can page through.

use std::fmt;

use sea_query::{Iden, SelectStatement, SimpleExpr};
use serde::Serialize;
use sqlx::FromRow;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::QueryScalar;

use super::error::EngineResult;
use super::fetch::FetchMode;

/// Which table a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Category,
    Item,
}

impl EntityKind {
    /// Table name, also used as the metrics label.
    pub fn table(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Item => "item",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// A row type backed by one table with a `BIGINT` primary key.
///
/// Implementors describe their select shape per fetch mode and how their
/// equality filters translate to a predicate. The query builder turns that
/// into the page, count and single-row statements.
pub trait Entity: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static {
    /// Identifier type for the table and its columns.
    type Iden: Iden + Copy + 'static;

    /// Equality filters supported by [`super::QueryEngine::list_by_filter`].
    type Filter: Send + Sync;

    const KIND: EntityKind;
    const TABLE: Self::Iden;
    const ID: Self::Iden;

    /// Add the selected columns (and any joins) for the given mode.
    fn select_columns(query: &mut SelectStatement, mode: FetchMode);

    /// Predicate for one filter, shared by the page and count queries.
    fn filter_condition(filter: &Self::Filter) -> SimpleExpr;
}

/// A write payload for an [`Entity`].
///
/// No `id` means insert; an `id` means a full-row update.
pub trait Draft: Send + Sync {
    type Entity: Entity;

    /// Target row for an update.
    fn id(&self) -> Option<i64>;

    /// Check required fields before any store access.
    fn validate(&self) -> EngineResult<()>;

    /// Category the written row must reference, if any.
    fn category_ref(&self) -> Option<i64> {
        None
    }

    /// `INSERT ... RETURNING id`.
    fn insert(&self) -> QueryScalar<'_, sqlx::Postgres, i64, PgArguments>;

    /// `UPDATE ... WHERE id = $n RETURNING id`.
    fn update(&self, id: i64) -> QueryScalar<'_, sqlx::Postgres, i64, PgArguments>;
}
