//! Item model, filters and write payload.
//!
//! Every item references exactly one category. The category is carried on
//! the row only when it was joined into the query (eager fetch) or resolved
//! afterwards through the engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_query::{Alias, Expr, SelectStatement, SimpleExpr};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::QueryScalar;
use sqlx::{FromRow, Row};

use super::category::Category;
use super::require_text;
use crate::engine::schema::{
    CATEGORY_COLUMNS, CategoryIden, ITEM_COLUMNS, ItemIden, category_alias,
};
use crate::engine::{Draft, EngineError, EngineResult, Entity, EntityKind, FetchMode};

/// Maximum length of an item SKU.
pub const SKU_MAX_LEN: usize = 64;

/// Maximum length of an item name.
pub const NAME_MAX_LEN: usize = 128;

/// Exclusive upper bound for `NUMERIC(10,2)`.
const PRICE_LIMIT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// A stocked item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,

    /// Unique stock-keeping unit, e.g. `SKU000042`.
    pub sku: String,

    pub name: String,

    /// Non-negative, two fractional digits.
    pub price: Decimal,

    pub stock: i32,

    pub category_id: i64,

    /// Strictly increases on every update.
    pub updated_at: DateTime<Utc>,

    /// Referenced category, when joined or resolved.
    pub category: Option<Category>,
}

impl<'r> FromRow<'r, PgRow> for Item {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let category = match row.try_get::<i64, _>(category_alias(CategoryIden::Id).as_str()) {
            Ok(id) => Some(Category {
                id,
                code: row.try_get(category_alias(CategoryIden::Code).as_str())?,
                name: row.try_get(category_alias(CategoryIden::Name).as_str())?,
                updated_at: row.try_get(category_alias(CategoryIden::UpdatedAt).as_str())?,
            }),
            Err(sqlx::Error::ColumnNotFound(_)) => None,
            Err(e) => return Err(e),
        };

        Ok(Self {
            id: row.try_get("id")?,
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            price: row.try_get("price")?,
            stock: row.try_get("stock")?,
            category_id: row.try_get("category_id")?,
            updated_at: row.try_get("updated_at")?,
            category,
        })
    }
}

/// Equality filters for item listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFilter {
    /// Items referencing one category.
    CategoryId(i64),
}

impl Entity for Item {
    type Iden = ItemIden;
    type Filter = ItemFilter;

    const KIND: EntityKind = EntityKind::Item;
    const TABLE: ItemIden = ItemIden::Table;
    const ID: ItemIden = ItemIden::Id;

    fn select_columns(query: &mut SelectStatement, mode: FetchMode) {
        query.columns(ITEM_COLUMNS.map(|column| (ItemIden::Table, column)));

        if mode.eager_fetch() {
            for column in CATEGORY_COLUMNS {
                query.expr_as(
                    Expr::col((CategoryIden::Table, column)),
                    Alias::new(category_alias(column)),
                );
            }
            // category_id is NOT NULL with a foreign key, so the inner join
            // keeps every item row.
            query.inner_join(
                CategoryIden::Table,
                Expr::col((ItemIden::Table, ItemIden::CategoryId))
                    .equals((CategoryIden::Table, CategoryIden::Id)),
            );
        }
    }

    fn filter_condition(filter: &ItemFilter) -> SimpleExpr {
        match *filter {
            ItemFilter::CategoryId(id) => Expr::col((ItemIden::Table, ItemIden::CategoryId)).eq(id),
        }
    }
}

/// Input for creating or replacing an item.
///
/// Required numeric fields are optional here so a missing field is reported
/// as a validation error naming it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    #[serde(skip)]
    pub id: Option<i64>,

    #[serde(default)]
    pub sku: String,

    #[serde(default)]
    pub name: String,

    pub price: Option<Decimal>,

    pub stock: Option<i32>,

    pub category_id: Option<i64>,
}

impl ItemDraft {
    /// Target an existing row.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

impl Draft for ItemDraft {
    type Entity = Item;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> EngineResult<()> {
        require_text("sku", &self.sku, SKU_MAX_LEN)?;
        require_text("name", &self.name, NAME_MAX_LEN)?;

        let price = self
            .price
            .ok_or_else(|| EngineError::validation("price", "is required"))?;
        if price < Decimal::ZERO {
            return Err(EngineError::validation("price", "must not be negative"));
        }
        if price.normalize().scale() > 2 {
            return Err(EngineError::validation(
                "price",
                "must have at most 2 fractional digits",
            ));
        }
        if price >= PRICE_LIMIT {
            return Err(EngineError::validation(
                "price",
                "must be less than 100000000",
            ));
        }

        match self.stock {
            None => return Err(EngineError::validation("stock", "is required")),
            Some(stock) if stock < 0 => {
                return Err(EngineError::validation("stock", "must not be negative"));
            }
            Some(_) => {}
        }

        if self.category_id.is_none() {
            return Err(EngineError::validation("categoryId", "is required"));
        }
        Ok(())
    }

    fn category_ref(&self) -> Option<i64> {
        self.category_id
    }

    fn insert(&self) -> QueryScalar<'_, sqlx::Postgres, i64, PgArguments> {
        sqlx::query_scalar(
            r#"
            INSERT INTO item (sku, name, price, stock, category_id, updated_at)
            VALUES ($1, $2, $3, $4, $5, clock_timestamp())
            RETURNING id
            "#,
        )
        .bind(&self.sku)
        .bind(&self.name)
        .bind(self.price)
        .bind(self.stock)
        .bind(self.category_id)
    }

    fn update(&self, id: i64) -> QueryScalar<'_, sqlx::Postgres, i64, PgArguments> {
        sqlx::query_scalar(
            r#"
            UPDATE item
            SET sku = $1,
                name = $2,
                price = $3,
                stock = $4,
                category_id = $5,
                updated_at = GREATEST(clock_timestamp(), updated_at + INTERVAL '1 microsecond')
            WHERE id = $6
            RETURNING id
            "#,
        )
        .bind(&self.sku)
        .bind(&self.name)
        .bind(self.price)
        .bind(self.stock)
        .bind(self.category_id)
        .bind(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn draft() -> ItemDraft {
        ItemDraft {
            id: None,
            sku: "SKU000001".into(),
            name: "Premium Steel Widget".into(),
            price: Some(Decimal::new(1999, 2)),
            stock: Some(10),
            category_id: Some(1),
        }
    }

    fn field_of(err: EngineError) -> &'static str {
        match err {
            EngineError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_draft() {
        assert!(draft().validate().is_ok());
        let zero = ItemDraft {
            price: Some(Decimal::ZERO),
            stock: Some(0),
            ..draft()
        };
        assert!(zero.validate().is_ok());
    }

    #[test]
    fn missing_fields_are_named() {
        let cases = [
            (ItemDraft { sku: String::new(), ..draft() }, "sku"),
            (ItemDraft { name: " ".into(), ..draft() }, "name"),
            (ItemDraft { price: None, ..draft() }, "price"),
            (ItemDraft { stock: None, ..draft() }, "stock"),
            (ItemDraft { category_id: None, ..draft() }, "categoryId"),
        ];
        for (draft, field) in cases {
            assert_eq!(field_of(draft.validate().unwrap_err()), field);
        }
    }

    #[test]
    fn price_bounds() {
        let negative = ItemDraft {
            price: Some(Decimal::new(-1, 2)),
            ..draft()
        };
        assert_eq!(field_of(negative.validate().unwrap_err()), "price");

        let too_precise = ItemDraft {
            price: Some(Decimal::new(1999, 3)),
            ..draft()
        };
        assert_eq!(field_of(too_precise.validate().unwrap_err()), "price");

        let trailing_zeros = ItemDraft {
            price: Some(Decimal::new(19_900, 3)),
            ..draft()
        };
        assert!(trailing_zeros.validate().is_ok());

        let too_large = ItemDraft {
            price: Some(Decimal::new(100_000_000, 0)),
            ..draft()
        };
        assert_eq!(field_of(too_large.validate().unwrap_err()), "price");

        let largest = ItemDraft {
            price: Some(Decimal::new(9_999_999_999, 2)),
            ..draft()
        };
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn negative_stock_rejected() {
        let draft = ItemDraft {
            stock: Some(-1),
            ..draft()
        };
        assert_eq!(field_of(draft.validate().unwrap_err()), "stock");
    }

    #[test]
    fn deserializes_camel_case_body() {
        let draft: ItemDraft = serde_json::from_str(
            r#"{"sku": "SKU000002", "name": "Rake", "price": 12.5, "stock": 3, "categoryId": 4}"#,
        )
        .unwrap();
        assert_eq!(draft.category_ref(), Some(4));
        assert_eq!(draft.price, Some(Decimal::new(125, 1)));
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn serializes_embedded_category() {
        let item = Item {
            id: 1,
            sku: "SKU000001".into(),
            name: "Rake".into(),
            price: Decimal::new(1250, 2),
            stock: 3,
            category_id: 2,
            updated_at: Utc::now(),
            category: Some(Category {
                id: 2,
                code: "CAT0002".into(),
                name: "Garden".into(),
                updated_at: Utc::now(),
            }),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["categoryId"], 2);
        assert_eq!(json["category"]["code"], "CAT0002");
        assert_eq!(json["price"], 12.5);
    }
}
