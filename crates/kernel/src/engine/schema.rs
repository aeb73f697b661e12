//! Table and column identifiers for the catalog schema.
//!
//! The two tables are described here once and every generated statement
//! (DDL, selects, counts) refers to these identifiers instead of string
//! literals.

use sea_query::{
    ColumnDef, Expr, ForeignKey, ForeignKeyAction, Iden, Index, PostgresQueryBuilder, Table,
};

/// Name of the item -> category foreign key.
pub const ITEM_CATEGORY_FK: &str = "fk_item_category";

/// Column alias prefix for joined category columns.
pub const CATEGORY_ALIAS_PREFIX: &str = "category__";

/// `category` table.
#[derive(Iden, Clone, Copy)]
pub enum CategoryIden {
    #[iden = "category"]
    Table,
    Id,
    Code,
    Name,
    UpdatedAt,
}

/// `item` table.
#[derive(Iden, Clone, Copy)]
pub enum ItemIden {
    #[iden = "item"]
    Table,
    Id,
    Sku,
    Name,
    Price,
    Stock,
    CategoryId,
    UpdatedAt,
}

/// Columns selected for a category row, in select order.
pub const CATEGORY_COLUMNS: [CategoryIden; 4] = [
    CategoryIden::Id,
    CategoryIden::Code,
    CategoryIden::Name,
    CategoryIden::UpdatedAt,
];

/// Columns selected for an item row, in select order.
pub const ITEM_COLUMNS: [ItemIden; 7] = [
    ItemIden::Id,
    ItemIden::Sku,
    ItemIden::Name,
    ItemIden::Price,
    ItemIden::Stock,
    ItemIden::CategoryId,
    ItemIden::UpdatedAt,
];

/// DDL for the fixed schema, in dependency order.
///
/// Every statement is idempotent. Deleting a category that still has items
/// is rejected by the store (`ON DELETE RESTRICT`).
pub fn create_statements() -> Vec<String> {
    let category = Table::create()
        .table(CategoryIden::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(CategoryIden::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(CategoryIden::Code)
                .string_len(32)
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(CategoryIden::Name).string_len(128).not_null())
        .col(
            ColumnDef::new(CategoryIden::UpdatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .build(PostgresQueryBuilder);

    let item = Table::create()
        .table(ItemIden::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(ItemIden::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(ItemIden::Sku)
                .string_len(64)
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(ItemIden::Name).string_len(128).not_null())
        .col(ColumnDef::new(ItemIden::Price).decimal_len(10, 2).not_null())
        .col(ColumnDef::new(ItemIden::Stock).integer().not_null())
        .col(ColumnDef::new(ItemIden::CategoryId).big_integer().not_null())
        .col(
            ColumnDef::new(ItemIden::UpdatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .foreign_key(
            ForeignKey::create()
                .name(ITEM_CATEGORY_FK)
                .from(ItemIden::Table, ItemIden::CategoryId)
                .to(CategoryIden::Table, CategoryIden::Id)
                .on_delete(ForeignKeyAction::Restrict),
        )
        .build(PostgresQueryBuilder);

    let category_index = Index::create()
        .if_not_exists()
        .name("idx_item_category_id")
        .table(ItemIden::Table)
        .col(ItemIden::CategoryId)
        .build(PostgresQueryBuilder);

    vec![category, item, category_index]
}

/// Alias used for a joined category column, e.g. `category__name`.
pub fn category_alias(column: CategoryIden) -> String {
    format!("{CATEGORY_ALIAS_PREFIX}{}", column.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names() {
        assert_eq!(CategoryIden::Table.to_string(), "category");
        assert_eq!(ItemIden::Table.to_string(), "item");
        assert_eq!(ItemIden::CategoryId.to_string(), "category_id");
        assert_eq!(ItemIden::UpdatedAt.to_string(), "updated_at");
    }

    #[test]
    fn ddl_is_idempotent_and_restricts_deletes() {
        let statements = create_statements();
        assert_eq!(statements.len(), 3);

        let category = &statements[0];
        assert!(category.contains("IF NOT EXISTS"), "{category}");
        assert!(category.contains("\"category\""), "{category}");

        let item = &statements[1];
        assert!(item.contains("IF NOT EXISTS"), "{item}");
        assert!(item.contains("\"item\""), "{item}");
        assert!(item.contains("ON DELETE RESTRICT"), "{item}");
        assert!(item.contains(ITEM_CATEGORY_FK), "{item}");

        let index = &statements[2];
        assert!(index.contains("idx_item_category_id"), "{index}");
    }

    #[test]
    fn joined_column_alias() {
        assert_eq!(category_alias(CategoryIden::Name), "category__name");
        assert_eq!(category_alias(CategoryIden::Id), "category__id");
    }
}
