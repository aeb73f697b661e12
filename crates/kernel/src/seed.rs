//! Benchmark data seeder.
//!
//! Generates the standard data set (2000 categories, 100000 items spread
//! evenly with the remainder assigned at random) and bulk-loads it with
//! `UNNEST` batch inserts. A fixed `--seed` makes the data reproducible.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;

use crate::db;
use crate::models::{Category, Item};

const ADJECTIVES: &[&str] = &[
    "Premium",
    "Standard",
    "Deluxe",
    "Classic",
    "Modern",
    "Vintage",
    "Professional",
    "Advanced",
    "Basic",
    "Elite",
    "Superior",
    "Compact",
];

const PRODUCTS: &[&str] = &[
    "Widget",
    "Gadget",
    "Tool",
    "Device",
    "Component",
    "Module",
    "Unit",
    "System",
    "Kit",
    "Set",
    "Package",
    "Bundle",
];

const MATERIALS: &[&str] = &[
    "Steel",
    "Aluminum",
    "Plastic",
    "Carbon",
    "Titanium",
    "Copper",
    "Bronze",
    "Ceramic",
    "Composite",
    "Alloy",
];

const COLORS: &[&str] = &[
    "Red", "Blue", "Green", "Black", "White", "Silver", "Gold", "Gray", "Orange", "Purple",
];

const CATEGORY_TYPES: &[&str] = &[
    "Electronics",
    "Tools",
    "Furniture",
    "Clothing",
    "Sports",
    "Books",
    "Toys",
    "Food",
    "Garden",
    "Automotive",
    "Health",
    "Beauty",
    "Jewelry",
    "Music",
    "Office",
    "Pet",
    "Baby",
    "Art",
    "Industrial",
    "Medical",
];

/// Options for `catalog seed`.
#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub categories: u32,
    pub items: u32,
    pub batch_size: usize,
    /// RNG seed; random when unset.
    pub seed: Option<u64>,
    /// Empty both tables first.
    pub truncate: bool,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            categories: 2000,
            items: 100_000,
            batch_size: 5000,
            seed: None,
            truncate: false,
        }
    }
}

fn pick<'a>(rng: &mut StdRng, words: &[&'a str]) -> &'a str {
    words[rng.gen_range(0..words.len())]
}

/// A timestamp within the last year.
fn recent_timestamp(rng: &mut StdRng, now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(rng.gen_range(0..=365))
        - Duration::hours(rng.gen_range(0..24))
        - Duration::minutes(rng.gen_range(0..60))
}

/// Category name for a 1-based index, e.g. `Tools`, `Basic Garden`.
pub fn category_name(rng: &mut StdRng, idx: u32) -> String {
    let kind = CATEGORY_TYPES[idx as usize % CATEGORY_TYPES.len()];
    match idx % 3 {
        0 => format!("{kind} - {}", pick(rng, ADJECTIVES)),
        1 => format!("{} {kind}", pick(rng, ADJECTIVES)),
        _ => kind.to_string(),
    }
}

/// Random item name, e.g. `Silver Gadget`, `Elite Copper Kit`.
pub fn item_name(rng: &mut StdRng) -> String {
    let product = pick(rng, PRODUCTS);
    match rng.gen_range(0..4) {
        0 => format!("{} {product}", pick(rng, ADJECTIVES)),
        1 => format!("{} {product}", pick(rng, COLORS)),
        2 => format!("{} {product}", pick(rng, MATERIALS)),
        _ => format!(
            "{} {} {product}",
            pick(rng, ADJECTIVES),
            pick(rng, MATERIALS)
        ),
    }
}

/// Categories `CAT0001..` with ids starting at 1.
pub fn generate_categories(rng: &mut StdRng, count: u32) -> Vec<Category> {
    let now = Utc::now();
    (1..=count)
        .map(|i| Category {
            id: i64::from(i),
            code: format!("CAT{i:04}"),
            name: category_name(rng, i),
            updated_at: recent_timestamp(rng, now),
        })
        .collect()
}

/// Items per category: an even share, with the remainder spread at random.
pub fn distribute(rng: &mut StdRng, items: u32, categories: u32) -> Vec<u32> {
    if categories == 0 {
        return Vec::new();
    }
    let mut counts = vec![items / categories; categories as usize];
    for _ in 0..items % categories {
        let slot = rng.gen_range(0..counts.len());
        counts[slot] += 1;
    }
    counts
}

/// Items `SKU000001..` grouped by category in id order.
pub fn generate_items(rng: &mut StdRng, per_category: &[u32]) -> Vec<Item> {
    let now = Utc::now();
    let total: u32 = per_category.iter().sum();
    let mut items = Vec::with_capacity(total as usize);

    let mut id: i64 = 1;
    for (category_idx, &count) in per_category.iter().enumerate() {
        let category_id = category_idx as i64 + 1;
        for _ in 0..count {
            items.push(Item {
                id,
                sku: format!("SKU{id:06}"),
                name: item_name(rng),
                price: Decimal::new(rng.gen_range(999..=99_999), 2),
                stock: rng.gen_range(0..=1000),
                category_id,
                updated_at: recent_timestamp(rng, now),
                category: None,
            });
            id += 1;
        }
    }
    items
}

/// Generate and load the benchmark data set.
pub async fn cmd_seed(pool: &PgPool, options: &SeedOptions) -> Result<()> {
    if options.items > 0 && options.categories == 0 {
        bail!("cannot seed items without categories");
    }
    let batch_size = options.batch_size.max(1);

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    db::ensure_schema(pool).await?;

    let categories = generate_categories(&mut rng, options.categories);
    let per_category = distribute(&mut rng, options.items, options.categories);
    let items = generate_items(&mut rng, &per_category);

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    if options.truncate {
        sqlx::query("TRUNCATE item, category RESTART IDENTITY")
            .execute(&mut *tx)
            .await
            .context("failed to truncate tables")?;
    } else {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM category")
            .fetch_one(&mut *tx)
            .await
            .context("failed to count categories")?;
        if existing > 0 {
            bail!("category table already has {existing} rows; rerun with --truncate");
        }
    }

    for batch in categories.chunks(batch_size) {
        insert_categories(&mut tx, batch).await?;
    }
    println!("  categories: {}", categories.len());

    for (n, batch) in items.chunks(batch_size).enumerate() {
        insert_items(&mut tx, batch).await?;
        println!("  items: {}/{}", n * batch_size + batch.len(), items.len());
    }

    // Explicit ids were inserted; move the sequences past them.
    for table in ["category", "item"] {
        sqlx::query(&format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), COALESCE(MAX(id), 0) + 1, false) FROM {table}"
        ))
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to reset {table} id sequence"))?;
    }

    tx.commit().await.context("failed to commit seed data")?;

    info!(
        categories = categories.len(),
        items = items.len(),
        seed = ?options.seed,
        "Seed data loaded"
    );
    println!(
        "Seeded {} categories and {} items.",
        categories.len(),
        items.len()
    );
    Ok(())
}

async fn insert_categories(tx: &mut Transaction<'_, Postgres>, batch: &[Category]) -> Result<()> {
    let ids: Vec<i64> = batch.iter().map(|c| c.id).collect();
    let codes: Vec<String> = batch.iter().map(|c| c.code.clone()).collect();
    let names: Vec<String> = batch.iter().map(|c| c.name.clone()).collect();
    let updated: Vec<DateTime<Utc>> = batch.iter().map(|c| c.updated_at).collect();

    sqlx::query(
        r#"
        INSERT INTO category (id, code, name, updated_at)
        SELECT * FROM UNNEST($1::bigint[], $2::text[], $3::text[], $4::timestamptz[])
        "#,
    )
    .bind(ids)
    .bind(codes)
    .bind(names)
    .bind(updated)
    .execute(&mut **tx)
    .await
    .context("failed to insert categories")?;

    Ok(())
}

async fn insert_items(tx: &mut Transaction<'_, Postgres>, batch: &[Item]) -> Result<()> {
    let ids: Vec<i64> = batch.iter().map(|i| i.id).collect();
    let skus: Vec<String> = batch.iter().map(|i| i.sku.clone()).collect();
    let names: Vec<String> = batch.iter().map(|i| i.name.clone()).collect();
    let prices: Vec<Decimal> = batch.iter().map(|i| i.price).collect();
    let stocks: Vec<i32> = batch.iter().map(|i| i.stock).collect();
    let category_ids: Vec<i64> = batch.iter().map(|i| i.category_id).collect();
    let updated: Vec<DateTime<Utc>> = batch.iter().map(|i| i.updated_at).collect();

    sqlx::query(
        r#"
        INSERT INTO item (id, sku, name, price, stock, category_id, updated_at)
        SELECT * FROM UNNEST(
            $1::bigint[], $2::text[], $3::text[], $4::numeric[],
            $5::int[], $6::bigint[], $7::timestamptz[]
        )
        "#,
    )
    .bind(ids)
    .bind(skus)
    .bind(names)
    .bind(prices)
    .bind(stocks)
    .bind(category_ids)
    .bind(updated)
    .execute(&mut **tx)
    .await
    .context("failed to insert items")?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::engine::Draft;
    use crate::models::{CategoryDraft, ItemDraft};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn category_codes_and_names() {
        let categories = generate_categories(&mut rng(), 25);
        assert_eq!(categories.len(), 25);
        assert_eq!(categories[0].id, 1);
        assert_eq!(categories[0].code, "CAT0001");
        assert_eq!(categories[24].code, "CAT0025");
        // Index 2 has no adjective: plain type name.
        assert_eq!(categories[1].name, "Furniture");

        for category in &categories {
            let draft = CategoryDraft {
                id: None,
                code: category.code.clone(),
                name: category.name.clone(),
            };
            assert!(draft.validate().is_ok(), "{category:?}");
        }
    }

    #[test]
    fn distribution_covers_every_item() {
        let counts = distribute(&mut rng(), 100_000, 2000);
        assert_eq!(counts.len(), 2000);
        assert_eq!(counts.iter().sum::<u32>(), 100_000);
        assert!(counts.iter().all(|&c| c == 50));

        let counts = distribute(&mut rng(), 103, 10);
        assert_eq!(counts.iter().sum::<u32>(), 103);
        assert!(counts.iter().all(|&c| (10..=13).contains(&c)));

        assert!(distribute(&mut rng(), 10, 0).is_empty());
    }

    #[test]
    fn items_are_valid_and_grouped() {
        let mut rng = rng();
        let counts = distribute(&mut rng, 40, 4);
        let items = generate_items(&mut rng, &counts);

        assert_eq!(items.len(), 40);
        assert_eq!(items[0].sku, "SKU000001");
        assert_eq!(items[39].sku, "SKU000040");
        assert!(items.windows(2).all(|w| w[0].category_id <= w[1].category_id));

        for item in &items {
            assert!(item.price >= Decimal::new(999, 2) && item.price <= Decimal::new(99_999, 2));
            assert!((0..=1000).contains(&item.stock));
            let draft = ItemDraft {
                id: None,
                sku: item.sku.clone(),
                name: item.name.clone(),
                price: Some(item.price),
                stock: Some(item.stock),
                category_id: Some(item.category_id),
            };
            assert!(draft.validate().is_ok(), "{item:?}");
        }
    }

    #[test]
    fn same_seed_same_data() {
        let a = generate_items(&mut rng(), &[3, 3]);
        let b = generate_items(&mut rng(), &[3, 3]);
        let names = |items: &[Item]| items.iter().map(|i| i.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&a), names(&b));
        assert_eq!(
            a.iter().map(|i| i.price).collect::<Vec<_>>(),
            b.iter().map(|i| i.price).collect::<Vec<_>>()
        );
    }
}
