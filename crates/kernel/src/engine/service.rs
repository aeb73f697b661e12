//! Query engine for paginated reads and transactional writes.
//!
//! Every store access runs inside a transaction with a `SET LOCAL
//! statement_timeout`. A listing runs the bounded selection and the
//! independent count in one read transaction, single-row reads get a short
//! one each, and writes run in their own; dropping a transaction on an error
//! path rolls back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;

use super::entity::{Draft, Entity, EntityKind};
use super::error::{EngineError, EngineResult};
use super::fetch::FetchMode;
use super::page::{PageRequest, PageResult};
use super::query_builder::EntityQueryBuilder;
use crate::metrics::Metrics;
use crate::models::{Category, Item};

/// Paginated access to categories and items.
///
/// Holds no mutable state: the pool, the fetch mode, the statement timeout
/// and the metrics handles are fixed at construction.
pub struct QueryEngine {
    pool: PgPool,
    fetch: FetchMode,
    statement_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl QueryEngine {
    /// Create a new engine.
    pub fn new(
        pool: PgPool,
        fetch: FetchMode,
        statement_timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            pool,
            fetch,
            statement_timeout,
            metrics,
        }
    }

    /// Fetch mode in effect for every read.
    pub fn fetch_mode(&self) -> FetchMode {
        self.fetch
    }

    /// One page of all rows, ascending by id.
    pub async fn list_all<E: Entity>(&self, request: PageRequest) -> EngineResult<PageResult<E>> {
        self.list_page(EntityQueryBuilder::<E>::new(self.fetch), request)
            .await
    }

    /// One page of rows matching an equality filter.
    ///
    /// A filter naming a row that does not exist yields an empty page.
    pub async fn list_by_filter<E: Entity>(
        &self,
        filter: &E::Filter,
        request: PageRequest,
    ) -> EngineResult<PageResult<E>> {
        self.list_page(
            EntityQueryBuilder::<E>::new(self.fetch).with_filter(filter),
            request,
        )
        .await
    }

    async fn list_page<E: Entity>(
        &self,
        builder: EntityQueryBuilder<'_, E>,
        request: PageRequest,
    ) -> EngineResult<PageResult<E>> {
        request.validate()?;
        let main_sql = builder.build(&request)?;
        let count_sql = builder.build_count();

        debug!(
            entity = %E::KIND,
            page = request.page,
            size = request.size,
            fetch = %self.fetch,
            "listing page"
        );

        let mut tx = self.begin().await?;

        let started = Instant::now();
        let total: i64 = sqlx::query_scalar(&count_sql)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| EngineError::from_store("failed to execute count query", e))?;
        self.observe(E::KIND, "count", started);

        let started = Instant::now();
        let content: Vec<E> = sqlx::query_as(&main_sql)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| EngineError::from_store("failed to execute page query", e))?;
        self.observe(E::KIND, "page", started);

        commit_read(tx).await?;

        Ok(PageResult::new(
            content,
            request,
            u64::try_from(total).unwrap_or(0),
        ))
    }

    /// Look up one row by id, joining the parent in eager mode.
    pub async fn get_by_id<E: Entity>(&self, id: i64) -> EngineResult<Option<E>> {
        let sql = EntityQueryBuilder::<E>::new(self.fetch).build_by_id(id);

        let mut tx = self.begin().await?;

        let started = Instant::now();
        let row = sqlx::query_as::<_, E>(&sql)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| EngineError::from_store("failed to load row", e))?;
        self.observe(E::KIND, "get", started);

        commit_read(tx).await?;
        Ok(row)
    }

    /// Whether a row with this id exists.
    pub async fn exists<E: Entity>(&self, id: i64) -> EngineResult<bool> {
        let mut tx = self.begin().await?;
        let found = self.exists_on::<E>(&mut tx, id).await?;
        commit_read(tx).await?;
        Ok(found)
    }

    /// Insert (no id) or fully update (with id) one row.
    ///
    /// The draft is validated before a connection is taken. A referenced
    /// category that does not exist is a [`EngineError::ReferentialViolation`]
    /// and nothing is written. Concurrent updates to the same id are
    /// last-write-wins.
    pub async fn save<D: Draft>(&self, draft: &D) -> EngineResult<D::Entity> {
        draft.validate()?;
        let kind = <D::Entity as Entity>::KIND;

        let mut tx = self.begin().await?;

        if let Some(category_id) = draft.category_ref()
            && !self.exists_on::<Category>(&mut tx, category_id).await?
        {
            return Err(EngineError::ReferentialViolation(format!(
                "category {category_id} does not exist"
            )));
        }

        let started = Instant::now();
        let id = match draft.id() {
            None => draft
                .insert()
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| EngineError::from_store("failed to insert row", e))?,
            Some(id) => draft
                .update(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| EngineError::from_store("failed to update row", e))?
                .ok_or(EngineError::NotFound { kind, id })?,
        };
        self.observe(kind, "write", started);

        let sql = EntityQueryBuilder::<D::Entity>::new(self.fetch).build_by_id(id);
        let saved = sqlx::query_as::<_, D::Entity>(&sql)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| EngineError::from_store("failed to reload saved row", e))?;

        tx.commit()
            .await
            .map_err(|e| EngineError::from_store("failed to commit write", e))?;

        debug!(entity = %kind, id, "saved row");
        Ok(saved)
    }

    /// Delete one row. Returns `false` when nothing matched.
    pub async fn delete<E: Entity>(&self, id: i64) -> EngineResult<bool> {
        let sql = EntityQueryBuilder::<E>::build_delete(id);

        let mut tx = self.begin().await?;

        let started = Instant::now();
        let result = sqlx::query(&sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| EngineError::from_store("failed to delete row", e))?;
        self.observe(E::KIND, "delete", started);

        tx.commit()
            .await
            .map_err(|e| EngineError::from_store("failed to commit delete", e))?;

        debug!(entity = %E::KIND, id, deleted = result.rows_affected(), "delete");
        Ok(result.rows_affected() > 0)
    }

    /// The category an item references.
    ///
    /// Returns the joined category when present; otherwise issues one
    /// single-row lookup.
    pub async fn resolve_category(&self, item: &Item) -> EngineResult<Category> {
        if let Some(category) = &item.category {
            return Ok(category.clone());
        }

        let sql = EntityQueryBuilder::<Category>::new(self.fetch).build_by_id(item.category_id);

        let mut tx = self.begin().await?;

        let started = Instant::now();
        let category = sqlx::query_as::<_, Category>(&sql)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| EngineError::from_store("failed to resolve category", e))?;
        self.observe(EntityKind::Category, "resolve", started);

        commit_read(tx).await?;

        category.ok_or(EngineError::NotFound {
            kind: EntityKind::Category,
            id: item.category_id,
        })
    }

    /// Fill `category` on every item that does not carry one yet.
    ///
    /// One lookup per unresolved item, with no batching.
    pub async fn hydrate_categories(&self, items: &mut [Item]) -> EngineResult<()> {
        for item in items.iter_mut().filter(|item| item.category.is_none()) {
            let category = self.resolve_category(item).await?;
            item.category = Some(category);
        }
        Ok(())
    }

    async fn exists_on<E: Entity>(&self, conn: &mut PgConnection, id: i64) -> EngineResult<bool> {
        let sql = EntityQueryBuilder::<E>::build_exists(id);

        let started = Instant::now();
        let found: bool = sqlx::query_scalar(&sql)
            .fetch_one(conn)
            .await
            .map_err(|e| EngineError::from_store("failed to check existence", e))?;
        self.observe(E::KIND, "exists", started);

        Ok(found)
    }

    /// Begin a transaction with the statement timeout applied.
    async fn begin(&self) -> EngineResult<Transaction<'static, Postgres>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| EngineError::from_store("failed to begin transaction", e))?;

        // SET LOCAL does not accept bind parameters.
        let timeout_ms = self.statement_timeout.as_millis();
        sqlx::query(&format!("SET LOCAL statement_timeout = '{timeout_ms}ms'"))
            .execute(&mut *tx)
            .await
            .map_err(|e| EngineError::from_store("failed to set statement timeout", e))?;

        Ok(tx)
    }

    fn observe(&self, kind: EntityKind, query: &str, started: Instant) {
        self.metrics.record_query(
            kind.table(),
            query,
            self.fetch.as_str(),
            started.elapsed().as_secs_f64(),
        );
    }
}

async fn commit_read(tx: Transaction<'static, Postgres>) -> EngineResult<()> {
    tx.commit()
        .await
        .map_err(|e| EngineError::from_store("failed to commit read transaction", e))
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("fetch", &self.fetch)
            .field("statement_timeout", &self.statement_timeout)
            .finish_non_exhaustive()
    }
}
