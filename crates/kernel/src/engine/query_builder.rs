//! Page, count and single-row queries using SeaQuery.
//!
//! The selection query and the count query always share one predicate. The
//! selection is ordered by primary key so paging is deterministic; the count
//! has no join, ordering or limit.

use std::marker::PhantomData;

use sea_query::{Asterisk, Expr, Order, PostgresQueryBuilder, Query, SelectStatement};

use super::entity::Entity;
use super::error::EngineResult;
use super::fetch::FetchMode;
use super::page::PageRequest;

/// Query builder for one entity under one fetch mode.
pub struct EntityQueryBuilder<'f, E: Entity> {
    mode: FetchMode,
    filter: Option<&'f E::Filter>,
    _entity: PhantomData<E>,
}

impl<'f, E: Entity> EntityQueryBuilder<'f, E> {
    /// Create a builder without a filter.
    pub fn new(mode: FetchMode) -> Self {
        Self {
            mode,
            filter: None,
            _entity: PhantomData,
        }
    }

    /// Restrict both the page and the count to one filter.
    pub fn with_filter(mut self, filter: &'f E::Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Build the bounded selection query for one page.
    pub fn build(&self, request: &PageRequest) -> EngineResult<String> {
        let mut query = self.select();
        query
            .order_by((E::TABLE, E::ID), Order::Asc)
            .limit(request.limit())
            .offset(request.offset()?);

        Ok(query.to_string(PostgresQueryBuilder))
    }

    /// Build the COUNT query under the same predicate.
    pub fn build_count(&self) -> String {
        let mut query = Query::select();
        query.expr(Expr::col(Asterisk).count()).from(E::TABLE);
        self.add_filter(&mut query);

        query.to_string(PostgresQueryBuilder)
    }

    /// Build a single-row lookup by primary key.
    pub fn build_by_id(&self, id: i64) -> String {
        let mut query = self.select();
        query.and_where(Expr::col((E::TABLE, E::ID)).eq(id));

        query.to_string(PostgresQueryBuilder)
    }

    /// Build `SELECT EXISTS(...)` for a primary key.
    pub fn build_exists(id: i64) -> String {
        let mut inner = Query::select();
        inner
            .expr(Expr::val(1))
            .from(E::TABLE)
            .and_where(Expr::col((E::TABLE, E::ID)).eq(id));

        let mut query = Query::select();
        query.expr(Expr::exists(inner));

        query.to_string(PostgresQueryBuilder)
    }

    /// Build a delete by primary key.
    pub fn build_delete(id: i64) -> String {
        Query::delete()
            .from_table(E::TABLE)
            .and_where(Expr::col(E::ID).eq(id))
            .to_string(PostgresQueryBuilder)
    }

    fn select(&self) -> SelectStatement {
        let mut query = Query::select();
        query.from(E::TABLE);
        E::select_columns(&mut query, self.mode);
        self.add_filter(&mut query);
        query
    }

    fn add_filter(&self, query: &mut SelectStatement) {
        if let Some(filter) = self.filter {
            query.and_where(E::filter_condition(filter));
        }
    }
}
