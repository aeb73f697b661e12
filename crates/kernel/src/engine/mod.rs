//! Paginated relational access layer.
//!
//! Lists categories and items a page at a time with a total count, and
//! switches between joining an item's category into the same query (eager)
//! and loading it with one extra lookup per item (lazy).

mod entity;
mod error;
mod fetch;
mod page;
mod query_builder;
pub mod schema;
mod service;

pub use entity::{Draft, Entity, EntityKind};
pub use error::{EngineError, EngineResult};
pub use fetch::FetchMode;
pub use page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageRequest, PageResult};
pub use query_builder::EntityQueryBuilder;
pub use service::QueryEngine;
