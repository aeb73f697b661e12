//! Item route handlers.
//!
//! Item responses always embed the referenced category. In eager mode it
//! arrives with the row; in lazy mode it is resolved per item before the
//! response is written.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::engine::{DEFAULT_PAGE_SIZE, EngineError, EntityKind, PageRequest, PageResult};
use crate::error::{AppError, AppResult};
use crate::models::{Category, Item, ItemDraft, ItemFilter};
use crate::state::AppState;

/// Query parameters for `GET /items`.
///
/// Spelled out rather than flattening [`PageRequest`], since flattened
/// fields lose their numeric types in query-string decoding.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemsQuery {
    #[serde(default)]
    pub page: i64,

    #[serde(default = "default_size")]
    pub size: i64,

    pub category_id: Option<i64>,
}

fn default_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl ListItemsQuery {
    fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}

/// Create the item router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
}

/// Fill in the category of every item on a page.
pub(super) async fn with_categories(
    state: &AppState,
    mut page: PageResult<Item>,
) -> AppResult<PageResult<Item>> {
    state.engine().hydrate_categories(&mut page.content).await?;
    Ok(page)
}

/// Fail with 404 unless the category exists.
pub(super) async fn require_category(state: &AppState, id: i64) -> AppResult<()> {
    if state.engine().exists::<Category>(id).await? {
        Ok(())
    } else {
        Err(EngineError::NotFound {
            kind: EntityKind::Category,
            id,
        }
        .into())
    }
}

async fn with_category(state: &AppState, mut item: Item) -> AppResult<Item> {
    state
        .engine()
        .hydrate_categories(std::slice::from_mut(&mut item))
        .await?;
    Ok(item)
}

/// `GET /items?page&size&categoryId`
async fn list_items(
    State(state): State<AppState>,
    query: Result<Query<ListItemsQuery>, QueryRejection>,
) -> AppResult<Json<PageResult<Item>>> {
    let Query(query) = query?;
    let request = query.page_request();
    request.validate()?;

    let page = match query.category_id {
        Some(category_id) => {
            require_category(&state, category_id).await?;
            state
                .engine()
                .list_by_filter::<Item>(&ItemFilter::CategoryId(category_id), request)
                .await?
        }
        None => state.engine().list_all::<Item>(request).await?,
    };

    Ok(Json(with_categories(&state, page).await?))
}

/// `GET /items/{id}`
async fn get_item(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Item>> {
    let Path(id) = id?;

    let item = state
        .engine()
        .get_by_id::<Item>(id)
        .await?
        .ok_or(EngineError::NotFound {
            kind: EntityKind::Item,
            id,
        })?;

    Ok(Json(with_category(&state, item).await?))
}

/// `POST /items`
async fn create_item(
    State(state): State<AppState>,
    body: Result<Json<ItemDraft>, JsonRejection>,
) -> AppResult<Response> {
    let Json(draft) = body?;

    let item = state.engine().save(&draft).await?;
    let item = with_category(&state, item).await?;

    tracing::info!(id = item.id, sku = %item.sku, "item created");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/items/{}", item.id))],
        Json(item),
    )
        .into_response())
}

/// `PUT /items/{id}`
async fn update_item(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<ItemDraft>, JsonRejection>,
) -> AppResult<Json<Item>> {
    let Path(id) = id?;
    let Json(draft) = body?;

    let item = state.engine().save(&draft.with_id(id)).await?;

    Ok(Json(with_category(&state, item).await?))
}

/// `DELETE /items/{id}`
async fn delete_item(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = id?;

    if state.engine().delete::<Item>(id).await? {
        tracing::info!(id, "item deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::from(EngineError::NotFound {
            kind: EntityKind::Item,
            id,
        }))
    }
}
