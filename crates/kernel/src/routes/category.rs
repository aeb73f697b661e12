//! Category route handlers.

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

use crate::engine::{EngineError, EntityKind, PageRequest, PageResult};
use crate::error::{AppError, AppResult};
use crate::models::{Category, CategoryDraft, Item, ItemFilter};
use crate::state::AppState;

use super::item::{require_category, with_categories};

/// Create the category router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route("/categories/{id}/items", get(list_category_items))
}

/// `GET /categories?page&size`
async fn list_categories(
    State(state): State<AppState>,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> AppResult<Json<PageResult<Category>>> {
    let Query(request) = query?;
    Ok(Json(state.engine().list_all::<Category>(request).await?))
}

/// `GET /categories/{id}`
async fn get_category(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Category>> {
    let Path(id) = id?;

    let category = state
        .engine()
        .get_by_id::<Category>(id)
        .await?
        .ok_or(EngineError::NotFound {
            kind: EntityKind::Category,
            id,
        })?;

    Ok(Json(category))
}

/// `POST /categories`
async fn create_category(
    State(state): State<AppState>,
    body: Result<Json<CategoryDraft>, JsonRejection>,
) -> AppResult<Response> {
    let Json(draft) = body?;

    let category = state.engine().save(&draft).await?;
    tracing::info!(id = category.id, code = %category.code, "category created");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/categories/{}", category.id))],
        Json(category),
    )
        .into_response())
}

/// `PUT /categories/{id}`
async fn update_category(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<CategoryDraft>, JsonRejection>,
) -> AppResult<Json<Category>> {
    let Path(id) = id?;
    let Json(draft) = body?;

    Ok(Json(state.engine().save(&draft.with_id(id)).await?))
}

/// `DELETE /categories/{id}`
///
/// A category still referenced by items is a 409 Conflict.
async fn delete_category(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = id?;

    let deleted = state
        .engine()
        .delete::<Category>(id)
        .await
        .map_err(|e| AppError::from(e).conflict_on_reference())?;

    if deleted {
        tracing::info!(id, "category deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::from(EngineError::NotFound {
            kind: EntityKind::Category,
            id,
        }))
    }
}

/// `GET /categories/{id}/items?page&size`
async fn list_category_items(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> AppResult<Json<PageResult<Item>>> {
    let Path(id) = id?;
    let Query(request) = query?;
    request.validate()?;

    require_category(&state, id).await?;

    let page = state
        .engine()
        .list_by_filter::<Item>(&ItemFilter::CategoryId(id), request)
        .await?;

    Ok(Json(with_categories(&state, page).await?))
}
