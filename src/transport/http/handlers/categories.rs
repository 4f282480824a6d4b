use crate::domain::model::Category;
use crate::transport::http::types::{error_response, ApiResponse, AppState};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value as JsonValue;

/// Nests a flat category list into parent/children JSON.
fn build_hierarchy(categories: &[Category], parent_id: Option<i64>) -> Vec<JsonValue> {
    categories
        .iter()
        .filter(|c| c.parent_id == parent_id)
        .map(|c| {
            let mut node = serde_json::json!(c);
            node["children"] = JsonValue::Array(build_hierarchy(categories, Some(c.id)));
            node
        })
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "All categories ordered by path", body = ApiResponse)
    )
)]
pub async fn list_categories_handler(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(cached) = state.cache.get("categories:all").await {
        return (StatusCode::OK, Json(ApiResponse::ok(cached))).into_response();
    }
    match state.storage.list_categories().await {
        Ok(categories) => {
            let data = serde_json::json!({ "categories": categories });
            state
                .cache
                .put("categories:all", data.clone(), &["categories"])
                .await;
            (StatusCode::OK, Json(ApiResponse::ok(data))).into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/categories/hierarchy",
    responses(
        (status = 200, description = "Categories nested under their parents", body = ApiResponse)
    )
)]
pub async fn category_hierarchy_handler(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(cached) = state.cache.get("categories:hierarchy").await {
        return (StatusCode::OK, Json(ApiResponse::ok(cached))).into_response();
    }
    match state.storage.list_categories().await {
        Ok(categories) => {
            let data = serde_json::json!({ "hierarchy": build_hierarchy(&categories, None) });
            state
                .cache
                .put("categories:hierarchy", data.clone(), &["categories"])
                .await;
            (StatusCode::OK, Json(ApiResponse::ok(data))).into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/categories/level/{level}",
    params(
        ("level" = i32, Path, description = "Tree level, roots are 1")
    ),
    responses(
        (status = 200, description = "Categories at the given level", body = ApiResponse),
        (status = 400, description = "Invalid level", body = ApiResponse)
    )
)]
pub async fn categories_by_level_handler(
    State(state): State<AppState>,
    Path(level): Path<i32>,
) -> impl IntoResponse {
    if !(1..=crate::domain::category::MAX_DEPTH).contains(&level) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!(
                "level must be between 1 and {}",
                crate::domain::category::MAX_DEPTH
            ))),
        )
            .into_response();
    }
    match state.storage.categories_by_level(level).await {
        Ok(categories) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "categories": categories }))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}/children",
    params(
        ("id" = i64, Path, description = "Parent category id")
    ),
    responses(
        (status = 200, description = "Direct children of the category", body = ApiResponse),
        (status = 404, description = "Not found", body = ApiResponse)
    )
)]
pub async fn category_children_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.storage.category_by_id(id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("category not found")),
            )
                .into_response()
        }
        Err(e) => return error_response(&e).into_response(),
    }
    match state.storage.categories_by_parent(Some(id)).await {
        Ok(categories) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "children": categories }))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}/path",
    params(
        ("id" = i64, Path, description = "Category id")
    ),
    responses(
        (status = 200, description = "Root-to-node breadcrumb", body = ApiResponse),
        (status = 404, description = "Not found", body = ApiResponse)
    )
)]
pub async fn category_path_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.storage.category_breadcrumb(id).await {
        Ok(breadcrumb) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "breadcrumb": breadcrumb }))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}
