use crate::domain::model::ProductView;
use crate::domain::tenant::Tenant;
use crate::storage::{ProductFilter, Storage};
use crate::transport::http::types::{error_response, ApiResponse, AppState};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct ProductListQuery {
    /// Restrict to a category subtree.
    pub category_id: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("category_id" = Option<i64>, Query, description = "Restrict to a category subtree")
    ),
    responses(
        (status = 200, description = "Active products with tenant pricing and stock", body = ApiResponse),
        (status = 404, description = "Unknown category", body = ApiResponse)
    )
)]
pub async fn list_products_handler(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Query(query): Query<ProductListQuery>,
) -> impl IntoResponse {
    // Resolve the optional category filter to its materialized path.
    let category_path = match query.category_id {
        Some(cid) => match state.storage.category_by_id(cid).await {
            Ok(Some(c)) => Some(c.path),
            Ok(None) => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(ApiResponse::error("category not found")),
                )
                    .into_response()
            }
            Err(e) => return error_response(&e).into_response(),
        },
        None => None,
    };

    let cache_key = format!(
        "products:{}:{}",
        tenant,
        category_path.as_deref().unwrap_or("all")
    );
    if let Some(cached) = state.cache.get(&cache_key).await {
        return (StatusCode::OK, Json(ApiResponse::ok(cached))).into_response();
    }

    let filter = ProductFilter {
        active_only: true,
        category_path,
    };
    match state.storage.list_products(&filter).await {
        Ok(products) => {
            let views: Vec<ProductView> =
                products.iter().map(|p| ProductView::new(p, tenant)).collect();
            let data = serde_json::json!({ "products": views, "currency": tenant.currency() });
            state.cache.put(&cache_key, data.clone(), &["products"]).await;
            (StatusCode::OK, Json(ApiResponse::ok(data))).into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = i64, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "Product with tenant pricing and stock", body = ApiResponse),
        (status = 404, description = "Not found", body = ApiResponse)
    )
)]
pub async fn get_product_handler(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.storage.product_with_stock(id).await {
        // Inactive products are invisible on the storefront.
        Ok(Some(p)) if p.product.is_active => {
            let view = ProductView::new(&p, tenant);
            (
                StatusCode::OK,
                Json(ApiResponse::ok(serde_json::json!(view))),
            )
                .into_response()
        }
        Ok(_) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("product not found")),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}
