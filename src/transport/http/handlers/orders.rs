use crate::domain::model::Role;
use crate::domain::tenant::Tenant;
use crate::storage::Storage;
use crate::transport::http::session::CurrentUser;
use crate::transport::http::types::{error_response, ApiResponse, AppState};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;

#[utoipa::path(
    post,
    path = "/api/orders",
    responses(
        (status = 200, description = "Cart checked out, order fulfilled", body = ApiResponse),
        (status = 400, description = "Empty cart or unavailable product", body = ApiResponse),
        (status = 401, description = "Not logged in", body = ApiResponse),
        (status = 402, description = "Insufficient wallet funds", body = ApiResponse),
        (status = 409, description = "Not enough license keys in stock", body = ApiResponse)
    )
)]
pub async fn checkout_handler(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    current: CurrentUser,
) -> impl IntoResponse {
    match state.orders.checkout(current.session.user_id, tenant).await {
        Ok(detail) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({
                "order": detail.order,
                "items": detail.items,
            }))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/orders",
    responses(
        (status = 200, description = "Caller's orders, newest first", body = ApiResponse),
        (status = 401, description = "Not logged in", body = ApiResponse)
    )
)]
pub async fn list_orders_handler(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    current: CurrentUser,
) -> impl IntoResponse {
    match state
        .storage
        .orders_for_user(current.session.user_id, tenant)
        .await
    {
        Ok(orders) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "orders": orders }))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = i64, Path, description = "Order id")
    ),
    responses(
        (status = 200, description = "Order with items and license keys", body = ApiResponse),
        (status = 401, description = "Not logged in", body = ApiResponse),
        (status = 404, description = "Not found (or not the caller's order)", body = ApiResponse)
    )
)]
pub async fn get_order_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    // Admins can inspect any order; customers only their own.
    let scope = if current.session.role == Role::Admin {
        None
    } else {
        Some(current.session.user_id)
    };
    match state.storage.order_detail(id, scope).await {
        Ok(Some(detail)) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({
                "order": detail.order,
                "items": detail.items,
            }))),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("order not found")),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}
