use crate::domain::pricing::{order_totals, PricedLine};
use crate::domain::tenant::Tenant;
use crate::storage::Storage;
use crate::transport::http::session::CurrentUser;
use crate::transport::http::types::{
    error_response, json_422, AddToCartRequest, ApiResponse, AppState,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart lines with a priced preview", body = ApiResponse),
        (status = 401, description = "Not logged in", body = ApiResponse)
    )
)]
pub async fn get_cart_handler(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    current: CurrentUser,
) -> impl IntoResponse {
    match state.storage.cart(current.session.user_id, tenant).await {
        Ok(cart) => {
            let lines: Vec<PricedLine> = cart
                .iter()
                .map(|l| PricedLine {
                    product_id: l.product.id,
                    product_name: l.product.name.clone(),
                    unit_price: l.product.price_for(tenant),
                    quantity: l.item.quantity,
                })
                .collect();
            let totals = order_totals(&lines, state.vat_rate);
            (
                StatusCode::OK,
                Json(ApiResponse::ok(serde_json::json!({
                    "items": lines,
                    "currency": tenant.currency(),
                    "totals": totals,
                }))),
            )
                .into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Item added (quantity merged on repeat add)", body = ApiResponse),
        (status = 400, description = "Bad request", body = ApiResponse),
        (status = 401, description = "Not logged in", body = ApiResponse),
        (status = 404, description = "Unknown product", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn add_to_cart_handler(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    current: CurrentUser,
    request: Result<Json<AddToCartRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{\"product_id\": ..., \"quantity\": 1}").into_response(),
    };
    let quantity = request.quantity.unwrap_or(1);
    match state
        .storage
        .add_to_cart(current.session.user_id, tenant, request.product_id, quantity)
        .await
    {
        Ok(item) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "item": item }))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/cart/{product_id}",
    params(
        ("product_id" = i64, Path, description = "Product to remove")
    ),
    responses(
        (status = 200, description = "Line removed", body = ApiResponse),
        (status = 401, description = "Not logged in", body = ApiResponse),
        (status = 404, description = "No such cart line", body = ApiResponse)
    )
)]
pub async fn remove_cart_item_handler(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    current: CurrentUser,
    Path(product_id): Path<i64>,
) -> impl IntoResponse {
    match state
        .storage
        .remove_from_cart(current.session.user_id, tenant, product_id)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "removed": product_id }))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart emptied", body = ApiResponse),
        (status = 401, description = "Not logged in", body = ApiResponse)
    )
)]
pub async fn clear_cart_handler(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    current: CurrentUser,
) -> impl IntoResponse {
    match state
        .storage
        .clear_cart(current.session.user_id, tenant)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "cleared": true }))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}
