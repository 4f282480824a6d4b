use crate::storage::Storage;
use crate::transport::http::types::{ApiResponse, AppState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy (storage reachable)", body = ApiResponse),
        (status = 503, description = "Service is unhealthy (storage unreachable)", body = ApiResponse)
    )
)]
pub async fn healthcheck_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.storage.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "status": "ok" }))),
        )
            .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error(format!("storage ping failed: {}", e))),
        )
            .into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Service is ready to accept traffic", body = ApiResponse),
        (status = 503, description = "Service is not ready", body = ApiResponse)
    )
)]
pub async fn readycheck_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.storage.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "status": "ready" }))),
        )
            .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error(format!("not ready: {}", e))),
        )
            .into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, description = "Service counters", body = ApiResponse),
        (status = 500, description = "Internal server error", body = ApiResponse)
    )
)]
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.storage.stats().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({
                "uptime_secs": state.started_at.elapsed().as_secs(),
                "users": stats.users,
                "products": stats.products,
                "orders": stats.orders,
                "open_tickets": stats.open_tickets,
            }))),
        )
            .into_response(),
        Err(e) => crate::transport::http::types::error_response(&e).into_response(),
    }
}
