use crate::domain::tenant::Tenant;
use crate::transport::http::session::CurrentUser;
use crate::transport::http::types::{error_response, ApiResponse, AppState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;

#[utoipa::path(
    get,
    path = "/api/wallet",
    responses(
        (status = 200, description = "Derived wallet snapshot", body = ApiResponse),
        (status = 401, description = "Not logged in", body = ApiResponse)
    )
)]
pub async fn get_wallet_handler(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    current: CurrentUser,
) -> impl IntoResponse {
    match state.wallet.wallet(current.session.user_id, tenant).await {
        Ok(wallet) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!(wallet))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/wallet/transactions",
    responses(
        (status = 200, description = "Synthesized transaction history", body = ApiResponse),
        (status = 401, description = "Not logged in", body = ApiResponse)
    )
)]
pub async fn wallet_transactions_handler(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    current: CurrentUser,
) -> impl IntoResponse {
    match state
        .wallet
        .transactions(current.session.user_id, tenant)
        .await
    {
        Ok(transactions) => (
            StatusCode::OK,
            Json(ApiResponse::ok(
                serde_json::json!({ "transactions": transactions }),
            )),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}
