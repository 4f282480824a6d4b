use crate::storage::Storage;
use crate::transport::http::session::{CurrentUser, SESSION_COOKIE};
use crate::transport::http::types::{json_422, ApiResponse, AppState, LoginRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{info, warn};

fn invalid_credentials() -> (StatusCode, Json<ApiResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::error("invalid username or password")),
    )
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = ApiResponse),
        (status = 401, description = "Invalid credentials", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn login_handler(
    State(state): State<AppState>,
    request: Result<Json<LoginRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{\"username\": ..., \"password\": ...}").into_response(),
    };

    let user = match state.storage.user_by_username(&request.username).await {
        Ok(Some(u)) => u,
        Ok(None) => return invalid_credentials().into_response(),
        Err(e) => return crate::transport::http::types::error_response(&e).into_response(),
    };
    if !user.is_active {
        warn!("login attempt for disabled account '{}'", user.username);
        return invalid_credentials().into_response();
    }
    match bcrypt::verify(&request.password, &user.password_hash) {
        Ok(true) => {}
        _ => return invalid_credentials().into_response(),
    }

    let token = state.sessions.create(&user).await;
    info!("user '{}' logged in", user.username);
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, token);
    (
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(ApiResponse::ok(serde_json::json!({
            "id": user.id,
            "username": user.username,
            "role": user.role,
            "tenant": user.tenant,
        }))),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session destroyed", body = ApiResponse),
        (status = 401, description = "Not logged in", body = ApiResponse)
    )
)]
pub async fn logout_handler(
    State(state): State<AppState>,
    current: CurrentUser,
) -> impl IntoResponse {
    state.sessions.destroy(&current.token).await;
    let cookie = format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE);
    (
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(ApiResponse::ok(serde_json::json!({ "logged_out": true }))),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current session", body = ApiResponse),
        (status = 401, description = "Not logged in", body = ApiResponse)
    )
)]
pub async fn me_handler(current: CurrentUser) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse::ok(serde_json::json!(current.session))),
    )
}
