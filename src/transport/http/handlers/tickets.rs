use crate::domain::tenant::Tenant;
use crate::storage::{NewTicket, Storage};
use crate::transport::http::session::CurrentUser;
use crate::transport::http::types::{
    error_response, json_422, ApiResponse, AppState, CreateTicketRequest,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;

#[utoipa::path(
    post,
    path = "/api/tickets",
    request_body = CreateTicketRequest,
    responses(
        (status = 200, description = "Ticket opened", body = ApiResponse),
        (status = 400, description = "Bad request", body = ApiResponse),
        (status = 401, description = "Not logged in", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn create_ticket_handler(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    current: CurrentUser,
    request: Result<Json<CreateTicketRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{\"subject\": ..., \"body\": ...}").into_response(),
    };
    if request.subject.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("subject must not be empty")),
        )
            .into_response();
    }
    match state
        .storage
        .create_ticket(NewTicket {
            user_id: current.session.user_id,
            tenant,
            subject: request.subject,
            body: request.body,
        })
        .await
    {
        Ok(ticket) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "ticket": ticket }))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/tickets",
    responses(
        (status = 200, description = "Caller's tickets, newest first", body = ApiResponse),
        (status = 401, description = "Not logged in", body = ApiResponse)
    )
)]
pub async fn list_my_tickets_handler(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    current: CurrentUser,
) -> impl IntoResponse {
    match state
        .storage
        .tickets_for_user(current.session.user_id, tenant)
        .await
    {
        Ok(tickets) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "tickets": tickets }))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}
