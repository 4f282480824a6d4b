//! Admin back-office: catalog, pricing, users, license-key pools, tickets.
//!
//! Every handler requires an `admin` session via the [`AdminUser`] extractor.

use crate::domain::model::Role;
use crate::domain::tenant::Tenant;
use crate::error::Error;
use crate::storage::{
    CategoryPatch, NewCategory, NewProduct, NewUser, ProductFilter, ProductPatch, Storage,
    UserPatch,
};
use crate::transport::http::session::AdminUser;
use crate::transport::http::types::{
    error_response, json_422, ApiResponse, AppState, CreateCategoryRequest, CreateProductRequest,
    CreateUserRequest, ImportKeysRequest, UpdateCategoryRequest, UpdateProductRequest,
    UpdateTicketRequest, UpdateUserRequest,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rand::Rng;
use std::str::FromStr;
use tracing::info;

const BCRYPT_COST: u32 = 12;

// No 0/O/1/I, license keys get read out over the phone.
const KEY_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

fn generate_key_value<R: Rng>(rng: &mut R) -> String {
    (0..3)
        .map(|_| {
            (0..5)
                .map(|_| KEY_CHARSET[rng.gen_range(0..KEY_CHARSET.len())] as char)
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ApiResponse>) {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message)))
}

// --- products ---

#[utoipa::path(
    get,
    path = "/api/admin/products",
    responses(
        (status = 200, description = "All products including inactive, with stock", body = ApiResponse),
        (status = 403, description = "Admin access required", body = ApiResponse)
    )
)]
pub async fn admin_list_products_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> impl IntoResponse {
    let filter = ProductFilter {
        active_only: false,
        category_path: None,
    };
    match state.storage.list_products(&filter).await {
        Ok(products) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "products": products }))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Product created", body = ApiResponse),
        (status = 403, description = "Admin access required", body = ApiResponse),
        (status = 409, description = "Duplicate SKU", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn admin_create_product_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    request: Result<Json<CreateProductRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{\"sku\": ..., \"name\": ..., \"price\": ...}").into_response(),
    };
    let new = NewProduct {
        sku: request.sku,
        name: request.name,
        description: request.description,
        price: request.price,
        price_km: request.price_km,
        purchase_price: request.purchase_price,
        b2b_price: request.b2b_price,
        retail_price: request.retail_price,
        category_id: request.category_id,
        region: request.region,
        platform: request.platform,
    };
    match state.storage.create_product(new).await {
        Ok(product) => {
            state.cache.invalidate_tag("products").await;
            (
                StatusCode::OK,
                Json(ApiResponse::ok(serde_json::json!({ "product": product }))),
            )
                .into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    params(("id" = i64, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse),
        (status = 403, description = "Admin access required", body = ApiResponse),
        (status = 404, description = "Not found", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn admin_update_product_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    request: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{\"price\": ..., ...}").into_response(),
    };
    let patch = ProductPatch {
        name: request.name,
        description: request.description,
        price: request.price,
        price_km: request.price_km,
        purchase_price: request.purchase_price,
        b2b_price: request.b2b_price,
        retail_price: request.retail_price,
        category_id: request.category_id,
        region: request.region,
        platform: request.platform,
        is_active: request.is_active,
    };
    match state.storage.update_product(id, patch).await {
        Ok(product) => {
            state.cache.invalidate_tag("products").await;
            (
                StatusCode::OK,
                Json(ApiResponse::ok(serde_json::json!({ "product": product }))),
            )
                .into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

// --- categories ---

#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Category created", body = ApiResponse),
        (status = 400, description = "Depth limit exceeded or bad name", body = ApiResponse),
        (status = 403, description = "Admin access required", body = ApiResponse),
        (status = 409, description = "Duplicate path", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn admin_create_category_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    request: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{\"name\": ..., \"parent_id\": null}").into_response(),
    };
    match state
        .storage
        .create_category(NewCategory {
            name: request.name,
            parent_id: request.parent_id,
        })
        .await
    {
        Ok(category) => {
            state.cache.invalidate_tag("categories").await;
            (
                StatusCode::OK,
                Json(ApiResponse::ok(serde_json::json!({ "category": category }))),
            )
                .into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    params(("id" = i64, Path, description = "Category id")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated, subtree paths rebased", body = ApiResponse),
        (status = 403, description = "Admin access required", body = ApiResponse),
        (status = 404, description = "Not found", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn admin_update_category_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    request: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{\"name\": ..., \"is_active\": true}").into_response(),
    };
    match state
        .storage
        .update_category(
            id,
            CategoryPatch {
                name: request.name,
                is_active: request.is_active,
            },
        )
        .await
    {
        Ok(category) => {
            state.cache.invalidate_tag("categories").await;
            (
                StatusCode::OK,
                Json(ApiResponse::ok(serde_json::json!({ "category": category }))),
            )
                .into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

// --- users ---

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All users", body = ApiResponse),
        (status = 403, description = "Admin access required", body = ApiResponse)
    )
)]
pub async fn admin_list_users_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> impl IntoResponse {
    match state.storage.list_users().await {
        Ok(users) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "users": users }))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created", body = ApiResponse),
        (status = 400, description = "Bad role/tenant/password", body = ApiResponse),
        (status = 403, description = "Admin access required", body = ApiResponse),
        (status = 409, description = "Duplicate username", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn admin_create_user_handler(
    State(state): State<AppState>,
    admin: AdminUser,
    request: Result<Json<CreateUserRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{\"username\": ..., \"password\": ...}").into_response(),
    };
    if request.password.len() < 8 {
        return bad_request("password must be at least 8 characters").into_response();
    }
    let role = match request.role.as_deref() {
        Some(raw) => match Role::from_str(raw) {
            Ok(r) => r,
            Err(e) => return bad_request(e).into_response(),
        },
        None => Role::Customer,
    };
    let tenant = match request.tenant.as_deref() {
        Some(raw) => match Tenant::from_str(raw) {
            Ok(t) => t,
            Err(e) => return bad_request(e).into_response(),
        },
        None => Tenant::Eur,
    };
    let password_hash = match bcrypt::hash(&request.password, BCRYPT_COST) {
        Ok(h) => h,
        Err(e) => {
            return error_response(&Error::Validation(format!("password hash failed: {}", e)))
                .into_response()
        }
    };
    match state
        .storage
        .create_user(NewUser {
            username: request.username,
            email: request.email,
            password_hash,
            role,
            tenant,
        })
        .await
    {
        Ok(user) => {
            info!("admin '{}' created user '{}'", admin.session.username, user.username);
            (
                StatusCode::OK,
                Json(ApiResponse::ok(serde_json::json!({ "user": user }))),
            )
                .into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse),
        (status = 400, description = "Bad role/password", body = ApiResponse),
        (status = 403, description = "Admin access required", body = ApiResponse),
        (status = 404, description = "Not found", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn admin_update_user_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    request: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{\"email\": ..., ...}").into_response(),
    };
    let role = match request.role.as_deref() {
        Some(raw) => match Role::from_str(raw) {
            Ok(r) => Some(r),
            Err(e) => return bad_request(e).into_response(),
        },
        None => None,
    };
    let password_hash = match request.password.as_deref() {
        Some(pw) if pw.len() < 8 => {
            return bad_request("password must be at least 8 characters").into_response()
        }
        Some(pw) => match bcrypt::hash(pw, BCRYPT_COST) {
            Ok(h) => Some(h),
            Err(e) => {
                return error_response(&Error::Validation(format!("password hash failed: {}", e)))
                    .into_response()
            }
        },
        None => None,
    };
    match state
        .storage
        .update_user(
            id,
            UserPatch {
                email: request.email,
                password_hash,
                role,
                is_active: request.is_active,
            },
        )
        .await
    {
        Ok(user) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "user": user }))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

// --- license keys ---

#[utoipa::path(
    post,
    path = "/api/admin/license-keys",
    request_body = ImportKeysRequest,
    responses(
        (status = 200, description = "Keys imported (duplicates skipped)", body = ApiResponse),
        (status = 400, description = "Nothing to import", body = ApiResponse),
        (status = 403, description = "Admin access required", body = ApiResponse),
        (status = 404, description = "Unknown product", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn admin_import_keys_handler(
    State(state): State<AppState>,
    admin: AdminUser,
    request: Result<Json<ImportKeysRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return json_422(e, "{\"product_id\": ..., \"keys\": [...], \"generate\": 0}")
                .into_response()
        }
    };
    let mut keys: Vec<String> = request
        .keys
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if let Some(n) = request.generate {
        let mut rng = rand::thread_rng();
        keys.extend((0..n).map(|_| generate_key_value(&mut rng)));
    }
    if keys.is_empty() {
        return bad_request("no keys supplied and none requested to generate").into_response();
    }
    match state.storage.add_license_keys(request.product_id, keys).await {
        Ok(inserted) => {
            info!(
                "admin '{}' imported {} keys for product {}",
                admin.session.username, inserted, request.product_id
            );
            state.cache.invalidate_tag("products").await;
            (
                StatusCode::OK,
                Json(ApiResponse::ok(serde_json::json!({ "imported": inserted }))),
            )
                .into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/license-keys/{product_id}",
    params(("product_id" = i64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Key pool counters for the product", body = ApiResponse),
        (status = 403, description = "Admin access required", body = ApiResponse),
        (status = 404, description = "Unknown product", body = ApiResponse)
    )
)]
pub async fn admin_key_pool_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(product_id): Path<i64>,
) -> impl IntoResponse {
    match state.storage.key_pool(product_id).await {
        Ok(pool) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!(pool))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

// --- support tickets ---

#[utoipa::path(
    get,
    path = "/api/admin/tickets",
    responses(
        (status = 200, description = "All tickets, newest first", body = ApiResponse),
        (status = 403, description = "Admin access required", body = ApiResponse)
    )
)]
pub async fn admin_list_tickets_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> impl IntoResponse {
    match state.storage.list_tickets().await {
        Ok(tickets) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "tickets": tickets }))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/tickets/{id}",
    params(("id" = i64, Path, description = "Ticket id")),
    request_body = UpdateTicketRequest,
    responses(
        (status = 200, description = "Ticket status updated", body = ApiResponse),
        (status = 400, description = "Unknown status", body = ApiResponse),
        (status = 403, description = "Admin access required", body = ApiResponse),
        (status = 404, description = "Not found", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn admin_update_ticket_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    request: Result<Json<UpdateTicketRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{\"status\": \"closed\"}").into_response(),
    };
    let status = match request.status.parse() {
        Ok(s) => s,
        Err(e) => return bad_request(e).into_response(),
    };
    match state.storage.update_ticket_status(id, status).await {
        Ok(ticket) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "ticket": ticket }))),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}
