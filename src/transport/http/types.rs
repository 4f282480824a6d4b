use crate::app::{OrderService, WalletService};
use crate::domain::model::WalletLimits;
use crate::error::Error;
use crate::infra::cache::ResponseCache;
use crate::storage::Storage;
use crate::transport::http::session::SessionStore;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::{Duration, Instant};
use utoipa::ToSchema;

/// Tunables the server reads from the environment at boot; tests construct
/// this directly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub vat_rate: Decimal,
    pub wallet: WalletLimits,
    pub session_ttl_hours: i64,
    pub cache_ttl: Duration,
    pub km_host_prefix: String,
}

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub sessions: Arc<SessionStore>,
    pub cache: Arc<ResponseCache>,
    pub orders: Arc<OrderService>,
    pub wallet: Arc<WalletService>,
    pub vat_rate: Decimal,
    pub km_host_prefix: String,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, config: AppConfig) -> Self {
        AppState {
            orders: Arc::new(OrderService::new(
                storage.clone(),
                config.vat_rate,
                config.wallet,
            )),
            wallet: Arc::new(WalletService::new(storage.clone(), config.wallet)),
            sessions: Arc::new(SessionStore::new(config.session_ttl_hours)),
            cache: Arc::new(ResponseCache::new(config.cache_ttl)),
            vat_rate: config.vat_rate,
            km_host_prefix: config.km_host_prefix,
            started_at: Instant::now(),
            storage,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok(data: JsonValue) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Maps a storage/service error onto an HTTP status + envelope.
pub fn error_response(err: &Error) -> (StatusCode, Json<ApiResponse>) {
    let status = match err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Validation(_) | Error::EmptyCart => StatusCode::BAD_REQUEST,
        Error::OutOfStock { .. } | Error::Conflict(_) => StatusCode::CONFLICT,
        Error::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        Error::Unauthorized => StatusCode::UNAUTHORIZED,
        Error::Forbidden => StatusCode::FORBIDDEN,
        Error::Database(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiResponse::error(err.to_string())))
}

pub fn json_422(err: JsonRejection, expected: &str) -> (StatusCode, Json<ApiResponse>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiResponse::error(format!(
            "Invalid JSON body: {} (expected: {})",
            err, expected
        ))),
    )
}

// --- request bodies ---

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: i64,
    /// Defaults to 1.
    #[serde(default)]
    pub quantity: Option<i32>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    #[schema(value_type = String)]
    pub price_km: Decimal,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub purchase_price: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub b2b_price: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub retail_price: Option<Decimal>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct UpdateProductRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub price_km: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub purchase_price: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub b2b_price: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub retail_price: Option<Decimal>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct UpdateCategoryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    /// `admin` or `customer`; defaults to `customer`.
    #[serde(default)]
    pub role: Option<String>,
    /// `eur` or `km`; defaults to `eur`.
    #[serde(default)]
    pub tenant: Option<String>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ImportKeysRequest {
    pub product_id: i64,
    /// Keys to import verbatim.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Additionally generate this many random keys.
    #[serde(default)]
    pub generate: Option<u32>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub body: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateTicketRequest {
    /// `open`, `pending` or `closed`.
    pub status: String,
}
