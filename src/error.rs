//! Crate-wide error taxonomy.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("cart is empty")]
    EmptyCart,

    #[error("not enough license keys for product {product_id}: requested {requested}, available {available}")]
    OutOfStock {
        product_id: i64,
        requested: i64,
        available: i64,
    },

    #[error("insufficient wallet funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("authentication required")]
    Unauthorized,

    #[error("admin access required")]
    Forbidden,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
