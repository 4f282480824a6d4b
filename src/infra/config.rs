//! Centralized configuration (environment variables + defaults).

use rust_decimal::Decimal;
use std::str::FromStr;

/// Database URL must be provided (no default) for safety.
pub fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set")
}

/// Listen address for the API server.
pub fn bind_addr() -> String {
    std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}

/// Host prefix that selects the KM storefront (e.g. `km.` for `km.example.com`).
pub fn km_host_prefix() -> String {
    std::env::var("KM_HOST_PREFIX").unwrap_or_else(|_| "km.".to_string())
}

/// Session lifetime in hours.
pub fn session_ttl_hours() -> i64 {
    env_parsed("SESSION_TTL_HOURS", 8)
}

/// Response-cache TTL in seconds.
pub fn cache_ttl_secs() -> u64 {
    env_parsed("CACHE_TTL_SECS", 60)
}

/// VAT rate applied at checkout (fraction, not percent).
pub fn vat_rate() -> Decimal {
    env_decimal("VAT_RATE", "0.21")
}

/// Prepaid deposit every account starts from.
pub fn wallet_starting_balance() -> Decimal {
    env_decimal("WALLET_STARTING_BALANCE", "1000.00")
}

/// Credit extended beyond the deposit.
pub fn wallet_credit_limit() -> Decimal {
    env_decimal("WALLET_CREDIT_LIMIT", "500.00")
}

/// Password for the bootstrap admin account (created only when no admin exists).
pub fn admin_password() -> Option<String> {
    std::env::var("ADMIN_PASSWORD").ok()
}

fn env_parsed<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(v) => v
            .parse::<T>()
            .unwrap_or_else(|_| panic!("{} must be a valid number", name)),
        Err(_) => default,
    }
}

fn env_decimal(name: &str, default: &str) -> Decimal {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    Decimal::from_str(&raw).unwrap_or_else(|_| panic!("{} must be a valid decimal", name))
}
