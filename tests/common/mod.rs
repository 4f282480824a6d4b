//! Shared harness: spins the full router up on a loopback listener with the
//! in-memory storage backend and seeds the accounts the flows need.
#![allow(dead_code)]

use keymart::domain::model::{Role, WalletLimits};
use keymart::storage::{NewProduct, NewUser};
use keymart::{AppConfig, AppState, MemStorage, Storage, Tenant};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const ADMIN_PASSWORD: &str = "admin-secret-1";
pub const CUSTOMER_PASSWORD: &str = "customer-secret-1";

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub struct TestServer {
    pub base_url: String,
    pub storage: Arc<dyn Storage>,
}

pub async fn spawn_server() -> TestServer {
    let storage: Arc<dyn Storage> = Arc::new(MemStorage::new());
    let state = AppState::new(
        storage.clone(),
        AppConfig {
            vat_rate: dec("0.21"),
            wallet: WalletLimits {
                starting_balance: dec("1000.00"),
                credit_limit: dec("500.00"),
            },
            session_ttl_hours: 8,
            cache_ttl: Duration::from_secs(60),
            km_host_prefix: "km.".to_string(),
        },
    );
    let router = keymart::transport::http::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    TestServer {
        base_url: format!("http://{}", addr),
        storage,
    }
}

/// Seeds one admin and one customer account. Low bcrypt cost keeps tests fast.
pub async fn seed_users(storage: &Arc<dyn Storage>) {
    storage
        .create_user(NewUser {
            username: "admin".to_string(),
            email: None,
            password_hash: bcrypt::hash(ADMIN_PASSWORD, 4).unwrap(),
            role: Role::Admin,
            tenant: Tenant::Eur,
        })
        .await
        .unwrap();
    storage
        .create_user(NewUser {
            username: "buyer".to_string(),
            email: Some("buyer@example.com".to_string()),
            password_hash: bcrypt::hash(CUSTOMER_PASSWORD, 4).unwrap(),
            role: Role::Customer,
            tenant: Tenant::Eur,
        })
        .await
        .unwrap();
}

/// Seeds a product with distinct EUR/KM prices and a pool of license keys.
pub async fn seed_product(
    storage: &Arc<dyn Storage>,
    sku: &str,
    price: &str,
    price_km: &str,
    keys: usize,
) -> i64 {
    let product = storage
        .create_product(NewProduct {
            sku: sku.to_string(),
            name: format!("Product {}", sku),
            description: None,
            price: dec(price),
            price_km: dec(price_km),
            purchase_price: None,
            b2b_price: None,
            retail_price: None,
            category_id: None,
            region: Some("EU".to_string()),
            platform: Some("Windows".to_string()),
        })
        .await
        .unwrap();
    let key_values: Vec<String> = (0..keys).map(|i| format!("{}-{:04}", sku, i)).collect();
    storage
        .add_license_keys(product.id, key_values)
        .await
        .unwrap();
    product.id
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Logs the client in, keeping the session cookie in its store.
pub async fn login(client: &reqwest::Client, base_url: &str, username: &str, password: &str) {
    let resp = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "login failed for {}", username);
}
