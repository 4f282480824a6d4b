// src/bin/api_server.rs

use keymart::domain::model::{Role, WalletLimits};
use keymart::infra::config;
use keymart::storage::NewUser;
use keymart::transport;
use keymart::{AppConfig, AppState, PgStorage, Storage, Tenant};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Creates the bootstrap admin account when none exists yet.
///
/// Requires ADMIN_PASSWORD; without it a fresh database simply has no
/// admin until one is created out of band.
async fn ensure_admin_user(storage: &Arc<dyn Storage>) -> anyhow::Result<()> {
    let has_admin = storage
        .list_users()
        .await?
        .iter()
        .any(|u| u.role == Role::Admin);
    if has_admin {
        return Ok(());
    }
    let Some(password) = config::admin_password() else {
        warn!("no admin account exists and ADMIN_PASSWORD is not set");
        return Ok(());
    };
    let password_hash = bcrypt::hash(&password, 12)?;
    storage
        .create_user(NewUser {
            username: "admin".to_string(),
            email: None,
            password_hash,
            role: Role::Admin,
            tenant: Tenant::Eur,
        })
        .await?;
    info!("bootstrap admin account 'admin' created");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("connecting to database...");
    let storage: Arc<dyn Storage> = Arc::new(PgStorage::connect(&config::database_url()).await?);
    ensure_admin_user(&storage).await?;

    let app_state = AppState::new(
        storage,
        AppConfig {
            vat_rate: config::vat_rate(),
            wallet: WalletLimits {
                starting_balance: config::wallet_starting_balance(),
                credit_limit: config::wallet_credit_limit(),
            },
            session_ttl_hours: config::session_ttl_hours(),
            cache_ttl: Duration::from_secs(config::cache_ttl_secs()),
            km_host_prefix: config::km_host_prefix(),
        },
    );

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);
    let app = transport::http::create_router(app_state)
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()),
        )
        .layer(cors);

    let bind_addr = config::bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("API server listening on http://{}", bind_addr);
    info!("Swagger UI available at http://{}/swagger-ui", bind_addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received, exiting");
        }
    }

    Ok(())
}
