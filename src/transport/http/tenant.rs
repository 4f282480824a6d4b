//! Tenant resolution middleware.
//!
//! Every request gets a [`Tenant`] extension: an explicit `X-Tenant` header
//! wins (useful for tools and tests), otherwise the `Host` header decides.
//! The KM storefront lives on its own host prefix.

use crate::domain::tenant::Tenant;
use crate::transport::http::types::AppState;
use axum::extract::{Request, State};
use axum::http::header::HOST;
use axum::middleware::Next;
use axum::response::Response;

pub async fn resolve_tenant(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let explicit = request
        .headers()
        .get("x-tenant")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Tenant>().ok());
    let tenant = explicit.unwrap_or_else(|| {
        let host = request
            .headers()
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        Tenant::from_host(host, &state.km_host_prefix)
    });
    request.extensions_mut().insert(tenant);
    next.run(request).await
}
