//! Cookie sessions.
//!
//! Login issues a UUID token kept in an in-process store with a fixed TTL;
//! the cookie carries only the token. [`CurrentUser`] and [`AdminUser`] are
//! extractors that turn the cookie back into the authenticated session or
//! reject with the JSON envelope.

use crate::domain::model::{Role, User};
use crate::domain::tenant::Tenant;
use crate::transport::http::types::{ApiResponse, AppState};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

pub const SESSION_COOKIE: &str = "keymart_session";

#[derive(Clone, Debug, Serialize)]
pub struct SessionData {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub tenant: Tenant,
    pub login_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, SessionData>>,
}

impl SessionStore {
    pub fn new(ttl_hours: i64) -> Self {
        SessionStore {
            ttl: Duration::hours(ttl_hours),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a session for the user and returns the token.
    pub async fn create(&self, user: &User) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        self.sessions.write().await.insert(
            token.clone(),
            SessionData {
                user_id: user.id,
                username: user.username.clone(),
                role: user.role,
                tenant: user.tenant,
                login_at: now,
                expires_at: now + self.ttl,
            },
        );
        token
    }

    /// Returns the session if the token is known and not expired.
    pub async fn validate(&self, token: &str) -> Option<SessionData> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(token)?;
        if Utc::now() > session.expires_at {
            return None;
        }
        Some(session.clone())
    }

    pub async fn destroy(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }
}

/// Pulls the session token out of the `Cookie` header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        if let Some((name, value)) = pair.trim().split_once('=') {
            if name == SESSION_COOKIE {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn unauthorized() -> (StatusCode, Json<ApiResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::error("authentication required")),
    )
}

/// Authenticated session, any role.
pub struct CurrentUser {
    pub session: SessionData,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = (StatusCode, Json<ApiResponse>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or_else(unauthorized)?;
        let session = state
            .sessions
            .validate(&token)
            .await
            .ok_or_else(unauthorized)?;
        Ok(CurrentUser { session, token })
    }
}

/// Authenticated session with the `admin` role.
pub struct AdminUser {
    pub session: SessionData,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = (StatusCode, Json<ApiResponse>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        if current.session.role != Role::Admin {
            return Err((
                StatusCode::FORBIDDEN,
                Json(ApiResponse::error("admin access required")),
            ));
        }
        Ok(AdminUser {
            session: current.session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: 7,
            username: "tester".into(),
            email: None,
            password_hash: String::new(),
            role,
            tenant: Tenant::Eur,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn created_sessions_validate_and_destroy() {
        let store = SessionStore::new(8);
        let token = store.create(&user(Role::Customer)).await;
        let session = store.validate(&token).await.unwrap();
        assert_eq!(session.user_id, 7);

        store.destroy(&token).await;
        assert!(store.validate(&token).await.is_none());
    }

    #[tokio::test]
    async fn expired_sessions_do_not_validate() {
        let store = SessionStore::new(0);
        let token = store.create(&user(Role::Customer)).await;
        // TTL of zero hours expires the session at creation time.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(store.validate(&token).await.is_none());
    }

    #[test]
    fn token_parses_out_of_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            format!("theme=dark; {}=abc-123; other=1", SESSION_COOKIE)
                .parse()
                .unwrap(),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc-123"));
        assert_eq!(session_token(&HeaderMap::new()), None);
    }
}
