//! Bearer token validation for protected resources.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

use super::store::TokenStore;
use crate::error::Denied;
use crate::models::Principal;

const BEARER_PREFIX: &str = "bearer ";

/// Validates bearer tokens against a token store.
#[derive(Clone)]
pub struct ResourceGuard {
    store: Arc<dyn TokenStore>,
}

impl ResourceGuard {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Resolve the principal for a request's `Authorization` header.
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<Principal, Denied> {
        self.authorize_at(headers, Utc::now()).await
    }

    /// Resolve the principal as of `now`.
    ///
    /// A token whose `expires_at` is at or before `now` is treated as unknown;
    /// the record itself is left in place.
    pub async fn authorize_at(
        &self,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> Result<Principal, Denied> {
        let Some(token) = extract_bearer(headers) else {
            tracing::debug!("No bearer token on request");
            return Err(Denied);
        };

        let record = match self.store.get(token).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::info!("No matching token was found");
                return Err(Denied);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token lookup failed");
                return Err(Denied);
            }
        };

        if record.is_expired_at(now) {
            tracing::info!(client_id = %record.client_id, "Token expired");
            return Err(Denied);
        }

        tracing::debug!(client_id = %record.client_id, "Found a valid token");
        Ok(record.principal())
    }
}

impl std::fmt::Debug for ResourceGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceGuard").finish()
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The scheme is case-insensitive; the remainder is returned verbatim.
#[must_use]
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let prefix = value.get(..BEARER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = &value[BEARER_PREFIX.len()..];
    (!token.is_empty()).then_some(token)
}

impl IntoResponse for Denied {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))],
        )
            .into_response()
    }
}

/// Middleware that rejects requests without a live bearer token and stores
/// the resolved [`Principal`] in the request extensions.
pub async fn require_bearer(
    State(guard): State<ResourceGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    let outcome = guard.authorize(request.headers()).await;
    match outcome {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(denied) => denied.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::{Scope, TokenRecord};
    use crate::server::oauth::store::MemoryTokenStore;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    async fn guard_with(record: &TokenRecord) -> ResourceGuard {
        let store = MemoryTokenStore::new();
        store.put(record.clone()).await.unwrap();
        ResourceGuard::new(Arc::new(store))
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(&headers("Bearer abc")), Some("abc"));
        assert_eq!(extract_bearer(&headers("bearer abc")), Some("abc"));
        assert_eq!(extract_bearer(&headers("BEARER abc def")), Some("abc def"));
        assert_eq!(extract_bearer(&headers("Basic abc")), None);
        assert_eq!(extract_bearer(&headers("Bearer ")), None);
        assert_eq!(extract_bearer(&headers("Bearer")), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_valid_token() {
        let now = Utc::now();
        let record = TokenRecord::mint(
            "takusou",
            Some("komori".into()),
            Scope::parse("foo bar"),
            now,
            Duration::seconds(60),
        );
        let guard = guard_with(&record).await;

        let principal = guard
            .authorize_at(&headers(&format!("Bearer {}", record.access_token)), now)
            .await
            .unwrap();
        assert_eq!(principal.client_id, "takusou");
        assert_eq!(principal.username.as_deref(), Some("komori"));
        assert_eq!(principal.scope, Scope::parse("foo bar"));
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let guard = ResourceGuard::new(Arc::new(MemoryTokenStore::new()));
        assert_eq!(guard.authorize(&headers("Bearer fabricated")).await, Err(Denied));
    }

    #[tokio::test]
    async fn test_expired_token_is_denied_but_kept() {
        let now = Utc::now();
        let record = TokenRecord::mint("c", None, Scope::default(), now, Duration::seconds(5));
        let store = MemoryTokenStore::new();
        store.put(record.clone()).await.unwrap();
        let guard = ResourceGuard::new(Arc::new(store.clone()));
        let auth = headers(&format!("Bearer {}", record.access_token));

        assert!(guard.authorize_at(&auth, now + Duration::seconds(4)).await.is_ok());
        assert_eq!(guard.authorize_at(&auth, now + Duration::seconds(5)).await, Err(Denied));
        assert!(store.get(&record.access_token).await.unwrap().is_some());
    }

    #[test]
    fn test_denied_response() {
        let response = Denied.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    }
}
