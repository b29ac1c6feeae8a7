//! OAuth 2.0 endpoint handlers.
//!
//! Implements:
//! - RFC 6749 §4.3: Resource Owner Password Credentials Grant
//! - RFC 6749 §4.4: Client Credentials Grant
//! - RFC 6750: Bearer token usage on the protected resource
//! - RFC 8414 / RFC 9728: discovery metadata

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Extension, Form, Json,
    extract::{FromRequest, Request, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::authorize::{AuthorizationServer, GrantType, TokenRequest};
use crate::error::GrantError;
use crate::models::{Principal, Scope, TokenResponse};

/// Shared state for the authorization server routes.
#[derive(Debug, Clone)]
pub struct AuthState {
    pub server: AuthorizationServer,
    /// Base URL for metadata announcements.
    pub base_url: String,
}

/// Shared state for the resource server routes.
#[derive(Debug, Clone)]
pub struct ResourceState {
    /// Base URL for metadata announcements.
    pub base_url: String,
    /// Issuer to advertise in protected resource metadata.
    pub authorization_server: String,
}

// ─── Token Endpoint ──────────────────────────────────────────────────────────

/// Token request body, form-encoded or JSON.
///
/// Never rejects: a missing or unreadable body yields an empty request so the
/// client and grant checks decide the OAuth error.
#[derive(Debug)]
pub struct TokenBody(pub TokenRequest);

impl<S> FromRequest<S> for TokenBody
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("application/json"));

        let parsed = if is_json {
            Json::<TokenRequest>::from_request(req, state)
                .await
                .map(|Json(body)| body)
                .map_err(|e| e.body_text())
        } else {
            Form::<TokenRequest>::from_request(req, state)
                .await
                .map(|Form(body)| body)
                .map_err(|e| e.body_text())
        };

        Ok(Self(parsed.unwrap_or_else(|reason| {
            tracing::debug!(%reason, "Unreadable token request body");
            TokenRequest::default()
        })))
    }
}

/// `POST /token`
///
/// Authenticate the client, run the requested grant and issue a bearer token.
pub async fn handle_token(
    State(state): State<Arc<AuthState>>,
    headers: HeaderMap,
    TokenBody(form): TokenBody,
) -> Response {
    let authorization = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());

    match state.server.issue_token(authorization, &form).await {
        Ok(token) => token_success(&token),
        Err(e) => e.into_response(),
    }
}

/// Build a token response with required OAuth 2.0 cache headers (RFC 6749 §5.1).
fn token_success(token: &TokenResponse) -> Response {
    let mut response = Json(token).into_response();

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

/// Token endpoint error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenErrorBody {
    pub error: String,
}

impl IntoResponse for GrantError {
    fn into_response(self) -> Response {
        if self.is_denial() {
            tracing::debug!(error = self.error_code(), "Token request denied");
        } else {
            tracing::error!(error = %self, "Token issuance failed");
        }

        (
            self.status_code(),
            Json(TokenErrorBody { error: self.error_code().to_owned() }),
        )
            .into_response()
    }
}

// ─── Protected Resource ──────────────────────────────────────────────────────

/// Payload returned to a caller holding a valid token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcePayload {
    pub scope: Scope,
    pub username: Option<String>,
    pub client_id: String,
    pub description: String,
}

/// `POST /resource` (and `GET /resource`)
///
/// Runs behind [`super::guard::require_bearer`], which supplies the principal.
pub async fn handle_resource(Extension(principal): Extension<Principal>) -> Json<ResourcePayload> {
    Json(ResourcePayload {
        scope: principal.scope,
        username: principal.username,
        client_id: principal.client_id,
        description: "This data has been protected by OAuth 2.0".to_owned(),
    })
}

// ─── RFC 8414: Authorization Server Metadata ─────────────────────────────────

/// `GET /.well-known/oauth-authorization-server`
///
/// Describes the token endpoint and supported grants.
pub async fn handle_auth_server_metadata(State(state): State<Arc<AuthState>>) -> impl IntoResponse {
    let grant_types: Vec<&str> = GrantType::SUPPORTED.iter().map(|g| g.as_str()).collect();

    Json(serde_json::json!({
        "issuer": state.base_url,
        "token_endpoint": format!("{}/token", state.base_url),
        "grant_types_supported": grant_types,
        "token_endpoint_auth_methods_supported": ["client_secret_basic"],
        "scopes_supported": state.server.registry().scopes_supported(),
    }))
}

// ─── RFC 9728: Protected Resource Metadata ───────────────────────────────────

/// `GET /.well-known/oauth-protected-resource`
///
/// Tells clients where to find the authorization server for this resource.
pub async fn handle_protected_resource(State(state): State<Arc<ResourceState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "resource": state.base_url,
        "authorization_servers": [state.authorization_server],
        "bearer_methods_supported": ["header"],
    }))
}
