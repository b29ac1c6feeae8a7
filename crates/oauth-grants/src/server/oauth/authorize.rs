//! Token issuance for the password and client credentials grants.
//!
//! Processing order: client authentication, grant dispatch, scope
//! reconciliation, minting. Each step short-circuits with its own error.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::credentials::ClientCredentials;
use super::store::TokenStore;
use crate::config::Config;
use crate::error::{GrantError, GrantResult};
use crate::models::{Client, Registry, Scope, TokenRecord, TokenResponse};

/// Token endpoint form body.
#[derive(Clone, Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub scope: Option<String>,
}

impl TokenRequest {
    /// A password grant request.
    #[must_use]
    pub fn password(username: &str, password: &str, scope: Option<&str>) -> Self {
        Self {
            grant_type: Some(GrantType::Password.as_str().to_owned()),
            username: Some(username.to_owned()),
            password: Some(password.to_owned()),
            scope: scope.map(str::to_owned),
        }
    }

    /// A client credentials grant request.
    #[must_use]
    pub fn client_credentials(scope: Option<&str>) -> Self {
        Self {
            grant_type: Some(GrantType::ClientCredentials.as_str().to_owned()),
            scope: scope.map(str::to_owned),
            ..Self::default()
        }
    }
}

impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("username", &self.username)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Supported grant types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    Password,
    ClientCredentials,
}

impl GrantType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::ClientCredentials => "client_credentials",
        }
    }

    /// Grant types advertised in discovery metadata.
    pub const SUPPORTED: [Self; 2] = [Self::Password, Self::ClientCredentials];

    /// # Errors
    ///
    /// Returns [`GrantError::UnsupportedGrantType`] for anything else.
    pub fn parse(raw: Option<&str>) -> GrantResult<Self> {
        match raw {
            Some("password") => Ok(Self::Password),
            Some("client_credentials") => Ok(Self::ClientCredentials),
            other => Err(GrantError::unsupported_grant_type(other.unwrap_or_default())),
        }
    }
}

/// Issues access tokens against a fixed registry.
#[derive(Clone)]
pub struct AuthorizationServer {
    registry: Arc<Registry>,
    store: Arc<dyn TokenStore>,
    token_ttl: chrono::Duration,
}

impl AuthorizationServer {
    #[must_use]
    pub fn new(config: &Config, store: Arc<dyn TokenStore>) -> Self {
        Self {
            registry: Arc::clone(&config.registry),
            store,
            token_ttl: config.token_ttl_chrono(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Issue a token for a request carrying the raw `Authorization` header.
    pub async fn issue_token(
        &self,
        authorization: Option<&str>,
        request: &TokenRequest,
    ) -> GrantResult<TokenResponse> {
        self.issue_token_at(authorization, request, Utc::now()).await
    }

    /// Issue a token as of `now`.
    pub async fn issue_token_at(
        &self,
        authorization: Option<&str>,
        request: &TokenRequest,
        now: DateTime<Utc>,
    ) -> GrantResult<TokenResponse> {
        let client = self.authenticate_client(authorization)?;
        let grant_type = GrantType::parse(request.grant_type.as_deref()).inspect_err(|_| {
            tracing::info!(client_id = %client.client_id, grant_type = ?request.grant_type, "Unknown grant type");
        })?;

        let username = match grant_type {
            GrantType::Password => Some(self.authenticate_resource_owner(request)?),
            GrantType::ClientCredentials => None,
        };

        let scope = reconcile_scope(request.scope.as_deref(), client)?;

        let record = TokenRecord::mint(&client.client_id, username, scope, now, self.token_ttl);
        let response = TokenResponse::from_record(&record);
        let expires_at = record.expires_at;

        self.store.put(record).await?;

        tracing::info!(
            client_id = %client.client_id,
            grant_type = grant_type.as_str(),
            scope = %response.scope,
            expires_at = %expires_at.to_rfc2822(),
            "Issued access token"
        );

        Ok(response)
    }

    /// Resolve the client from a Basic header and verify its secret.
    ///
    /// Unknown id and wrong secret both yield [`GrantError::InvalidClient`].
    fn authenticate_client(&self, authorization: Option<&str>) -> GrantResult<&Client> {
        let Some(credentials) = authorization.and_then(ClientCredentials::from_basic_header)
        else {
            tracing::info!("Missing or malformed client credentials");
            return Err(GrantError::InvalidClient);
        };

        let Some(client) = self.registry.client(&credentials.client_id) else {
            tracing::info!(client_id = %credentials.client_id, "Unknown client");
            return Err(GrantError::InvalidClient);
        };

        if client.client_secret != credentials.client_secret {
            tracing::info!(client_id = %client.client_id, "Mismatched client secret");
            return Err(GrantError::InvalidClient);
        }

        Ok(client)
    }

    /// Verify the resource owner named in a password grant.
    fn authenticate_resource_owner(&self, request: &TokenRequest) -> GrantResult<String> {
        let username = request.username.as_deref().unwrap_or_default();
        let Some(owner) = self.registry.resource_owner(username) else {
            tracing::info!(username, "Unknown resource owner");
            return Err(GrantError::InvalidGrant);
        };

        if request.password.as_deref() != Some(owner.password.as_str()) {
            tracing::info!(username, "Mismatched resource owner password");
            return Err(GrantError::InvalidGrant);
        }

        Ok(owner.username.clone())
    }
}

impl fmt::Debug for AuthorizationServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationServer")
            .field("clients", &self.registry.client_count())
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

/// Check the requested scope against the client's registered scope.
///
/// An absent or empty request grants an empty scope rather than the client's
/// full registration.
///
/// # Errors
///
/// Returns [`GrantError::InvalidScope`] if any requested token is unregistered.
pub fn reconcile_scope(requested: Option<&str>, client: &Client) -> GrantResult<Scope> {
    let requested = Scope::parse_optional(requested);
    let excess = requested.difference(&client.scope);
    if !excess.is_empty() {
        tracing::info!(client_id = %client.client_id, excess = ?excess, "Invalid scope requested");
        return Err(GrantError::InvalidScope);
    }
    Ok(requested)
}
