//! Client flow driver.
//!
//! Obtains a token from the authorization server with one of the two
//! supported grants, remembers it, and presents it to the resource server.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, header};
use tokio::sync::RwLock;
use url::Url;

use crate::error::DriverError;
use crate::models::TokenResponse;
use crate::server::oauth::credentials::ClientCredentials;
use crate::server::oauth::handlers::TokenErrorBody;

/// Request timeout for driver calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and as whom the driver talks.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: ClientCredentials,
    /// Scope sent with every grant request.
    pub scope: String,
    pub token_endpoint: Url,
    pub resource_endpoint: Url,
}

impl ClientConfig {
    /// Build a config from server base URLs.
    ///
    /// # Errors
    ///
    /// Returns error if either URL is invalid.
    pub fn new(
        credentials: ClientCredentials,
        scope: impl Into<String>,
        auth_server: &str,
        resource_server: &str,
    ) -> Result<Self, DriverError> {
        Ok(Self {
            credentials,
            scope: scope.into(),
            token_endpoint: Url::parse(auth_server)?.join("token")?,
            resource_endpoint: Url::parse(resource_server)?.join("resource")?,
        })
    }

    /// The demo client `takusou` against local default ports.
    ///
    /// # Errors
    ///
    /// Returns error if the default URLs fail to parse.
    pub fn demo() -> Result<Self, DriverError> {
        Self::new(
            ClientCredentials::new("takusou", "takusou-secret"),
            "foo bar",
            "http://localhost:9001/",
            "http://localhost:3002/",
        )
    }
}

/// A token held by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObtainedToken {
    pub access_token: String,
    pub scope: String,
    pub expires_in: u64,
    /// Absolute expiry computed when the token was received.
    pub expires_at: DateTime<Utc>,
}

impl ObtainedToken {
    fn from_response(response: TokenResponse, received_at: DateTime<Utc>) -> Self {
        let expires_at = i64::try_from(response.expires_in)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|lifetime| received_at.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            access_token: response.access_token,
            scope: response.scope,
            expires_in: response.expires_in,
            expires_at,
        }
    }
}

/// Drives the token lifecycle from the client side.
pub struct FlowDriver {
    http: Client,
    config: ClientConfig,
    token: RwLock<Option<ObtainedToken>>,
}

impl FlowDriver {
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: ClientConfig) -> Result<Self, DriverError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, config, token: RwLock::new(None) })
    }

    /// Resource Owner Password Credentials grant.
    pub async fn password_grant(
        &self,
        username: &str,
        password: &str,
    ) -> Result<ObtainedToken, DriverError> {
        let form = [
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
            ("scope", self.config.scope.as_str()),
        ];
        self.request_token(&form).await
    }

    /// Client Credentials grant.
    pub async fn client_credentials_grant(&self) -> Result<ObtainedToken, DriverError> {
        let form = [("grant_type", "client_credentials"), ("scope", self.config.scope.as_str())];
        self.request_token(&form).await
    }

    /// Present the held token to the resource server.
    ///
    /// A rejected token is forgotten.
    pub async fn fetch_resource(&self) -> Result<serde_json::Value, DriverError> {
        let Some(token) = self.current_token().await else {
            return Err(DriverError::MissingToken);
        };

        tracing::debug!(endpoint = %self.config.resource_endpoint, "Making resource request");

        let response = self
            .http
            .post(self.config.resource_endpoint.clone())
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            *self.token.write().await = None;
            tracing::warn!(status = status.as_u16(), "Resource request rejected");
            return Err(DriverError::ResourceRejected { status: status.as_u16() });
        }

        Ok(response.json().await?)
    }

    /// The token currently held, if any.
    pub async fn current_token(&self) -> Option<ObtainedToken> {
        self.token.read().await.clone()
    }

    /// Forget the held token.
    pub async fn reset(&self) {
        *self.token.write().await = None;
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<ObtainedToken, DriverError> {
        let response = self
            .http
            .post(self.config.token_endpoint.clone())
            .header(header::AUTHORIZATION, self.config.credentials.to_basic_header())
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let error = response
                .json::<TokenErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_default();
            tracing::warn!(status = status.as_u16(), error = %error, "Token request rejected");
            return Err(DriverError::TokenRejected { status: status.as_u16(), error });
        }

        let body: TokenResponse = response.json().await?;
        let token = ObtainedToken::from_response(body, Utc::now());

        tracing::info!(
            scope = %token.scope,
            expires_at = %token.expires_at.to_rfc2822(),
            "Obtained access token"
        );

        *self.token.write().await = Some(token.clone());
        Ok(token)
    }
}

impl std::fmt::Debug for FlowDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowDriver").field("config", &self.config).finish()
    }
}
