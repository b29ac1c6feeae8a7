//! Error types for the OAuth grant server, resource guard and client driver.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use axum::http::StatusCode;

/// Rejections from token issuance.
///
/// Every variant except [`GrantError::Store`] is an expected, well-formed denial
/// that the caller can act on. None of them reveal which internal check failed.
#[derive(thiserror::Error, Debug)]
pub enum GrantError {
    /// Unknown client, wrong secret, or a missing/malformed Basic credential header.
    #[error("invalid client credentials")]
    InvalidClient,

    /// Unknown resource owner or wrong password (password grant only).
    #[error("invalid resource owner credentials")]
    InvalidGrant,

    /// Grant type other than `password` or `client_credentials`.
    #[error("unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The grant type the caller asked for
        grant_type: String,
    },

    /// Requested scope exceeds the client's registered scope.
    #[error("requested scope exceeds registered scope")]
    InvalidScope,

    /// The token could not be persisted.
    #[error("token store error: {0}")]
    Store(#[from] StoreError),
}

impl GrantError {
    /// Create an unsupported grant type error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType { grant_type: grant_type.into() }
    }

    /// OAuth 2.0 `error` code sent on the wire (RFC 6749 §5.2).
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
            Self::Store(_) => "server_error",
        }
    }

    /// HTTP status for this rejection.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidClient | Self::InvalidGrant | Self::InvalidScope => {
                StatusCode::UNAUTHORIZED
            }
            Self::UnsupportedGrantType { .. } => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns true if this is a caller-facing denial rather than an infrastructure fault.
    #[must_use]
    pub const fn is_denial(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

/// Rejection from the resource guard.
///
/// Missing or malformed bearer header, unknown token and expired token all
/// collapse into this single value.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("access denied")]
pub struct Denied;

/// Errors from a token store backend.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors loading startup configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Registry file could not be read
    #[error("Failed to read registry file {path}: {source}")]
    Read {
        /// Path of the registry file
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Registry file is not valid JSON for the expected shape
    #[error("Failed to parse registry file: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment variable holds an unusable value
    #[error("Invalid value for {name}: {value}")]
    InvalidEnv {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },

    /// Two registry entries share the same key
    #[error("Duplicate {kind} in registry: {id}")]
    Duplicate {
        /// "client_id" or "username"
        kind: &'static str,
        /// The duplicated key
        id: String,
    },
}

/// Errors from the client flow driver.
#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No token has been obtained yet, or the last one was rejected
    #[error("Missing access token")]
    MissingToken,

    /// Token endpoint refused the grant
    #[error("Unable to fetch access token, server response: {status} {error}")]
    TokenRejected {
        /// HTTP status code
        status: u16,
        /// OAuth error code from the response body, if any
        error: String,
    },

    /// Resource server refused the bearer token
    #[error("Unable to fetch resource, server response: {status}")]
    ResourceRejected {
        /// HTTP status code
        status: u16,
    },

    /// Endpoint URL could not be built
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias for token issuance.
pub type GrantResult<T> = Result<T, GrantError>;

/// Result type alias for token store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_error_wire_codes() {
        assert_eq!(GrantError::InvalidClient.error_code(), "invalid_client");
        assert_eq!(GrantError::InvalidGrant.error_code(), "invalid_grant");
        assert_eq!(GrantError::InvalidScope.error_code(), "invalid_scope");
        assert_eq!(GrantError::unsupported_grant_type("implicit").error_code(), "unsupported_grant_type");
    }

    #[test]
    fn test_grant_error_status_codes() {
        assert_eq!(GrantError::InvalidClient.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(GrantError::InvalidGrant.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(GrantError::InvalidScope.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            GrantError::unsupported_grant_type("authorization_code").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_denials_are_not_server_errors() {
        let denials = [
            GrantError::InvalidClient,
            GrantError::InvalidGrant,
            GrantError::InvalidScope,
            GrantError::unsupported_grant_type("x"),
        ];
        for err in denials {
            assert!(err.is_denial());
            assert!(!err.status_code().is_server_error());
        }

        let io = std::io::Error::other("disk full");
        let err = GrantError::from(StoreError::from(io));
        assert!(!err.is_denial());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
