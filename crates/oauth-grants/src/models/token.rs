//! Token records, issuance responses and resolved principals.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::scope::Scope;

/// The only token type issued.
pub const TOKEN_TYPE: &str = "Bearer";

/// Minimum token length in characters (256 bits of hex).
pub const TOKEN_LENGTH: usize = 64;

/// Generate an opaque access token from two random UUIDs.
#[must_use]
pub fn generate_token() -> String {
    format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
}

/// A stored access token.
///
/// Written once at issuance and never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub token_type: String,
    pub client_id: String,
    /// Resource owner for password grants; `None` for client credentials.
    pub username: Option<String>,
    pub scope: Scope,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Mint a fresh record issued at `now` and living for `ttl`.
    ///
    /// A lifetime past the representable range expires at `MAX_UTC`.
    #[must_use]
    pub fn mint(
        client_id: impl Into<String>,
        username: Option<String>,
        scope: Scope,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            access_token: generate_token(),
            token_type: TOKEN_TYPE.to_owned(),
            client_id: client_id.into(),
            username,
            scope,
            issued_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// A token is dead once `now` reaches `expires_at`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Seconds of life left at `now`, floored at zero.
    #[must_use]
    pub fn expires_in_at(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((self.expires_at - now).num_seconds()).unwrap_or(0)
    }

    /// The identity this token grants.
    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal {
            client_id: self.client_id.clone(),
            username: self.username.clone(),
            scope: self.scope.clone(),
        }
    }
}

/// Successful token endpoint response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Space-joined granted scope.
    pub scope: String,
    pub expires_in: u64,
}

impl TokenResponse {
    #[must_use]
    pub fn from_record(record: &TokenRecord) -> Self {
        Self {
            access_token: record.access_token.clone(),
            token_type: record.token_type.clone(),
            scope: record.scope.to_wire(),
            expires_in: record.expires_in_at(record.issued_at),
        }
    }
}

/// Identity resolved from a valid bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub client_id: String,
    pub username: Option<String>,
    pub scope: Scope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let record =
            TokenRecord::mint("c", None, Scope::parse("a"), now, Duration::seconds(10));

        assert!(!record.is_expired_at(now));
        assert!(!record.is_expired_at(now + Duration::seconds(9)));
        assert!(record.is_expired_at(now + Duration::seconds(10)));
        assert!(record.is_expired_at(now + Duration::seconds(11)));
    }

    #[test]
    fn test_expires_in() {
        let now = Utc::now();
        let record = TokenRecord::mint("c", None, Scope::default(), now, Duration::days(30));

        assert_eq!(record.expires_in_at(now), 2_592_000);
        assert_eq!(record.expires_in_at(now + Duration::days(31)), 0);
    }

    #[test]
    fn test_oversized_ttl_saturates() {
        let now = Utc::now();
        let record = TokenRecord::mint("c", None, Scope::default(), now, Duration::MAX);

        assert_eq!(record.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(!record.is_expired_at(now));
        assert!(record.expires_in_at(now) > 0);
    }

    #[test]
    fn test_response_from_record() {
        let now = Utc::now();
        let record = TokenRecord::mint(
            "takusou",
            Some("komori".into()),
            Scope::parse("foo bar"),
            now,
            Duration::seconds(3600),
        );
        let response = TokenResponse::from_record(&record);

        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.scope, "foo bar");
        assert_eq!(response.expires_in, 3600);
        assert_eq!(response.access_token, record.access_token);
    }
}
