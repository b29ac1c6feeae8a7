//! HTTP Basic client credentials (RFC 6749 §2.3.1).
//!
//! The client id and secret are form-urlencoded before being joined with `:`
//! and base64-encoded, so both sides must percent-encode and percent-decode.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const BASIC_PREFIX: &str = "basic ";

/// Client id and secret carried in an `Authorization: Basic` header.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self { client_id: client_id.into(), client_secret: client_secret.into() }
    }

    /// Decode an `Authorization` header value.
    ///
    /// The scheme is matched case-insensitively. Returns `None` for any other
    /// scheme, bad base64, missing `:` separator, or bad percent-encoding.
    #[must_use]
    pub fn from_basic_header(header: &str) -> Option<Self> {
        let prefix = header.get(..BASIC_PREFIX.len())?;
        if !prefix.eq_ignore_ascii_case(BASIC_PREFIX) {
            return None;
        }

        let decoded = STANDARD.decode(header[BASIC_PREFIX.len()..].trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (id, secret) = decoded.split_once(':')?;

        Some(Self {
            client_id: urlencoding::decode(id).ok()?.into_owned(),
            client_secret: urlencoding::decode(secret).ok()?.into_owned(),
        })
    }

    /// Encode as an `Authorization` header value.
    #[must_use]
    pub fn to_basic_header(&self) -> String {
        let joined = format!(
            "{}:{}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.client_secret)
        );
        format!("Basic {}", STANDARD.encode(joined))
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials").field("client_id", &self.client_id).finish()
    }
}
