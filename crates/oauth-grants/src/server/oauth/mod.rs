//! OAuth 2.0 authorization core, token store and resource guard.
//!
//! ## Supported Standards
//! - RFC 6749 §4.3: Resource Owner Password Credentials Grant
//! - RFC 6749 §4.4: Client Credentials Grant
//! - RFC 6750: Bearer Token Usage
//! - RFC 8414: OAuth Authorization Server Metadata
//! - RFC 9728: OAuth Protected Resource Metadata

pub mod authorize;
pub mod credentials;
pub mod file_store;
pub mod guard;
pub mod handlers;
pub mod store;

pub use authorize::{AuthorizationServer, GrantType, TokenRequest};
pub use credentials::ClientCredentials;
pub use file_store::FileTokenStore;
pub use guard::ResourceGuard;
pub use store::{MemoryTokenStore, TokenStore};
