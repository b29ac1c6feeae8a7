//! OAuth 2.0 Grants
//!
//! An authorization server for the Resource Owner Password Credentials and
//! Client Credentials grants, a bearer-token guard for protected resources,
//! and a client driver that walks the whole token lifecycle.
//!
//! # Features
//!
//! - **Two grants**: `password` and `client_credentials`, authenticated with HTTP Basic
//! - **Scope reconciliation**: requested scope must be a subset of the client's registration
//! - **Opaque tokens**: random 256-bit strings looked up in a [`TokenStore`](server::oauth::TokenStore)
//! - **Lazy expiry**: expired tokens are rejected on lookup, with an optional background sweep
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use oauth_grants::config::Config;
//! use oauth_grants::server::oauth::{AuthorizationServer, MemoryTokenStore, TokenRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let server = AuthorizationServer::new(&config, Arc::new(MemoryTokenStore::new()));
//!
//!     let request = TokenRequest::client_credentials(Some("foo"));
//!     let token = server
//!         .issue_token(Some("Basic dGFrdXNvdTp0YWt1c291LXNlY3JldA=="), &request)
//!         .await?;
//!     println!("{}", token.access_token);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod server;

pub use client::FlowDriver;
pub use config::Config;
pub use error::{ConfigError, Denied, DriverError, GrantError, StoreError};
