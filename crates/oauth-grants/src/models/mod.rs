//! Data models shared by the authorization server, resource guard and client driver.

mod registry;
mod scope;
mod token;

pub use registry::{Client, Registry, ResourceOwner};
pub use scope::{Scope, deserialize_space_delimited};
pub use token::{Principal, TOKEN_LENGTH, TOKEN_TYPE, TokenRecord, TokenResponse, generate_token};
