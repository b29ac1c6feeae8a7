//! Static client and resource-owner registries.
//!
//! Loaded once at startup and handed to the authorization server; never
//! mutated afterwards.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use super::scope::{Scope, deserialize_space_delimited};
use crate::error::ConfigError;

/// A registered OAuth client.
#[derive(Clone, Deserialize)]
pub struct Client {
    pub client_id: String,
    pub client_secret: String,
    /// Maximum scope grantable to this client.
    #[serde(default, deserialize_with = "deserialize_space_delimited")]
    pub scope: Scope,
}

impl Client {
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>, scope: &str) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: Scope::parse(scope),
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish()
    }
}

/// A resource owner able to use the password grant.
#[derive(Clone, Deserialize)]
pub struct ResourceOwner {
    pub username: String,
    pub password: String,
}

impl ResourceOwner {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

impl fmt::Debug for ResourceOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceOwner").field("username", &self.username).finish()
    }
}

/// On-disk registry layout.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    clients: Vec<Client>,
    #[serde(default)]
    resource_owners: Vec<ResourceOwner>,
}

/// Immutable lookup tables for clients and resource owners.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    clients: HashMap<String, Client>,
    resource_owners: HashMap<String, ResourceOwner>,
}

impl Registry {
    /// Build a registry, rejecting duplicate client ids or usernames.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Duplicate`] when a key appears twice.
    pub fn new(
        clients: Vec<Client>,
        resource_owners: Vec<ResourceOwner>,
    ) -> Result<Self, ConfigError> {
        let mut by_id = HashMap::with_capacity(clients.len());
        for client in clients {
            if by_id.contains_key(&client.client_id) {
                return Err(ConfigError::Duplicate { kind: "client_id", id: client.client_id });
            }
            by_id.insert(client.client_id.clone(), client);
        }

        let mut by_name = HashMap::with_capacity(resource_owners.len());
        for owner in resource_owners {
            if by_name.contains_key(&owner.username) {
                return Err(ConfigError::Duplicate { kind: "username", id: owner.username });
            }
            by_name.insert(owner.username.clone(), owner);
        }

        Ok(Self { clients: by_id, resource_owners: by_name })
    }

    /// Parse a JSON registry document.
    ///
    /// ```json
    /// {
    ///   "clients": [{"client_id": "takusou", "client_secret": "takusou-secret", "scope": "foo bar"}],
    ///   "resource_owners": [{"username": "komori", "password": "password"}]
    /// }
    /// ```
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let file: RegistryFile = serde_json::from_str(raw)?;
        Self::new(file.clients, file.resource_owners)
    }

    /// The demo registry: three clients and four resource owners.
    #[must_use]
    pub fn demo() -> Self {
        let clients = vec![
            Client::new("takusou", "takusou-secret", "foo bar"),
            Client::new("jiken", "jiken-secret", "data.all"),
            Client::new("keiki", "keiki-secret", "data.read"),
        ];
        let owners = ["komori", "oyama", "fujita", "nunomura"]
            .into_iter()
            .map(|name| ResourceOwner::new(name, "password"))
            .collect();

        // Keys above are distinct.
        Self::new(clients, owners).unwrap_or_default()
    }

    #[must_use]
    pub fn client(&self, client_id: &str) -> Option<&Client> {
        self.clients.get(client_id)
    }

    #[must_use]
    pub fn resource_owner(&self, username: &str) -> Option<&ResourceOwner> {
        self.resource_owners.get(username)
    }

    /// All registered clients, sorted by id.
    #[must_use]
    pub fn clients(&self) -> Vec<&Client> {
        let mut clients: Vec<_> = self.clients.values().collect();
        clients.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        clients
    }

    /// Union of every client's registered scope.
    #[must_use]
    pub fn scopes_supported(&self) -> Scope {
        self.clients().into_iter().flat_map(|c| c.scope.iter()).collect()
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn resource_owner_count(&self) -> usize {
        self.resource_owners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_registry() {
        let registry = Registry::demo();
        assert_eq!(registry.client_count(), 3);
        assert_eq!(registry.resource_owner_count(), 4);

        let takusou = registry.client("takusou").unwrap();
        assert_eq!(takusou.client_secret, "takusou-secret");
        assert_eq!(takusou.scope.to_wire(), "foo bar");
        assert!(registry.resource_owner("komori").is_some());
        assert!(registry.resource_owner("nobody").is_none());
    }

    #[test]
    fn test_from_json() {
        let registry = Registry::from_json(
            r#"{
                "clients": [{"client_id": "a", "client_secret": "s", "scope": "x y"}],
                "resource_owners": [{"username": "u", "password": "p"}]
            }"#,
        )
        .unwrap();

        assert_eq!(registry.client("a").unwrap().scope.to_wire(), "x y");
        assert_eq!(registry.resource_owner("u").unwrap().password, "p");
    }

    #[test]
    fn test_from_json_missing_scope_is_empty() {
        let registry =
            Registry::from_json(r#"{"clients": [{"client_id": "a", "client_secret": "s"}]}"#)
                .unwrap();
        assert!(registry.client("a").unwrap().scope.is_empty());
        assert_eq!(registry.resource_owner_count(), 0);
    }

    #[test]
    fn test_duplicate_client_rejected() {
        let err = Registry::new(
            vec![Client::new("a", "1", ""), Client::new("a", "2", "")],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Duplicate { kind: "client_id", .. }));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let client = Client::new("a", "super-secret", "x");
        let owner = ResourceOwner::new("u", "hunter2");
        assert!(!format!("{client:?}").contains("super-secret"));
        assert!(!format!("{owner:?}").contains("hunter2"));
    }

    #[test]
    fn test_scopes_supported() {
        let scopes = Registry::demo().scopes_supported();
        assert!(scopes.contains("foo"));
        assert!(scopes.contains("data.read"));
        assert_eq!(scopes.len(), 4);
    }
}
