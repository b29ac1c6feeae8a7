//! Token store abstraction and the in-memory backend.
//!
//! Lookups are exact-match on the token string. A `put` is visible to every
//! subsequent `get` once it returns.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::StoreResult;
use crate::models::TokenRecord;

/// Keyed storage for issued tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a freshly minted token.
    async fn put(&self, record: TokenRecord) -> StoreResult<()>;

    /// Look up a token by its exact string. Expired records are still returned.
    async fn get(&self, access_token: &str) -> StoreResult<Option<TokenRecord>>;

    /// Discard every stored token.
    async fn clear(&self) -> StoreResult<()>;

    /// Remove tokens expired at `now`, returning how many were dropped.
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize>;
}

/// Spawn a task that periodically removes expired tokens.
pub fn start_cleanup_task(store: Arc<dyn TokenStore>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match store.purge_expired(Utc::now()).await {
                Ok(0) => {}
                Ok(count) => tracing::debug!(count, "Cleaned up expired access tokens"),
                Err(e) => tracing::warn!(error = %e, "Expired token sweep failed"),
            }
        }
    });
}

/// In-memory token store.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    tokens: Arc<RwLock<HashMap<String, TokenRecord>>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, expired ones included.
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn put(&self, record: TokenRecord) -> StoreResult<()> {
        self.tokens.write().await.insert(record.access_token.clone(), record);
        Ok(())
    }

    async fn get(&self, access_token: &str) -> StoreResult<Option<TokenRecord>> {
        Ok(self.tokens.read().await.get(access_token).cloned())
    }

    async fn clear(&self) -> StoreResult<()> {
        self.tokens.write().await.clear();
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, token| !token.is_expired_at(now));
        Ok(before - tokens.len())
    }
}

impl std::fmt::Debug for MemoryTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTokenStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::Scope;

    fn record(ttl_secs: i64, now: DateTime<Utc>) -> TokenRecord {
        TokenRecord::mint("client1", None, Scope::parse("foo"), now, Duration::seconds(ttl_secs))
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryTokenStore::new();
        let token = record(60, Utc::now());

        store.put(token.clone()).await.unwrap();

        let found = store.get(&token.access_token).await.unwrap();
        assert_eq!(found, Some(token));
        assert!(store.get("invalid").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_is_exact() {
        let store = MemoryTokenStore::new();
        let token = record(60, Utc::now());
        store.put(token.clone()).await.unwrap();

        let upper = token.access_token.to_uppercase();
        assert!(store.get(&upper).await.unwrap().is_none());
        assert!(store.get(&token.access_token[1..]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryTokenStore::new();
        store.put(record(60, Utc::now())).await.unwrap();
        store.put(record(60, Utc::now())).await.unwrap();
        assert_eq!(store.len().await, 2);

        store.clear().await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_returns_expired_records() {
        let now = Utc::now();
        let store = MemoryTokenStore::new();
        let token = record(1, now - Duration::seconds(10));
        store.put(token.clone()).await.unwrap();

        let found = store.get(&token.access_token).await.unwrap().unwrap();
        assert!(found.is_expired_at(now));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let now = Utc::now();
        let store = MemoryTokenStore::new();
        let stale = record(1, now - Duration::seconds(10));
        let live = record(60, now);
        store.put(stale.clone()).await.unwrap();
        store.put(live.clone()).await.unwrap();

        assert_eq!(store.purge_expired(now).await.unwrap(), 1);
        assert!(store.get(&stale.access_token).await.unwrap().is_none());
        assert!(store.get(&live.access_token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_puts() {
        let store = MemoryTokenStore::new();
        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let token = record(60, Utc::now());
                store.put(token.clone()).await.unwrap();
                store.get(&token.access_token).await.unwrap().is_some()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(store.len().await, 32);
    }
}
