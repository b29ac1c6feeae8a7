//! JSON-lines token store on local disk.
//!
//! Lets a separately deployed authorization server and resource server share
//! issued tokens through one file. Each record is appended as a single line
//! with one write; readers skip lines that do not parse, so a torn trailing
//! write from another process is never returned as a record.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::store::TokenStore;
use crate::error::StoreResult;
use crate::models::TokenRecord;

/// File-backed token store.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    /// Serializes writers within this process.
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_records(&self) -> StoreResult<Vec<TokenRecord>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping unreadable token store line");
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn put(&self, record: TokenRecord) -> StoreResult<()> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file =
            fs::OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(&line).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }

    async fn get(&self, access_token: &str) -> StoreResult<Option<TokenRecord>> {
        Ok(self
            .read_records()
            .await?
            .into_iter()
            .find(|record| record.access_token == access_token))
    }

    async fn clear(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        fs::write(&self.path, b"").await?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_records().await?;
        let before = records.len();
        records.retain(|r| !r.is_expired_at(now));

        let mut contents = Vec::new();
        for record in &records {
            serde_json::to_writer(&mut contents, record)?;
            contents.push(b'\n');
        }

        // Replace atomically so concurrent readers see either file in full.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &contents).await?;
        fs::rename(&tmp, &self.path).await?;

        Ok(before - records.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::Scope;

    fn temp_store() -> FileTokenStore {
        let path = std::env::temp_dir().join(format!("tokens-{}.jsonl", uuid::Uuid::new_v4()));
        FileTokenStore::new(path)
    }

    fn record(ttl_secs: i64, now: DateTime<Utc>) -> TokenRecord {
        TokenRecord::mint(
            "takusou",
            Some("komori".into()),
            Scope::parse("foo bar"),
            now,
            Duration::seconds(ttl_secs),
        )
    }

    #[tokio::test]
    async fn test_get_from_missing_file() {
        let store = temp_store();
        assert!(store.get("anything").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = temp_store();
        let token = record(60, Utc::now());
        store.put(token.clone()).await.unwrap();

        assert_eq!(store.get(&token.access_token).await.unwrap(), Some(token));
        std::fs::remove_file(store.path()).ok();
    }

    #[tokio::test]
    async fn test_shared_between_handles() {
        let writer = temp_store();
        let reader = FileTokenStore::new(writer.path());
        let token = record(60, Utc::now());

        writer.put(token.clone()).await.unwrap();
        assert!(reader.get(&token.access_token).await.unwrap().is_some());
        std::fs::remove_file(writer.path()).ok();
    }

    #[tokio::test]
    async fn test_torn_line_is_skipped() {
        let store = temp_store();
        let token = record(60, Utc::now());
        store.put(token.clone()).await.unwrap();

        let mut file =
            fs::OpenOptions::new().append(true).open(store.path()).await.unwrap();
        file.write_all(br#"{"access_token":"half"#).await.unwrap();
        file.flush().await.unwrap();

        assert!(store.get(&token.access_token).await.unwrap().is_some());
        assert!(store.get("half").await.unwrap().is_none());
        std::fs::remove_file(store.path()).ok();
    }

    #[tokio::test]
    async fn test_clear() {
        let store = temp_store();
        let token = record(60, Utc::now());
        store.put(token.clone()).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.get(&token.access_token).await.unwrap().is_none());
        std::fs::remove_file(store.path()).ok();
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let now = Utc::now();
        let store = temp_store();
        let stale = record(1, now - Duration::seconds(5));
        let live = record(60, now);
        store.put(stale.clone()).await.unwrap();
        store.put(live.clone()).await.unwrap();

        assert_eq!(store.purge_expired(now).await.unwrap(), 1);
        assert!(store.get(&stale.access_token).await.unwrap().is_none());
        assert_eq!(store.get(&live.access_token).await.unwrap(), Some(live));
        std::fs::remove_file(store.path()).ok();
    }
}
