//! Local key/value storage for the bearer token and last download.
//!
//! A single JSON file stands in for browser storage. Every call re-reads the
//! file, so a token written by another process is visible on the next read.
//! Writes go through a temp file in the same directory and are renamed into
//! place. Read-modify-write cycles are serialized per store within the
//! process. The `async` variants run on the blocking pool.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::blocking;
use crate::error::{ClientError, ClientResult};

/// Key of the cached bearer token.
pub const AUTH_KEY: &str = "mediaveed_jwt";

/// Key of the last completed media download.
pub const LAST_DOWNLOAD_KEY: &str = "mediaveed_last_download";

/// Token lifetime without "remember me" (48 hours).
pub const SESSION_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 48);

/// Token lifetime with "remember me" (30 days).
pub const REMEMBER_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 30);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |exp| exp > now)
    }
}

/// File-backed string store.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
    // Shared by clones so concurrent writers never drop each other's keys
    write_lock: Arc<Mutex<()>>,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Apply `edit` to the current entries and write them back under the lock.
    fn update(&self, edit: impl FnOnce(&mut BTreeMap<String, Entry>) -> bool) -> ClientResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.load()?;
        if edit(&mut entries) {
            self.save(&entries)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> ClientResult<BTreeMap<String, Entry>> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(ClientError::Io(e)),
        }
    }

    fn save(&self, entries: &BTreeMap<String, Entry>) -> ClientResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(entries)?)?;
        tmp.persist(&self.path).map_err(|e| ClientError::Io(e.error))?;
        Ok(())
    }

    /// Live value for `key`. Expired entries read as absent.
    pub fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let entries = self.load()?;
        let now = Utc::now();
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    pub fn set(&self, key: &str, value: &str, max_age: Option<Duration>) -> ClientResult<()> {
        let expires_at = max_age
            .and_then(|age| chrono::Duration::from_std(age).ok())
            .map(|age| Utc::now() + age);
        let entry = Entry {
            value: value.to_string(),
            expires_at,
        };
        self.update(|entries| {
            entries.insert(key.to_string(), entry);
            true
        })
    }

    pub fn remove(&self, key: &str) -> ClientResult<()> {
        self.update(|entries| entries.remove(key).is_some())
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> ClientResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> ClientResult<()> {
        self.set(key, &serde_json::to_string(value)?, None)
    }

    pub async fn get_json_async<T>(&self, key: &str) -> ClientResult<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let store = self.clone();
        let key = key.to_string();
        blocking::run(move || store.get_json(&key)).await
    }

    pub async fn set_json_async<T>(&self, key: &str, value: &T) -> ClientResult<()>
    where
        T: Serialize,
    {
        let store = self.clone();
        let key = key.to_string();
        let raw = serde_json::to_string(value)?;
        blocking::run(move || store.set(&key, &raw, None)).await
    }

    pub async fn remove_async(&self, key: &str) -> ClientResult<()> {
        let store = self.clone();
        let key = key.to_string();
        blocking::run(move || store.remove(&key)).await
    }
}

/// Bearer token cache under [`AUTH_KEY`].
#[derive(Debug, Clone)]
pub struct TokenStore {
    store: LocalStore,
}

impl TokenStore {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Underlying store, shared with other cached values.
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Current token, if any. Storage failures read as "signed out".
    pub fn read_token(&self) -> Option<String> {
        match self.store.get(AUTH_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(path = %self.store.path().display(), "Failed to read auth token: {}", e);
                None
            }
        }
    }

    pub fn persist_token(&self, token: &str, remember: bool) -> ClientResult<()> {
        if token.is_empty() {
            return Ok(());
        }
        let max_age = if remember {
            REMEMBER_MAX_AGE
        } else {
            SESSION_MAX_AGE
        };
        self.store.set(AUTH_KEY, token, Some(max_age))?;
        debug!(remember, "Persisted auth token");
        Ok(())
    }

    pub fn clear_token(&self) -> ClientResult<()> {
        self.store.remove(AUTH_KEY)
    }

    /// [`read_token`](Self::read_token) on the blocking pool.
    pub async fn current_token(&self) -> Option<String> {
        let tokens = self.clone();
        match blocking::run(move || Ok(tokens.read_token())).await {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to read auth token: {}", e);
                None
            }
        }
    }

    pub async fn persist_token_async(&self, token: &str, remember: bool) -> ClientResult<()> {
        let tokens = self.clone();
        let token = token.to_string();
        blocking::run(move || tokens.persist_token(&token, remember)).await
    }

    pub async fn clear_token_async(&self) -> ClientResult<()> {
        let tokens = self.clone();
        blocking::run(move || tokens.clear_token()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mveed_models::{LastDownload, MediaKind, Platform};

    fn temp_store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("nested").join("storage.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let (_dir, store) = temp_store();
        assert_eq!(store.get("anything").unwrap(), None);
        store.remove("anything").unwrap();
    }

    #[test]
    fn test_set_get_remove() {
        let (_dir, store) = temp_store();
        store.set("k", "v", None).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let (_dir, store) = temp_store();
        store.set("k", "v", Some(Duration::ZERO)).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_token_store() {
        let (_dir, store) = temp_store();
        let tokens = TokenStore::new(store.clone());

        assert_eq!(tokens.read_token(), None);
        tokens.persist_token("jwt-1", false).unwrap();
        assert_eq!(tokens.read_token().as_deref(), Some("jwt-1"));

        // Empty tokens are ignored
        tokens.persist_token("", true).unwrap();
        assert_eq!(tokens.read_token().as_deref(), Some("jwt-1"));

        tokens.clear_token().unwrap();
        assert_eq!(tokens.read_token(), None);
    }

    #[test]
    fn test_corrupt_file_reads_signed_out() {
        let (_dir, store) = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), b"{not json").unwrap();

        assert!(store.get(AUTH_KEY).is_err());
        assert_eq!(TokenStore::new(store).read_token(), None);
    }

    #[test]
    fn test_concurrent_writers_keep_every_key() {
        let (_dir, store) = temp_store();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..10 {
                        store.set(&format!("k{}_{}", i, j), "v", None).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        for i in 0..8 {
            for j in 0..10 {
                assert!(store.get(&format!("k{}_{}", i, j)).unwrap().is_some());
            }
        }
    }

    #[tokio::test]
    async fn test_async_token_and_json_helpers() {
        let (_dir, store) = temp_store();
        let tokens = TokenStore::new(store.clone());
        assert_eq!(tokens.current_token().await, None);
        tokens.persist_token_async("jwt-2", true).await.unwrap();
        assert_eq!(tokens.current_token().await.as_deref(), Some("jwt-2"));

        store.set_json_async("n", &vec![1, 2]).await.unwrap();
        let loaded: Option<Vec<i32>> = store.get_json_async("n").await.unwrap();
        assert_eq!(loaded, Some(vec![1, 2]));
        store.remove_async("n").await.unwrap();
        tokens.clear_token_async().await.unwrap();
        assert_eq!(tokens.current_token().await, None);
        assert_eq!(store.get_json_async::<Vec<i32>>("n").await.unwrap(), None);
    }

    #[test]
    fn test_json_roundtrip_last_download() {
        let (_dir, store) = temp_store();
        let info = LastDownload {
            title: "Clip".into(),
            platform: Some(Platform::TikTok),
            original_url: Some("https://tiktok.com/@a/video/1".into()),
            download_url: "http://127.0.0.1:8005/api/v1/tiktok/proxy".into(),
            kind: MediaKind::Video,
            completed_at: 1_700_000_000_000,
        };
        store.set_json(LAST_DOWNLOAD_KEY, &info).unwrap();
        let loaded: LastDownload = store.get_json(LAST_DOWNLOAD_KEY).unwrap().unwrap();
        assert_eq!(loaded, info);
    }
}
