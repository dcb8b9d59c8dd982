//! Durable key-value storage.
//!
//! The session and the state store only ever see [`KeyValueStore`]; what sits
//! behind it (a JSON file on disk, a map in memory) is an implementation detail.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    fmt::Debug,
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::StorageError;

pub const AUTH_TOKEN_KEY: &str = "weather_app_auth_token";
pub const REFRESH_TOKEN_KEY: &str = "weather_app_refresh_token";
pub const USER_DATA_KEY: &str = "weather_app_user_data";

/// Opaque string-to-string store with no transactional guarantees.
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    async fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        for key in keys {
            self.remove(key).await?;
        }
        Ok(())
    }
}

/// In-process store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object file.
///
/// The file is read once on first access and rewritten in full on every
/// mutation through a sibling `.tmp` file and a rename. Unparseable contents
/// are treated as an empty store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    cache: Mutex<Option<HashMap<String, String>>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A file that does not parse reads as empty, so the next write
    /// replaces it. I/O errors other than a missing file still fail.
    async fn read_file(&self) -> Result<HashMap<String, String>, StorageError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(err) => return Err(err.into()),
        };

        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }

        match serde_json::from_str(&contents) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "storage file is corrupt; starting from an empty store"
                );
                Ok(HashMap::new())
            }
        }
    }

    async fn write_file(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Applies `f` to the loaded map and writes it back if `f` reports a change.
    async fn mutate<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut HashMap<String, String>) -> bool + Send,
    {
        let mut guard = self.cache.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_file().await?);
        }

        let mut next = guard.clone().unwrap_or_default();
        if f(&mut next) {
            self.write_file(&next).await?;
            *guard = Some(next);
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut guard = self.cache.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_file().await?);
        }
        Ok(guard.as_ref().and_then(|entries| entries.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.mutate(|entries| entries.remove(key).is_some()).await
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.mutate(|entries| {
            let mut changed = false;
            for key in keys {
                changed |= entries.remove(*key).is_some();
            }
            changed
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn remove_many_ignores_missing_keys() {
        let store = MemoryStore::new();
        store.set("a", "1").await.unwrap();
        store.set("c", "3").await.unwrap();

        store.remove_many(&["a", "b"]).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let first = FileStore::new(&path);
        first.set(AUTH_TOKEN_KEY, "T1").await.unwrap();
        first.set(USER_DATA_KEY, "{\"id\":\"1\"}").await.unwrap();
        first.remove(USER_DATA_KEY).await.unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get(AUTH_TOKEN_KEY).await.unwrap().as_deref(),
            Some("T1")
        );
        assert_eq!(reopened.get(USER_DATA_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"));

        assert_eq!(store.get("anything").await.unwrap(), None);
        store.remove_many(&["a", "b"]).await.unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{\"weather_app_auth_token\": \"T1").unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.get(AUTH_TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_file_is_replaced_by_next_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{\"weather_app_auth_token\": \"T1").unwrap();

        let store = FileStore::new(&path);
        store
            .remove_many(&[AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY])
            .await
            .unwrap();
        store.set("persist:theme", "{\"mode\":\"dark\"}").await.unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get("persist:theme").await.unwrap().as_deref(),
            Some("{\"mode\":\"dark\"}")
        );
        assert_eq!(reopened.get(AUTH_TOKEN_KEY).await.unwrap(), None);
    }
}
