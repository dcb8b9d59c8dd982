//! Per-slice durable mirroring restricted to a field whitelist.

use serde::{Serialize, de::Error as _};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::slice::Slice;
use crate::{error::StorageError, storage::KeyValueStore};

/// Which fields of one slice survive a restart, and under which namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistConfig {
    pub key: &'static str,
    pub whitelist: &'static [&'static str],
}

impl PersistConfig {
    pub const fn new(key: &'static str, whitelist: &'static [&'static str]) -> Self {
        Self { key, whitelist }
    }

    pub fn storage_key(&self) -> String {
        format!("persist:{}", self.key)
    }

    /// JSON object holding only the whitelisted fields of `slice`.
    pub fn snapshot<S: Serialize>(&self, slice: &S) -> Result<String, StorageError> {
        let Value::Object(fields) = serde_json::to_value(slice)? else {
            return Err(not_an_object(self.key).into());
        };

        let kept: Map<String, Value> = fields
            .into_iter()
            .filter(|(name, _)| self.whitelist.contains(&name.as_str()))
            .collect();

        Ok(serde_json::to_string(&kept)?)
    }

    /// Rebuilds a slice from a snapshot: whitelisted fields come from `raw`,
    /// everything else from `S::default()`. Fields in `raw` that are not
    /// whitelisted are ignored.
    pub fn restore<S: Slice>(&self, raw: &str) -> Result<S, StorageError> {
        let Value::Object(stored) = serde_json::from_str::<Value>(raw)? else {
            return Err(not_an_object(self.key).into());
        };
        let Value::Object(mut merged) = serde_json::to_value(S::default())? else {
            return Err(not_an_object(self.key).into());
        };

        for name in self.whitelist {
            if let Some(value) = stored.get(*name) {
                merged.insert((*name).to_string(), value.clone());
            }
        }

        Ok(serde_json::from_value(Value::Object(merged))?)
    }

    pub async fn write<S: Slice>(
        &self,
        storage: &dyn KeyValueStore,
        slice: &S,
    ) -> Result<(), StorageError> {
        let snapshot = self.snapshot(slice)?;
        storage.set(&self.storage_key(), &snapshot).await
    }

    /// Best effort: unavailable storage or a malformed snapshot yields the
    /// slice's default state.
    pub async fn rehydrate<S: Slice>(&self, storage: &dyn KeyValueStore) -> S {
        let raw = match storage.get(&self.storage_key()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return S::default(),
            Err(err) => {
                warn!(slice = self.key, error = %err, "storage unavailable; using default state");
                return S::default();
            }
        };

        match self.restore(&raw) {
            Ok(slice) => {
                debug!(slice = self.key, "rehydrated");
                slice
            }
            Err(err) => {
                warn!(slice = self.key, error = %err, "discarding malformed snapshot");
                S::default()
            }
        }
    }
}

fn not_an_object(key: &str) -> serde_json::Error {
    serde_json::Error::custom(format!("snapshot for '{key}' is not a JSON object"))
}
