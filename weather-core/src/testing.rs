//! Test doubles shared by the unit tests of this crate.

use async_trait::async_trait;
use serde_json::Value;
use std::{collections::VecDeque, sync::Mutex};

use crate::{
    error::{ApiError, StorageError},
    storage::{KeyValueStore, MemoryStore},
    transport::{HttpRequest, HttpResponse, HttpTransport},
};

/// Transport that replays queued outcomes in order and records every request.
/// Sending with an empty queue is a transport failure.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, String>>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, status: u16, body: Value) {
        self.respond_raw(status, &body.to_string());
    }

    pub fn respond_raw(&self, status: u16, body: &str) {
        self.replies.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            body: body.to_string(),
        }));
    }

    pub fn fail(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.seen.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.seen.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(ApiError::Transport(message.into())),
            None => Err(ApiError::Transport("no scripted reply".into())),
        }
    }
}

/// Storage whose every operation fails, as when the device store is unavailable.
#[derive(Debug, Default)]
pub struct UnavailableStore;

impl UnavailableStore {
    fn error() -> StorageError {
        std::io::Error::new(std::io::ErrorKind::PermissionDenied, "storage unavailable").into()
    }
}

#[async_trait]
impl KeyValueStore for UnavailableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(Self::error())
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(Self::error())
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(Self::error())
    }
}

/// Storage that can be read but rejects every write, as on a full or
/// read-only device.
#[derive(Debug, Default)]
pub struct ReadOnlyStore {
    inner: MemoryStore,
}

impl ReadOnlyStore {
    pub async fn seeded(entries: &[(&str, &str)]) -> Self {
        let inner = MemoryStore::new();
        for (key, value) in entries {
            inner.set(key, value).await.unwrap();
        }
        Self { inner }
    }

    fn error() -> StorageError {
        std::io::Error::new(std::io::ErrorKind::StorageFull, "storage is read-only").into()
    }
}

#[async_trait]
impl KeyValueStore for ReadOnlyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(Self::error())
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(Self::error())
    }
}
