//! Core library for the weather app client.
//!
//! This crate defines:
//! - The authentication session and its durable token mirror
//! - A generic request executor over a pluggable HTTP transport
//! - Typed calls for weather, profile and health endpoints
//! - An observable state store with per-slice whitelisted persistence
//! - Configuration handling
//!
//! It is used by `weather-app-cli`, but can also back other front ends.

pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod model;
pub mod session;
pub mod storage;
pub mod store;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{ApiError, StorageError};
pub use executor::{ApiCall, RequestExecutor};
pub use session::SessionManager;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{Action, AppState, PersistSettings, Store};
pub use transport::{HttpTransport, ReqwestTransport};
