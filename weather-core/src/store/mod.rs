//! Observable application state built from independent slices.
//!
//! The [`Store`] does no business logic. It routes each [`Action`] to the
//! one slice it is scoped to, publishes the new [`AppState`] to subscribers
//! and, for persisted slices, writes the whitelisted fields back to storage.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

use crate::{error::StorageError, storage::KeyValueStore};

pub mod persist;
pub mod slice;

pub use persist::PersistConfig;
pub use slice::{
    AuthAction, AuthState, SearchAction, SearchState, Slice, ThemeAction, ThemeState,
    WeatherAction, WeatherState,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppState {
    pub theme: ThemeState,
    pub weather: WeatherState,
    pub search: SearchState,
    pub auth: AuthState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Theme(ThemeAction),
    Weather(WeatherAction),
    Search(SearchAction),
    Auth(AuthAction),
}

impl From<ThemeAction> for Action {
    fn from(action: ThemeAction) -> Self {
        Action::Theme(action)
    }
}

impl From<WeatherAction> for Action {
    fn from(action: WeatherAction) -> Self {
        Action::Weather(action)
    }
}

impl From<SearchAction> for Action {
    fn from(action: SearchAction) -> Self {
        Action::Search(action)
    }
}

impl From<AuthAction> for Action {
    fn from(action: AuthAction) -> Self {
        Action::Auth(action)
    }
}

/// Persistence per slice; `None` keeps a slice in memory only.
/// Fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistSettings {
    pub theme: Option<PersistConfig>,
    pub weather: Option<PersistConfig>,
    pub search: Option<PersistConfig>,
    pub auth: Option<PersistConfig>,
}

impl PersistSettings {
    pub const fn none() -> Self {
        Self {
            theme: None,
            weather: None,
            search: None,
            auth: None,
        }
    }

    fn configured(&self) -> impl Iterator<Item = PersistConfig> {
        [self.theme, self.weather, self.search, self.auth]
            .into_iter()
            .flatten()
    }
}

impl Default for PersistSettings {
    fn default() -> Self {
        Self {
            theme: Some(PersistConfig::new("theme", &["mode"])),
            weather: None,
            search: Some(PersistConfig::new("search", &["search_history"])),
            auth: Some(PersistConfig::new(
                "auth",
                &["user", "token", "refresh_token", "is_authenticated"],
            )),
        }
    }
}

#[derive(Debug)]
pub struct Store {
    state: AppState,
    settings: PersistSettings,
    storage: Arc<dyn KeyValueStore>,
    tx: watch::Sender<AppState>,
}

impl Store {
    /// Rehydrates every persisted slice concurrently. A slice whose snapshot
    /// cannot be read falls back to its default without affecting the others.
    pub async fn rehydrate(storage: Arc<dyn KeyValueStore>, settings: PersistSettings) -> Self {
        let backend = storage.as_ref();
        let (theme, weather, search, auth) = tokio::join!(
            load_slice::<ThemeState>(settings.theme, backend),
            load_slice::<WeatherState>(settings.weather, backend),
            load_slice::<SearchState>(settings.search, backend),
            load_slice::<AuthState>(settings.auth, backend),
        );

        let state = AppState {
            theme,
            weather,
            search,
            auth,
        };
        let (tx, _) = watch::channel(state.clone());

        Self {
            state,
            settings,
            storage,
            tx,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn settings(&self) -> &PersistSettings {
        &self.settings
    }

    /// Receives the full state after every dispatch that changed something.
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }

    /// Applies `action` to its slice. Returns whether the state changed.
    /// Persistence failures are logged and do not undo the update.
    pub async fn dispatch(&mut self, action: impl Into<Action>) -> bool {
        let storage = self.storage.as_ref();
        let changed = match action.into() {
            Action::Theme(action) => {
                apply(&mut self.state.theme, &action, self.settings.theme, storage).await
            }
            Action::Weather(action) => {
                apply(&mut self.state.weather, &action, self.settings.weather, storage).await
            }
            Action::Search(action) => {
                apply(&mut self.state.search, &action, self.settings.search, storage).await
            }
            Action::Auth(action) => {
                apply(&mut self.state.auth, &action, self.settings.auth, storage).await
            }
        };

        if changed {
            self.tx.send_replace(self.state.clone());
        }
        changed
    }

    /// Removes every persisted namespace. Live state is left untouched.
    pub async fn purge(&self) -> Result<(), StorageError> {
        let keys: Vec<String> = self.settings.configured().map(|c| c.storage_key()).collect();
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.storage.remove_many(&keys).await
    }
}

async fn load_slice<S: Slice>(config: Option<PersistConfig>, storage: &dyn KeyValueStore) -> S {
    match config {
        Some(config) => config.rehydrate(storage).await,
        None => S::default(),
    }
}

async fn apply<S: Slice>(
    slice: &mut S,
    action: &S::Action,
    config: Option<PersistConfig>,
    storage: &dyn KeyValueStore,
) -> bool {
    let next = slice.reduce(action);
    if next == *slice {
        return false;
    }
    *slice = next;

    if let Some(config) = config {
        if let Err(err) = config.write(storage, slice).await {
            warn!(slice = config.key, error = %err, "failed to persist slice");
        }
    }
    true
}
