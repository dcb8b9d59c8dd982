//! Independently reducible partitions of application state.

use serde::{Serialize, de::DeserializeOwned};

pub mod auth;
pub mod search;
pub mod theme;
pub mod weather;

pub use auth::{AuthAction, AuthState};
pub use search::{SearchAction, SearchState};
pub use theme::{ColorScheme, ThemeAction, ThemeState};
pub use weather::{WeatherAction, WeatherState};

/// A slice owns its state exclusively and only changes through its own actions.
///
/// `reduce` is pure: it reads `self` and the action and returns the next
/// state. It never touches other slices. Returning a value equal to `self`
/// means "no change" and skips persistence.
pub trait Slice: Clone + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync {
    type Action: Send + Sync;

    fn reduce(&self, action: &Self::Action) -> Self;
}
