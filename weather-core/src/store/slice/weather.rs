use serde::{Deserialize, Serialize};

use super::Slice;
use crate::model::{WeatherData, WeatherHistoryItem, WeatherSearchResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WeatherState {
    pub current: Option<WeatherData>,
    pub last_search: Option<WeatherSearchResult>,
    pub history: Vec<WeatherHistoryItem>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeatherAction {
    Requested,
    CurrentLoaded(WeatherData),
    SearchLoaded(WeatherSearchResult),
    HistoryLoaded(Vec<WeatherHistoryItem>),
    Failed(String),
    Cleared,
}

impl Slice for WeatherState {
    type Action = WeatherAction;

    fn reduce(&self, action: &WeatherAction) -> Self {
        let mut next = self.clone();
        match action {
            WeatherAction::Requested => {
                next.loading = true;
                next.error = None;
            }
            WeatherAction::CurrentLoaded(data) => {
                next.loading = false;
                next.current = Some(data.clone());
            }
            WeatherAction::SearchLoaded(result) => {
                next.loading = false;
                next.last_search = Some(result.clone());
            }
            WeatherAction::HistoryLoaded(items) => {
                next.loading = false;
                next.history = items.clone();
            }
            WeatherAction::Failed(message) => {
                next.loading = false;
                next.error = Some(message.clone());
            }
            WeatherAction::Cleared => next = WeatherState::default(),
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn oslo() -> WeatherData {
        WeatherData {
            location: "Oslo".into(),
            temperature: -2.0,
            description: "clear".into(),
            humidity: 60.0,
            wind_speed: 1.5,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn request_then_load_clears_loading_and_error() {
        let failed = WeatherState::default().reduce(&WeatherAction::Failed("offline".into()));
        let requested = failed.reduce(&WeatherAction::Requested);
        assert!(requested.loading);
        assert_eq!(requested.error, None);

        let loaded = requested.reduce(&WeatherAction::CurrentLoaded(oslo()));
        assert!(!loaded.loading);
        assert_eq!(loaded.current.as_ref().map(|d| d.location.as_str()), Some("Oslo"));
    }

    #[test]
    fn failure_keeps_previous_data() {
        let loaded = WeatherState::default().reduce(&WeatherAction::CurrentLoaded(oslo()));
        let failed = loaded.reduce(&WeatherAction::Failed("timeout".into()));

        assert!(failed.current.is_some());
        assert_eq!(failed.error.as_deref(), Some("timeout"));
    }
}
