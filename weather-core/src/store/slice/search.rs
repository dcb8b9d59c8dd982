use serde::{Deserialize, Serialize};

use super::Slice;

/// Most recent searches kept, newest first.
pub const MAX_HISTORY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SearchState {
    pub query: String,
    pub search_history: Vec<String>,
    pub is_searching: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchAction {
    QueryChanged(String),
    /// Starts a search and records the term in history.
    Submitted(String),
    Completed,
    Removed(String),
    HistoryCleared,
}

impl Slice for SearchState {
    type Action = SearchAction;

    fn reduce(&self, action: &SearchAction) -> Self {
        let mut next = self.clone();
        match action {
            SearchAction::QueryChanged(query) => next.query = query.clone(),
            SearchAction::Submitted(term) => {
                let term = term.trim();
                if term.is_empty() {
                    return next;
                }
                next.query = term.to_string();
                next.is_searching = true;
                next.search_history
                    .retain(|entry| !entry.eq_ignore_ascii_case(term));
                next.search_history.insert(0, term.to_string());
                next.search_history.truncate(MAX_HISTORY);
            }
            SearchAction::Completed => next.is_searching = false,
            SearchAction::Removed(term) => next
                .search_history
                .retain(|entry| !entry.eq_ignore_ascii_case(term)),
            SearchAction::HistoryCleared => next.search_history.clear(),
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit(state: &SearchState, term: &str) -> SearchState {
        state.reduce(&SearchAction::Submitted(term.into()))
    }

    #[test]
    fn history_is_newest_first_and_deduplicated() {
        let state = SearchState::default();
        let state = submit(&state, "Oslo");
        let state = submit(&state, "Paris");
        let state = submit(&state, "oslo");

        assert_eq!(state.search_history, vec!["oslo", "Paris"]);
        assert!(state.is_searching);
    }

    #[test]
    fn history_is_capped() {
        let mut state = SearchState::default();
        for i in 0..(MAX_HISTORY + 3) {
            state = submit(&state, &format!("city-{i}"));
        }

        assert_eq!(state.search_history.len(), MAX_HISTORY);
        assert_eq!(state.search_history[0], format!("city-{}", MAX_HISTORY + 2));
    }

    #[test]
    fn blank_submission_is_ignored() {
        let state = SearchState::default();
        assert_eq!(submit(&state, "   "), state);
    }

    #[test]
    fn remove_and_clear() {
        let state = submit(&submit(&SearchState::default(), "Oslo"), "Rome");

        let removed = state.reduce(&SearchAction::Removed("OSLO".into()));
        assert_eq!(removed.search_history, vec!["Rome"]);

        let cleared = removed.reduce(&SearchAction::HistoryCleared);
        assert!(cleared.search_history.is_empty());
        assert_eq!(state.search_history.len(), 2);
    }
}
