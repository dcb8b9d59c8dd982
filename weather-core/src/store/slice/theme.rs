use serde::{Deserialize, Serialize};

use super::Slice;
use crate::model::ThemePreference;

/// Concrete palette in use once `System` has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ThemeState {
    pub mode: ThemePreference,
    /// Reported by the platform at runtime; never persisted.
    pub system_scheme: ColorScheme,
}

impl ThemeState {
    pub fn effective_scheme(&self) -> ColorScheme {
        match self.mode {
            ThemePreference::Light => ColorScheme::Light,
            ThemePreference::Dark => ColorScheme::Dark,
            ThemePreference::System => self.system_scheme,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeAction {
    SetMode(ThemePreference),
    /// Flips between explicit light and dark based on what is shown now.
    Toggle,
    SystemSchemeChanged(ColorScheme),
}

impl Slice for ThemeState {
    type Action = ThemeAction;

    fn reduce(&self, action: &ThemeAction) -> Self {
        let mut next = self.clone();
        match action {
            ThemeAction::SetMode(mode) => next.mode = *mode,
            ThemeAction::Toggle => {
                next.mode = match self.effective_scheme() {
                    ColorScheme::Light => ThemePreference::Dark,
                    ColorScheme::Dark => ThemePreference::Light,
                }
            }
            ThemeAction::SystemSchemeChanged(scheme) => next.system_scheme = *scheme,
        }
        next
    }
}
