use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// Overrides `base_url` from the config file when set.
pub const BASE_URL_ENV: &str = "WEATHER_APP_BASE_URL";

const STORAGE_FILE: &str = "storage.json";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// base_url = "https://weather.example.com"
/// log_filter = "weather_app_core=debug"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Root of the remote API, without a trailing path.
    pub base_url: Option<String>,

    /// Directory for the durable key-value file; platform data dir if absent.
    pub storage_dir: Option<PathBuf>,

    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weather-app", "weather-app")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Applies environment overrides on top of what was loaded from disk.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            self.apply_base_url_override(Some(url));
        }
        self
    }

    fn apply_base_url_override(&mut self, url: Option<String>) {
        if let Some(url) = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
            self.base_url = Some(url);
        }
    }

    /// The API root, or an error with a hint on how to set it.
    pub fn base_url(&self) -> Result<&str> {
        self.base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No API base URL configured.\n\
                     Hint: run `weather-app configure` or set {BASE_URL_ENV}."
                )
            })
    }

    pub fn set_base_url(&mut self, url: &str) {
        let url = url.trim().trim_end_matches('/');
        self.base_url = Some(url.to_string());
    }

    /// File backing the durable key-value store.
    pub fn storage_file(&self) -> Result<PathBuf> {
        let dir = match &self.storage_dir {
            Some(dir) => dir.clone(),
            None => Self::project_dirs()?.data_dir().to_path_buf(),
        };
        Ok(dir.join(STORAGE_FILE))
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or("warn")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.base_url().unwrap_err();

        assert!(err.to_string().contains("No API base URL configured"));
        assert!(err.to_string().contains("Hint: run `weather-app configure`"));
    }

    #[test]
    fn set_base_url_strips_trailing_slash() {
        let mut cfg = Config::default();
        cfg.set_base_url(" https://api.example.com/ ");

        assert_eq!(cfg.base_url().unwrap(), "https://api.example.com");
    }

    #[test]
    fn override_replaces_file_value_but_ignores_blank() {
        let mut cfg = Config::default();
        cfg.set_base_url("https://file.example.com");

        cfg.apply_base_url_override(Some("   ".into()));
        assert_eq!(cfg.base_url().unwrap(), "https://file.example.com");

        cfg.apply_base_url_override(Some("https://env.example.com".into()));
        assert_eq!(cfg.base_url().unwrap(), "https://env.example.com");
    }

    #[test]
    fn storage_dir_override_is_used() {
        let cfg = Config {
            storage_dir: Some(PathBuf::from("/tmp/weather-app-test")),
            ..Default::default()
        };

        assert_eq!(
            cfg.storage_file().unwrap(),
            PathBuf::from("/tmp/weather-app-test/storage.json")
        );
    }

    #[test]
    fn parses_toml_and_defaults_log_filter() {
        let cfg = Config::from_toml("base_url = \"http://localhost:3000\"\n").unwrap();

        assert_eq!(cfg.base_url().unwrap(), "http://localhost:3000");
        assert_eq!(cfg.log_filter(), "warn");

        let cfg = Config::from_toml("log_filter = \"debug\"\n").unwrap();
        assert_eq!(cfg.log_filter(), "debug");
    }

    #[test]
    fn serializes_back_to_toml() {
        let mut cfg = Config::default();
        cfg.set_base_url("http://localhost:3000");

        let text = toml::to_string_pretty(&cfg).unwrap();
        let back = Config::from_toml(&text).unwrap();
        assert_eq!(back.base_url.as_deref(), Some("http://localhost:3000"));
    }
}
