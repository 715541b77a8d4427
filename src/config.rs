//! Application configuration
//!
//! JSON config file stored in the platform data directory. A default config
//! is written on first run so users have something to edit.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{ApiError, ApiResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the generation API, including the /api prefix
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable holding the Telegram WebApp init data
    pub init_data_env: String,
    /// Persist the bearer token for future runs (stored-token fallback)
    pub remember_token: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Delay between status polls while a job is queued or running
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Render worker stage names with localized labels
    pub stage_labels_localized: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            init_data_env: "TELEGRAM_INIT_DATA".to_string(),
            remember_token: true,
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2500,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            stage_labels_localized: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            auth: AuthConfig::default(),
            jobs: JobsConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Load the config from disk, writing defaults when the file is missing
    pub fn load(path: &Path) -> ApiResult<Self> {
        if !path.exists() {
            let default_config = Self::default();
            default_config.save(path)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            ApiError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        if config.api.base_url.is_empty() {
            return Err(ApiError::Config("api.base_url is required".to_string()));
        }
        if config.api.timeout_seconds == 0 {
            return Err(ApiError::Config(
                "api.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if config.jobs.poll_interval_ms == 0 {
            return Err(ApiError::Config(
                "jobs.poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        Ok(config)
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: &Path) -> ApiResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ApiError::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(path, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_written_on_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!(config.jobs.poll_interval_ms, 2500);
        assert!(config.ui.stage_labels_localized);

        // Second load reads the file we just wrote
        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.api.timeout_seconds, config.api.timeout_seconds);
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.jobs.poll_interval_ms = 0;
        config.save(&path).unwrap();

        assert!(Config::load(&path).is_err());
    }
}
