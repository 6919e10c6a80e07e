//! Configuration loading for the SprintLens binary.
//!
//! The file supplies pipeline settings; credentials may come from the file or
//! the environment, with the environment winning.

use serde::Deserialize;
use sprintlens_core::{LensConfig, LensError};
use sprintlens_tracker::JiraConfig;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "SPRINTLENS_CONFIG";
pub const JIRA_SERVER_URL_ENV: &str = "JIRA_SERVER_URL";
pub const JIRA_EMAIL_ENV: &str = "JIRA_EMAIL";
pub const JIRA_API_TOKEN_ENV: &str = "JIRA_API_TOKEN";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub jira: JiraSection,
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub lens: LensConfig,
}

/// Jira connection settings; unset optionals fall back to adapter defaults.
#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JiraSection {
    pub server_url: Option<String>,
    pub email: Option<String>,
    pub api_token: Option<String>,
    pub story_points_field: Option<String>,
    pub page_size: Option<usize>,
    pub max_results: Option<usize>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or SPRINTLENS_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error(transparent)]
    Pipeline(#[from] LensError),
}

impl CliConfig {
    /// Read, overlay the process environment and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let mut config = Self::from_path(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: CliConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Overlay credentials and endpoints from `lookup`; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get(JIRA_SERVER_URL_ENV) {
            self.jira.server_url = Some(v);
        }
        if let Some(v) = get(JIRA_EMAIL_ENV) {
            self.jira.email = Some(v);
        }
        if let Some(v) = get(JIRA_API_TOKEN_ENV) {
            self.jira.api_token = Some(v);
        }
        if let Some(v) = get(OPENAI_API_KEY_ENV) {
            self.openai_api_key = Some(v);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let server_url = required(&self.jira.server_url, "jira.server_url")?;
        if !(server_url.starts_with("http://") || server_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "jira.server_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        required(&self.jira.email, "jira.email")?;
        required(&self.jira.api_token, "jira.api_token")?;
        required(&self.openai_api_key, "openai_api_key")?;
        if self.jira.page_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "jira.page_size",
                reason: "must be > 0".to_string(),
            });
        }
        if self.jira.timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "jira.timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        self.lens.validate()?;
        Ok(())
    }

    /// Jira adapter settings. Call after [`CliConfig::validate`].
    pub fn jira_config(&self) -> Result<JiraConfig, ConfigError> {
        let mut config = JiraConfig::new(
            required(&self.jira.server_url, "jira.server_url")?,
            required(&self.jira.email, "jira.email")?,
            required(&self.jira.api_token, "jira.api_token")?,
        );
        if let Some(field) = &self.jira.story_points_field {
            config.story_points_field = field.clone();
        }
        if let Some(page_size) = self.jira.page_size {
            config.page_size = page_size;
        }
        if let Some(max_results) = self.jira.max_results {
            config.max_results = max_results;
        }
        if let Some(timeout_ms) = self.jira.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        Ok(config)
    }

    pub fn openai_api_key(&self) -> Result<&str, ConfigError> {
        required(&self.openai_api_key, "openai_api_key")
    }
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::InvalidValue {
            field,
            reason: "must not be empty".to_string(),
        }),
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV).ok().map(PathBuf::from)
}

impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field("jira", &self.jira)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("log_format", &self.log_format)
            .field("lens", &self.lens)
            .finish()
    }
}

impl std::fmt::Debug for JiraSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraSection")
            .field("server_url", &self.server_url)
            .field("email", &self.email)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("story_points_field", &self.story_points_field)
            .field("page_size", &self.page_size)
            .field("max_results", &self.max_results)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}
