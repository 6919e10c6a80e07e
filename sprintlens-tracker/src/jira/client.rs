//! Jira HTTP client

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sprintlens_core::{LensResult, SourceError};
use std::time::Duration;

const SOURCE: &str = "jira";

/// Connection settings for a Jira Cloud / Server instance.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JiraConfig {
    pub server_url: String,
    pub email: String,
    pub api_token: String,
    /// Custom field holding story points.
    #[serde(default = "default_story_points_field")]
    pub story_points_field: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Upper bound on issues returned by one search.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_story_points_field() -> String {
    "customfield_10002".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_max_results() -> usize {
    1000
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl JiraConfig {
    pub fn new(
        server_url: impl Into<String>,
        email: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            email: email.into(),
            api_token: api_token.into(),
            story_points_field: default_story_points_field(),
            page_size: default_page_size(),
            max_results: default_max_results(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl std::fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraConfig")
            .field("server_url", &self.server_url)
            .field("email", &self.email)
            .field("api_token", &"[REDACTED]")
            .field("story_points_field", &self.story_points_field)
            .field("page_size", &self.page_size)
            .field("max_results", &self.max_results)
            .finish()
    }
}

pub(crate) fn unavailable(reason: impl Into<String>) -> SourceError {
    SourceError::Unavailable {
        source_name: SOURCE.to_string(),
        reason: reason.into(),
    }
}

pub(crate) fn request_failed(status: StatusCode, message: impl Into<String>) -> SourceError {
    SourceError::RequestFailed {
        source_name: SOURCE.to_string(),
        status: status.as_u16(),
        message: message.into(),
    }
}

/// Error body Jira returns on 4xx.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiError {
    #[serde(default)]
    error_messages: Vec<String>,
}

/// Authenticated Jira REST client.
pub struct JiraClient {
    client: Client,
    base_url: String,
    email: String,
    api_token: String,
}

impl JiraClient {
    pub fn new(config: &JiraConfig) -> LensResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            email: config.email.clone(),
            api_token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` with `query` and decode the JSON body.
    ///
    /// Returns `Ok(None)` on 404 so callers can decide what "missing" means.
    pub async fn get<Res: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> LensResult<Option<Res>> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let started = std::time::Instant::now();

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.email, Some(&self.api_token))
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| unavailable(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        tracing::debug!(
            path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Jira request finished"
        );

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if status.is_success() {
            return response
                .json()
                .await
                .map(Some)
                .map_err(|e| unavailable(format!("Failed to parse response: {}", e)).into());
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = match serde_json::from_str::<ApiError>(&error_text) {
            Ok(api_error) if !api_error.error_messages.is_empty() => {
                api_error.error_messages.join("; ")
            }
            _ => error_text,
        };

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                unavailable(format!("authentication rejected ({}): {}", status, message))
            }
            _ => request_failed(status, message),
        }
        .into())
    }
}

impl std::fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraClient")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = JiraConfig::new("https://example.atlassian.net/", "me@example.com", "t");
        assert_eq!(config.story_points_field, "customfield_10002");
        assert_eq!(config.page_size, 100);
        assert_eq!(config.max_results, 1000);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = JiraConfig::new("https://example.atlassian.net", "me@example.com", "s3cret");
        assert!(!format!("{:?}", config).contains("s3cret"));
        let client = JiraClient::new(&config).unwrap();
        assert!(!format!("{:?}", client).contains("s3cret"));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = JiraConfig::new("https://example.atlassian.net/", "me@example.com", "t");
        let client = JiraClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "https://example.atlassian.net");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: JiraConfig = toml::from_str(
            r#"
            server_url = "https://example.atlassian.net"
            email = "me@example.com"
            api_token = "t"
            page_size = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.max_results, 1000);
    }
}
