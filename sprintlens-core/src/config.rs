//! Configuration types

use crate::{ConfigError, FieldFilter, LensError, LensResult, DEFAULT_SIMILARITY_EPSILON};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retrieval settings for the Q&A pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Number of corpus entries passed to the model.
    pub top_k: usize,
    /// Added to the cosine denominator; must be positive.
    pub epsilon: f64,
    /// Issue the corpus and query embedding calls together.
    pub concurrent_embedding: bool,
    /// Caller-side truncation of each entry before retrieval.
    pub max_entry_tokens: Option<i32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            epsilon: DEFAULT_SIMILARITY_EPSILON,
            concurrent_embedding: true,
            max_entry_tokens: None,
        }
    }
}

/// Change-log aggregation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChangeLogConfig {
    pub lookback_hours: u32,
    pub fields: FieldFilter,
    /// Fetch each issue's history again instead of using the sprint fetch.
    pub refetch_history: bool,
    /// Concurrent history fetches in the per-issue path.
    pub history_concurrency: usize,
}

impl Default for ChangeLogConfig {
    fn default() -> Self {
        Self {
            lookback_hours: 24,
            fields: FieldFilter::All,
            refetch_history: true,
            history_concurrency: 4,
        }
    }
}

impl ChangeLogConfig {
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.lookback_hours))
    }
}

/// Completion token limits per call site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompletionLimits {
    pub qa_max_tokens: u32,
    pub feature_max_tokens: u32,
    pub triage_max_tokens: u32,
}

impl Default for CompletionLimits {
    fn default() -> Self {
        Self {
            qa_max_tokens: 500,
            feature_max_tokens: 600,
            triage_max_tokens: 500,
        }
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub provider_type: String,
    pub endpoint: Option<String>,
    pub model: String,
    pub dimensions: Option<i32>,
    /// Request timeout in milliseconds.
    #[serde(default = "default_provider_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_provider_timeout_ms() -> u64 {
    30_000
}

impl ProviderConfig {
    pub fn openai_embedding() -> Self {
        Self {
            provider_type: "openai".to_string(),
            endpoint: None,
            model: "text-embedding-ada-002".to_string(),
            dimensions: None,
            timeout_ms: default_provider_timeout_ms(),
        }
    }

    pub fn openai_completion() -> Self {
        Self {
            provider_type: "openai".to_string(),
            endpoint: None,
            model: "gpt-4o-mini".to_string(),
            dimensions: None,
            timeout_ms: default_provider_timeout_ms(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Retry configuration for LLM operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Zero disables retries.
    pub max_retries: i32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 250,
            max_backoff_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt` (0-based), capped at `max_backoff_ms`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = f64::from(self.backoff_multiplier).powi(attempt as i32);
        let ms = (self.initial_backoff_ms as f64 * factor).min(self.max_backoff_ms as f64);
        Duration::from_millis(ms as u64)
    }
}

/// Pipeline configuration passed into every component constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LensConfig {
    pub retrieval: RetrievalConfig,
    pub changelog: ChangeLogConfig,
    pub completion: CompletionLimits,
    pub embedding_provider: ProviderConfig,
    pub completion_provider: ProviderConfig,
    pub llm_retry_config: RetryConfig,
    /// Answer Q&A without context when embeddings are unavailable.
    pub degrade_without_retrieval: bool,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            retrieval: RetrievalConfig::default(),
            changelog: ChangeLogConfig::default(),
            completion: CompletionLimits::default(),
            embedding_provider: ProviderConfig::openai_embedding(),
            completion_provider: ProviderConfig::openai_completion(),
            llm_retry_config: RetryConfig::default(),
            degrade_without_retrieval: false,
        }
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> LensError {
    LensError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    })
}

impl LensConfig {
    /// Validate the configuration.
    /// Returns Ok(()) if valid, Err(LensError::Config) if invalid.
    pub fn validate(&self) -> LensResult<()> {
        if !(self.retrieval.epsilon > 0.0 && self.retrieval.epsilon.is_finite()) {
            return Err(invalid(
                "retrieval.epsilon",
                self.retrieval.epsilon,
                "epsilon must be a positive finite number",
            ));
        }

        if let Some(max) = self.retrieval.max_entry_tokens {
            if max <= 0 {
                return Err(invalid(
                    "retrieval.max_entry_tokens",
                    max,
                    "max_entry_tokens must be greater than 0",
                ));
            }
        }

        if self.changelog.lookback_hours == 0 {
            return Err(invalid(
                "changelog.lookback_hours",
                self.changelog.lookback_hours,
                "lookback_hours must be greater than 0",
            ));
        }

        if self.changelog.history_concurrency == 0 {
            return Err(invalid(
                "changelog.history_concurrency",
                self.changelog.history_concurrency,
                "history_concurrency must be greater than 0",
            ));
        }

        for (field, value) in [
            ("completion.qa_max_tokens", self.completion.qa_max_tokens),
            ("completion.feature_max_tokens", self.completion.feature_max_tokens),
            ("completion.triage_max_tokens", self.completion.triage_max_tokens),
        ] {
            if value == 0 {
                return Err(invalid(field, value, "token limit must be greater than 0"));
            }
        }

        for (field, provider) in [
            ("embedding_provider", &self.embedding_provider),
            ("completion_provider", &self.completion_provider),
        ] {
            if provider.model.trim().is_empty() {
                return Err(LensError::Config(ConfigError::MissingRequired {
                    field: format!("{}.model", field),
                }));
            }
            if provider.timeout_ms == 0 {
                return Err(invalid(
                    &format!("{}.timeout_ms", field),
                    provider.timeout_ms,
                    "timeout_ms must be greater than 0",
                ));
            }
        }

        if let Some(dimensions) = self.embedding_provider.dimensions {
            if dimensions <= 0 {
                return Err(invalid(
                    "embedding_provider.dimensions",
                    dimensions,
                    "dimensions must be greater than 0",
                ));
            }
        }

        if self.llm_retry_config.max_retries < 0 {
            return Err(invalid(
                "llm_retry_config.max_retries",
                self.llm_retry_config.max_retries,
                "max_retries must be non-negative",
            ));
        }

        if self.llm_retry_config.backoff_multiplier <= 0.0 {
            return Err(invalid(
                "llm_retry_config.backoff_multiplier",
                self.llm_retry_config.backoff_multiplier,
                "backoff_multiplier must be positive",
            ));
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_documented_values() {
        let config = LensConfig::default();
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.epsilon, 1e-10);
        assert!(config.retrieval.concurrent_embedding);
        assert_eq!(config.changelog.lookback_hours, 24);
        assert_eq!(config.changelog.fields, FieldFilter::All);
        assert_eq!(config.completion.qa_max_tokens, 500);
        assert_eq!(config.completion.feature_max_tokens, 600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_epsilon() {
        let mut config = LensConfig::default();
        config.retrieval.epsilon = 0.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            LensError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "retrieval.epsilon"
        ));

        config.retrieval.epsilon = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_lookback() {
        let mut config = LensConfig::default();
        config.changelog.lookback_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_model() {
        let mut config = LensConfig::default();
        config.completion_provider.model = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, LensError::Config(ConfigError::MissingRequired { .. })));
    }

    #[test]
    fn test_validate_rejects_negative_retries() {
        let mut config = LensConfig::default();
        config.llm_retry_config.max_retries = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let retry = RetryConfig {
            max_retries: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 1_000,
            backoff_multiplier: 2.0,
        };
        assert_eq!(retry.backoff_for(0), Duration::from_millis(100));
        assert_eq!(retry.backoff_for(1), Duration::from_millis(200));
        assert_eq!(retry.backoff_for(2), Duration::from_millis(400));
        assert_eq!(retry.backoff_for(10), Duration::from_millis(1_000));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: LensConfig = toml::from_str(
            r#"
            [retrieval]
            top_k = 5

            [changelog]
            fields = ["status", "comment"]
            "#,
        )
        .unwrap();
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.epsilon, 1e-10);
        assert_eq!(config.changelog.fields, FieldFilter::only(["status", "comment"]));
        assert_eq!(config.changelog.lookback_hours, 24);
    }
}
