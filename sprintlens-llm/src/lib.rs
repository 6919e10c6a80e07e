//! SprintLens LLM
//!
//! Concrete embedding/completion providers and the plumbing around them:
//! a registry built from configuration, a token-usage tracker, and retry
//! with exponential backoff for transient provider failures.

pub mod providers;

pub use providers::{OpenAIClient, OpenAICompletionProvider, OpenAIEmbeddingProvider};

use sprintlens_core::{
    CompletionProvider, ConfigError, EmbeddingProvider, LensError, LensResult, LlmError,
    ProviderConfig, RetryConfig,
};
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Requests per minute allowed per provider client.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

// ============================================================================
// PROVIDER REGISTRY
// ============================================================================

/// Registry for LLM providers.
/// Providers must be explicitly registered or built from configuration.
///
/// # Example
/// ```ignore
/// let usage = Arc::new(UsageTracker::new());
/// let registry = ProviderRegistry::from_config(
///     &config.embedding_provider,
///     &config.completion_provider,
///     &api_key,
///     usage,
/// )?;
/// let answer = registry.completion()?.complete("hello", 100).await?;
/// ```
pub struct ProviderRegistry {
    embedding: Option<Arc<dyn EmbeddingProvider>>,
    completion: Option<Arc<dyn CompletionProvider>>,
}

impl ProviderRegistry {
    /// Create a new empty provider registry.
    pub fn new() -> Self {
        Self {
            embedding: None,
            completion: None,
        }
    }

    /// Build both providers from configuration.
    ///
    /// Only `provider_type = "openai"` is supported; anything else is
    /// `ConfigError::ProviderNotSupported`.
    pub fn from_config(
        embedding: &ProviderConfig,
        completion: &ProviderConfig,
        api_key: &str,
        usage: Arc<UsageTracker>,
    ) -> LensResult<Self> {
        if api_key.trim().is_empty() {
            return Err(LensError::Config(ConfigError::MissingRequired {
                field: "openai_api_key".to_string(),
            }));
        }

        let mut registry = Self::new();

        ensure_supported(embedding)?;
        let client = OpenAIClient::new(
            api_key,
            embedding.endpoint.as_deref(),
            embedding.timeout(),
            DEFAULT_REQUESTS_PER_MINUTE,
        )?;
        registry.register_embedding(Arc::new(
            OpenAIEmbeddingProvider::new(client, embedding.model.clone(), embedding.dimensions)
                .with_usage_tracker(usage.clone()),
        ));

        ensure_supported(completion)?;
        let client = OpenAIClient::new(
            api_key,
            completion.endpoint.as_deref(),
            completion.timeout(),
            DEFAULT_REQUESTS_PER_MINUTE,
        )?;
        registry.register_completion(Arc::new(
            OpenAICompletionProvider::new(client, completion.model.clone())
                .with_usage_tracker(usage),
        ));

        tracing::debug!(
            embedding_model = %embedding.model,
            completion_model = %completion.model,
            "Providers registered"
        );
        Ok(registry)
    }

    /// Register an embedding provider, replacing any previous one.
    pub fn register_embedding(&mut self, provider: Arc<dyn EmbeddingProvider>) {
        self.embedding = Some(provider);
    }

    /// Register a completion provider, replacing any previous one.
    pub fn register_completion(&mut self, provider: Arc<dyn CompletionProvider>) {
        self.completion = Some(provider);
    }

    /// Get the registered embedding provider.
    ///
    /// # Returns
    /// * `Err(LensError::Llm(LlmError::ProviderNotConfigured))` - If none registered
    pub fn embedding(&self) -> LensResult<Arc<dyn EmbeddingProvider>> {
        self.embedding
            .clone()
            .ok_or(LensError::Llm(LlmError::ProviderNotConfigured))
    }

    /// Get the registered completion provider.
    pub fn completion(&self) -> LensResult<Arc<dyn CompletionProvider>> {
        self.completion
            .clone()
            .ok_or(LensError::Llm(LlmError::ProviderNotConfigured))
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }

    pub fn has_completion(&self) -> bool {
        self.completion.is_some()
    }
}

fn ensure_supported(config: &ProviderConfig) -> LensResult<()> {
    if config.provider_type.eq_ignore_ascii_case("openai") {
        Ok(())
    } else {
        Err(LensError::Config(ConfigError::ProviderNotSupported {
            provider: config.provider_type.clone(),
        }))
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("embedding", &self.embedding.as_ref().map(|p| p.model_id().to_string()))
            .field("completion", &self.completion.as_ref().map(|p| p.model_id().to_string()))
            .finish()
    }
}

// ============================================================================
// USAGE TRACKER
// ============================================================================

/// Token usage reported by providers during one invocation.
/// Thread-safe via atomic operations.
#[derive(Default)]
pub struct UsageTracker {
    embedding_tokens: AtomicI64,
    prompt_tokens: AtomicI64,
    completion_tokens: AtomicI64,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_embedding(&self, tokens: i64) {
        self.embedding_tokens.fetch_add(tokens, Ordering::Relaxed);
    }

    pub fn record_completion(&self, prompt_tokens: i64, completion_tokens: i64) {
        self.prompt_tokens.fetch_add(prompt_tokens, Ordering::Relaxed);
        self.completion_tokens
            .fetch_add(completion_tokens, Ordering::Relaxed);
    }

    pub fn embedding_tokens(&self) -> i64 {
        self.embedding_tokens.load(Ordering::Relaxed)
    }

    pub fn prompt_tokens(&self) -> i64 {
        self.prompt_tokens.load(Ordering::Relaxed)
    }

    pub fn completion_tokens(&self) -> i64 {
        self.completion_tokens.load(Ordering::Relaxed)
    }

    pub fn total_tokens(&self) -> i64 {
        self.embedding_tokens() + self.prompt_tokens() + self.completion_tokens()
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.embedding_tokens.store(0, Ordering::Relaxed);
        self.prompt_tokens.store(0, Ordering::Relaxed);
        self.completion_tokens.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for UsageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageTracker")
            .field("embedding_tokens", &self.embedding_tokens())
            .field("prompt_tokens", &self.prompt_tokens())
            .field("completion_tokens", &self.completion_tokens())
            .finish()
    }
}

// ============================================================================
// RETRY
// ============================================================================

/// Run `operation`, retrying transient LLM failures with exponential backoff.
///
/// Only `RateLimited`, `ProviderUnavailable` and 5xx `RequestFailed` are
/// retried. A `Retry-After` longer than the computed backoff wins.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, label: &str, mut operation: F) -> LensResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LensResult<T>>,
{
    let max_retries = config.max_retries.max(0) as u32;
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(LensError::Llm(err)) if err.is_transient() && attempt < max_retries => {
                let mut delay = config.backoff_for(attempt);
                if let LlmError::RateLimited { retry_after_ms, .. } = &err {
                    if *retry_after_ms > 0 {
                        delay = delay.max(Duration::from_millis(*retry_after_ms as u64));
                    }
                }
                tracing::warn!(
                    operation = label,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient provider failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================


// ============================================================================
// PROPERTY TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Usage totals equal the sum of recorded values.
        #[test]
        fn prop_usage_tracker_sums(records in prop::collection::vec((0i64..10_000, 0i64..10_000), 0..50)) {
            let usage = UsageTracker::new();
            for (prompt, completion) in &records {
                usage.record_completion(*prompt, *completion);
            }
            let prompt_sum: i64 = records.iter().map(|r| r.0).sum();
            let completion_sum: i64 = records.iter().map(|r| r.1).sum();
            prop_assert_eq!(usage.prompt_tokens(), prompt_sum);
            prop_assert_eq!(usage.completion_tokens(), completion_sum);
        }

        /// Backoff never exceeds the configured cap.
        #[test]
        fn prop_backoff_is_capped(initial in 1u64..1_000, cap in 1u64..20_000, attempt in 0u32..20) {
            let config = RetryConfig {
                max_retries: 5,
                initial_backoff_ms: initial,
                max_backoff_ms: cap,
                backoff_multiplier: 2.0,
            };
            prop_assert!(config.backoff_for(attempt) <= Duration::from_millis(cap));
        }
    }
}
