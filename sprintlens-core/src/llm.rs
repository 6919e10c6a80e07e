//! LLM provider traits.
//!
//! Provider-agnostic interfaces for embeddings and completions. Concrete
//! providers live in sprintlens-llm; test doubles in sprintlens-test-utils.

use crate::{EmbeddingVector, LensResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// EMBEDDING PROVIDER
// ============================================================================

/// Trait for embedding providers.
/// Implementations must be thread-safe (Send + Sync).
///
/// # Example
/// ```ignore
/// struct OpenAIEmbedding { /* ... */ }
///
/// #[async_trait]
/// impl EmbeddingProvider for OpenAIEmbedding {
///     async fn embed(&self, text: &str) -> LensResult<EmbeddingVector> {
///         // Call OpenAI API
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    ///
    /// # Returns
    /// * `Ok(EmbeddingVector)` - The embedding vector
    /// * `Err(LensError::Llm)` - If embedding fails
    async fn embed(&self, text: &str) -> LensResult<EmbeddingVector>;

    /// Generate embeddings for multiple texts in one request.
    ///
    /// # Returns
    /// * `Ok(Vec<EmbeddingVector>)` - One vector per input, same order
    /// * `Err(LensError::Llm)` - If embedding fails
    async fn embed_batch(&self, texts: &[&str]) -> LensResult<Vec<EmbeddingVector>>;

    /// Number of dimensions this provider produces, if known up front.
    fn dimensions(&self) -> Option<i32>;

    /// Model identifier (e.g., "text-embedding-ada-002").
    fn model_id(&self) -> &str;
}

// ============================================================================
// COMPLETION PROVIDER
// ============================================================================

/// Token usage reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
}

/// Generated text plus what it cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub model_id: String,
    pub usage: Option<TokenUsage>,
}

/// Trait for completion providers.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate text for `prompt`, bounded by `max_tokens`.
    ///
    /// # Returns
    /// * `Ok(Completion)` - The generated text
    /// * `Err(LensError::Llm)` - `ProviderUnavailable`, `RequestFailed` or `RateLimited`
    async fn complete(&self, prompt: &str, max_tokens: u32) -> LensResult<Completion>;

    /// Model identifier (e.g., "gpt-4o-mini").
    fn model_id(&self) -> &str;
}
