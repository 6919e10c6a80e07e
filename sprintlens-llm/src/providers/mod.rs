//! LLM provider implementations
//!
//! Concrete implementations of the EmbeddingProvider and CompletionProvider
//! traits, plus the error constructors they share.

pub mod openai;

pub use openai::{OpenAIClient, OpenAICompletionProvider, OpenAIEmbeddingProvider};

use sprintlens_core::{LensError, LlmError};

pub(crate) fn unavailable(provider: &str, reason: impl Into<String>) -> LensError {
    LensError::Llm(LlmError::ProviderUnavailable {
        provider: provider.to_string(),
        reason: reason.into(),
    })
}

pub(crate) fn request_failed(provider: &str, status: u16, message: impl Into<String>) -> LensError {
    LensError::Llm(LlmError::RequestFailed {
        provider: provider.to_string(),
        status,
        message: message.into(),
    })
}

pub(crate) fn invalid_response(provider: &str, reason: impl Into<String>) -> LensError {
    LensError::Llm(LlmError::InvalidResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    })
}

pub(crate) fn rate_limited(provider: &str, retry_after_ms: i64) -> LensError {
    LensError::Llm(LlmError::RateLimited {
        provider: provider.to_string(),
        retry_after_ms,
    })
}
