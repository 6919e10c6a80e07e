//! Error types for SprintLens operations

use std::fmt;
use thiserror::Error;

/// Issue source (tracker) errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Issue source {source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    #[error("Request to {source_name} failed with status {status}: {message}")]
    RequestFailed {
        source_name: String,
        status: u16,
        message: String,
    },

    #[error("Issue not found: {key}")]
    IssueNotFound { key: String },

    #[error("Malformed issue {key}: {reason}")]
    MalformedIssue { key: String, reason: String },
}

/// Which embedding call of a retrieval failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbeddingStage {
    /// The batched corpus call
    Corpus,
    /// The single query call
    Query,
}

impl fmt::Display for EmbeddingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corpus => write!(f, "corpus"),
            Self::Query => write!(f, "query"),
        }
    }
}

/// LLM provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("No LLM provider configured")]
    ProviderNotConfigured,

    #[error("Provider {provider} unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: i64,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Embedding unavailable for {stage}: {reason}")]
    EmbeddingUnavailable {
        stage: EmbeddingStage,
        reason: String,
    },
}

impl LlmError {
    /// Whether a retry with backoff may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ProviderUnavailable { .. } | Self::RateLimited { .. } => true,
            Self::RequestFailed { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Malformed input at position {position}: missing {field}")]
    MalformedInput { position: usize, field: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Provider not supported: {provider}")]
    ProviderNotSupported { provider: String },
}

/// Vector operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VectorError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: i32, got: i32 },

    #[error("Invalid vector: {reason}")]
    InvalidVector { reason: String },
}

/// A tracker timestamp that could not be parsed.
///
/// Recorded per history entry by the change-log aggregator; the entry is
/// skipped and processing continues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unparsable timestamp {value:?} on {issue}: {reason}")]
pub struct TimestampParseError {
    pub issue: String,
    pub value: String,
    pub reason: String,
}

/// Master error type for all SprintLens errors.
#[derive(Debug, Clone, Error)]
pub enum LensError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Vector error: {0}")]
    Vector(#[from] VectorError),

    #[error("Timestamp error: {0}")]
    Timestamp(#[from] TimestampParseError),
}

/// Result type alias for SprintLens operations.
pub type LensResult<T> = Result<T, LensError>;

// =============================================================================
// TESTS
// =============================================================================
