//! SprintLens Core - Entity Types
//!
//! Data structures, errors, configuration and the provider/source traits that
//! every other SprintLens crate depends on. No I/O happens here.

use chrono::{DateTime, Utc};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

pub mod config;
pub mod embedding;
pub mod entities;
pub mod enums;
pub mod error;
pub mod llm;
pub mod source;
pub mod timestamp;

pub use config::{
    ChangeLogConfig, CompletionLimits, LensConfig, ProviderConfig, RetrievalConfig, RetryConfig,
};
pub use embedding::{EmbeddingVector, DEFAULT_SIMILARITY_EPSILON};
pub use entities::{
    BacklogSummary, CorpusEntry, IssueSummary, RawChangeItem, RawHistory, RawIssue, UpdateRecord,
    UNASSIGNED, UNKNOWN_AUTHOR,
};
pub use enums::{Feature, FeatureParseError, FieldFilter, Role, RoleParseError};
pub use error::{
    ConfigError, EmbeddingStage, LensError, LensResult, LlmError, SourceError,
    TimestampParseError, ValidationError, VectorError,
};
pub use llm::{Completion, CompletionProvider, EmbeddingProvider, TokenUsage};
pub use source::{EmptyReason, FetchOutcome, IssueSource};
pub use timestamp::parse_tracker_timestamp;
