//! SprintLens CLI
//!
//! Wires the Jira source, OpenAI providers and the retrieval pipeline into a
//! single [`assistant::Assistant`] invocation per command.

pub mod assistant;
pub mod cli;
pub mod config;
pub mod error;
pub mod telemetry;

pub use assistant::{Assistant, FeatureAnswer, FeatureRequest};
pub use cli::{render_text, Cli};
pub use config::{CliConfig, ConfigError, LogFormat};
pub use error::CliError;
