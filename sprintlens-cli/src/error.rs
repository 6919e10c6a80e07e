//! Error types for the binary.

use crate::config::ConfigError;
use sprintlens_core::LensError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Lens(#[from] LensError),
    #[error("Failed to render answer: {0}")]
    Render(#[from] serde_json::Error),
    #[error("Failed to initialise logging: {0}")]
    Telemetry(String),
    #[error("Interrupted")]
    Interrupted,
}
