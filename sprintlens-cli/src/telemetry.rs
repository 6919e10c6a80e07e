//! Logging setup for the binary.

use crate::config::LogFormat;
use crate::error::CliError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "sprintlens=info,warn";

/// Install the global subscriber. Logs go to stderr so stdout carries only
/// the answer.
pub fn init_tracing(format: LogFormat) -> Result<(), CliError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| CliError::Telemetry(e.to_string()))?;

    tracing::debug!(format = ?format, "Logging initialised");
    Ok(())
}
