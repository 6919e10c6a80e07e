//! SprintLens entry point.

use clap::Parser;
use sprintlens_cli::telemetry::init_tracing;
use sprintlens_cli::{render_text, Assistant, Cli, CliConfig, CliError};
use sprintlens_llm::{ProviderRegistry, UsageTracker};
use sprintlens_tracker::JiraIssueSource;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let request = cli.request()?;
    let config = CliConfig::load(cli.config.as_deref())?;
    init_tracing(config.log_format)?;

    let usage = Arc::new(UsageTracker::new());
    let providers = ProviderRegistry::from_config(
        &config.lens.embedding_provider,
        &config.lens.completion_provider,
        config.openai_api_key()?,
        usage.clone(),
    )?;
    let source = Arc::new(JiraIssueSource::new(&config.jira_config()?)?);
    let assistant =
        Assistant::new(source, &providers, config.lens.clone())?.with_usage_tracker(usage);

    let answer = tokio::select! {
        result = assistant.run(&request) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(feature = %request.feature, "Interrupted, cancelling request");
            return Err(CliError::Interrupted);
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print!("{}", render_text(&answer));
    }
    Ok(())
}
