//! Command-line arguments and answer rendering.

use crate::assistant::{FeatureAnswer, FeatureRequest};
use clap::Parser;
use sprintlens_core::{Feature, LensError, LensResult, Role, ValidationError};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "sprintlens", version, about = "Retrieval-augmented Jira sprint assistant")]
pub struct Cli {
    /// Config file (falls back to SPRINTLENS_CONFIG).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Feature to run, e.g. `qa`, `sprint-summary`, `retro-sentiment`.
    pub feature: Feature,

    /// manager, scrum-master, developer or client.
    #[arg(long, default_value = "scrum-master")]
    pub role: Role,

    #[arg(long, env = "JIRA_BOARD_ID")]
    pub board: u64,

    /// Project key for backlog-backed features.
    #[arg(long, env = "JIRA_PROJECT_KEY")]
    pub project: Option<String>,

    /// Assignee display name the developer view filters on. Required for
    /// `--role developer`.
    #[arg(long)]
    pub user: Option<String>,

    /// Question for `qa`, ticket text for `ticket-triage`.
    #[arg(long, short)]
    pub question: Option<String>,

    /// Print the answer as JSON.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Build the assistant request; the developer role needs `--user`.
    pub fn request(&self) -> LensResult<FeatureRequest> {
        let user = self
            .user
            .as_deref()
            .map(str::trim)
            .filter(|user| !user.is_empty());
        if self.role == Role::Developer && user.is_none() {
            return Err(LensError::Validation(ValidationError::RequiredFieldMissing {
                field: "user".to_string(),
            }));
        }

        Ok(FeatureRequest {
            feature: self.feature,
            role: self.role,
            user_identifier: user.unwrap_or_default().to_string(),
            board_id: self.board,
            project_key: self.project.clone().filter(|key| !key.trim().is_empty()),
            question: self.question.clone(),
        })
    }
}

/// Plain-text rendering: title, answer, then sources and notices if any.
pub fn render_text(answer: &FeatureAnswer) -> String {
    let mut out = format!(
        "{}\n{}\n{}\n",
        answer.title,
        "=".repeat(answer.title.chars().count()),
        answer.text
    );
    if !answer.sources.is_empty() {
        out.push_str(&format!("\nSources: {}\n", answer.sources.join(", ")));
    }
    for notice in &answer.notices {
        out.push_str(&format!("Note: {}\n", notice));
    }
    out
}
