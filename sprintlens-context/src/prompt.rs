//! Prompt templates for the assistant features.
//!
//! Summaries and updates are embedded as compact JSON.

use serde::Serialize;
use sprintlens_core::{
    BacklogSummary, Feature, IssueSummary, LensError, LensResult, Role, UpdateRecord,
    ValidationError,
};

/// Data a templated feature prompt may draw on.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptData<'a> {
    pub sprint: &'a [IssueSummary],
    pub backlog: &'a [BacklogSummary],
    pub updates: &'a [UpdateRecord],
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> LensResult<String> {
    serde_json::to_string(value).map_err(|e| {
        LensError::Validation(ValidationError::InvalidValue {
            field: "prompt".to_string(),
            reason: format!("failed to render prompt data: {}", e),
        })
    })
}

/// Retrieval-augmented question prompt.
pub fn qa_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an AI assistant. Use the following context to answer the question.\n\
         Context:\n{context}\n\
         Question: {question}\n"
    )
}

/// Ticket triage prompt; needs no tracker data.
pub fn triage_prompt(ticket: &str) -> String {
    format!(
        "Triage this ticket: {}. Suggest labels, priority, and assignment.",
        ticket.trim()
    )
}

/// Prompt for every templated feature.
///
/// `Qa` and `TicketTriage` take caller text and have their own builders.
pub fn feature_prompt(feature: Feature, role: Role, data: PromptData<'_>) -> LensResult<String> {
    let prompt = match feature {
        Feature::SprintSummary => format!(
            "Generate a {} sprint summary. Issues: {}.",
            role.label(),
            to_json(data.sprint)?
        ),
        Feature::BacklogRefinement => format!(
            "Given backlog items: {}, suggest acceptance criteria, tasks, and story-point estimates.",
            to_json(data.backlog)?
        ),
        Feature::ReleaseNotes => format!(
            "Draft release notes for completed sprint issues: {}.",
            to_json(data.sprint)?
        ),
        Feature::TestCaseGeneration => format!(
            "Generate test cases for these stories/bugs: {}.",
            to_json(data.sprint)?
        ),
        Feature::RiskAnalysis => format!(
            "Analyze risks and dependencies in sprint issues: {}.",
            to_json(data.sprint)?
        ),
        Feature::RetroSentiment => format!(
            "Summarize retrospective sentiment based on updates: {}.",
            to_json(data.updates)?
        ),
        Feature::EstimationCoach => format!(
            "Given past velocity and sprint issues: {}, recommend a realistic sprint commitment.",
            to_json(data.sprint)?
        ),
        Feature::OnboardingDocs => format!(
            "Create onboarding docs based on backlog: {}.",
            to_json(data.backlog)?
        ),
        Feature::Qa | Feature::TicketTriage => {
            return Err(LensError::Validation(ValidationError::InvalidValue {
                field: "feature".to_string(),
                reason: format!("{} is not a templated feature", feature),
            }))
        }
    };
    Ok(prompt)
}
