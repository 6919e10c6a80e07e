//! Shared enums: caller roles, assistant features and change-log field filters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ROLE
// ============================================================================

/// Role of the person invoking the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Manager,
    ScrumMaster,
    /// Sees only the sprint issues assigned to them.
    Developer,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::ScrumMaster => "scrum_master",
            Self::Developer => "developer",
            Self::Client => "client",
        }
    }

    /// Human-readable label used in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Manager => "Manager",
            Self::ScrumMaster => "Scrum Master",
            Self::Developer => "Developer",
            Self::Client => "Client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error parsing Role from string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid role: {0}")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "manager" => Ok(Self::Manager),
            "scrum_master" | "scrummaster" => Ok(Self::ScrumMaster),
            "developer" | "dev" => Ok(Self::Developer),
            "client" => Ok(Self::Client),
            _ => Err(RoleParseError(s.to_string())),
        }
    }
}

// ============================================================================
// FEATURE
// ============================================================================

/// Assistant features. `Qa` is the retrieval-augmented one; the rest are
/// templated prompts over the summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    SprintSummary,
    Qa,
    BacklogRefinement,
    ReleaseNotes,
    TestCaseGeneration,
    RiskAnalysis,
    RetroSentiment,
    TicketTriage,
    EstimationCoach,
    OnboardingDocs,
}

impl Feature {
    pub const ALL: [Feature; 10] = [
        Self::SprintSummary,
        Self::Qa,
        Self::BacklogRefinement,
        Self::ReleaseNotes,
        Self::TestCaseGeneration,
        Self::RiskAnalysis,
        Self::RetroSentiment,
        Self::TicketTriage,
        Self::EstimationCoach,
        Self::OnboardingDocs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SprintSummary => "sprint-summary",
            Self::Qa => "qa",
            Self::BacklogRefinement => "backlog-refinement",
            Self::ReleaseNotes => "release-notes",
            Self::TestCaseGeneration => "test-case-generation",
            Self::RiskAnalysis => "risk-analysis",
            Self::RetroSentiment => "retro-sentiment",
            Self::TicketTriage => "ticket-triage",
            Self::EstimationCoach => "estimation-coach",
            Self::OnboardingDocs => "onboarding-docs",
        }
    }

    /// Title shown above the answer.
    pub fn title(&self) -> &'static str {
        match self {
            Self::SprintSummary => "Sprint Summary",
            Self::Qa => "Answer",
            Self::BacklogRefinement => "Backlog Refinement",
            Self::ReleaseNotes => "Release Notes",
            Self::TestCaseGeneration => "Test-Case Generation",
            Self::RiskAnalysis => "Risk & Dependency Analysis",
            Self::RetroSentiment => "Retro & Sentiment Summary",
            Self::TicketTriage => "Triage & Labeling",
            Self::EstimationCoach => "Estimation Coach",
            Self::OnboardingDocs => "Onboarding Documentation",
        }
    }

    /// Whether the feature needs backlog summaries to produce anything.
    pub fn requires_backlog(&self) -> bool {
        matches!(self, Self::BacklogRefinement | Self::OnboardingDocs)
    }

    /// Whether the feature takes free text from the caller.
    pub fn requires_question(&self) -> bool {
        matches!(self, Self::Qa | Self::TicketTriage)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing Feature from string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid feature: {0}")]
pub struct FeatureParseError(pub String);

impl FromStr for Feature {
    type Err = FeatureParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Self::ALL
            .into_iter()
            .find(|feature| feature.as_str() == normalized)
            .ok_or_else(|| FeatureParseError(s.to_string()))
    }
}

// ============================================================================
// FIELD FILTER
// ============================================================================

/// Which change-log fields the aggregator keeps.
///
/// Serialised as the string `"all"` or a list of field names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "FieldFilterRepr", into = "FieldFilterRepr")]
pub enum FieldFilter {
    /// Keep every changed field.
    #[default]
    All,
    /// Keep only the named fields.
    Only(BTreeSet<String>),
}

impl FieldFilter {
    /// Filter on exactly the given fields.
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(fields.into_iter().map(Into::into).collect())
    }

    pub fn allows(&self, field: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(fields) => fields.contains(field),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum FieldFilterRepr {
    Keyword(String),
    Fields(Vec<String>),
}

impl TryFrom<FieldFilterRepr> for FieldFilter {
    type Error = String;

    fn try_from(repr: FieldFilterRepr) -> Result<Self, Self::Error> {
        match repr {
            FieldFilterRepr::Keyword(k) if k.eq_ignore_ascii_case("all") => Ok(Self::All),
            FieldFilterRepr::Keyword(k) => {
                Err(format!("expected \"all\" or a list of field names, got {:?}", k))
            }
            FieldFilterRepr::Fields(fields) => Ok(Self::only(fields)),
        }
    }
}

impl From<FieldFilter> for FieldFilterRepr {
    fn from(filter: FieldFilter) -> Self {
        match filter {
            FieldFilter::All => Self::Keyword("all".to_string()),
            FieldFilter::Only(fields) => Self::Fields(fields.into_iter().collect()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
