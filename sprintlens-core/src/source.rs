//! Issue source trait.
//!
//! The tracker is an external collaborator. Adapters return explicit
//! [`FetchOutcome`] values so "no active sprint" and "nothing matched" are
//! handled by callers instead of surfacing as empty lists or errors.

use crate::{LensResult, RawIssue};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a fetch produced no issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmptyReason {
    /// The board has no sprint in the active state.
    NoActiveSprint,
    /// The query ran but matched nothing.
    NoMatchingIssues,
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActiveSprint => write!(f, "no active sprint"),
            Self::NoMatchingIssues => write!(f, "no matching issues"),
        }
    }
}

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum FetchOutcome {
    Issues(Vec<RawIssue>),
    Empty(EmptyReason),
}

impl FetchOutcome {
    /// Wrap a fetched list, mapping an empty list to `Empty(reason)`.
    pub fn from_issues(issues: Vec<RawIssue>, reason: EmptyReason) -> Self {
        if issues.is_empty() {
            Self::Empty(reason)
        } else {
            Self::Issues(issues)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty(_))
    }

    /// Issues fetched, or an empty list.
    pub fn into_issues(self) -> Vec<RawIssue> {
        match self {
            Self::Issues(issues) => issues,
            Self::Empty(_) => Vec::new(),
        }
    }
}

/// Read-only access to a project tracker.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Short name used in errors and logs (e.g., "jira").
    fn source_name(&self) -> &str;

    /// Issues in the board's active sprint, with change-log histories.
    async fn fetch_sprint_issues(&self, board_id: u64) -> LensResult<FetchOutcome>;

    /// Open issues in the project that are not assigned to any sprint.
    async fn fetch_backlog_issues(&self, project_key: &str) -> LensResult<FetchOutcome>;

    /// A single issue with its full change-log history.
    async fn fetch_issue_history(&self, issue_key: &str) -> LensResult<RawIssue>;
}
