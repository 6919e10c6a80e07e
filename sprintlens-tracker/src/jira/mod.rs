//! Jira adapter
//!
//! Implements [`sprintlens_core::IssueSource`] over the Jira Agile and REST v2
//! APIs using basic auth (email + API token).

pub mod client;
pub mod source;
pub mod types;

pub use client::{JiraClient, JiraConfig};
pub use source::{backlog_jql, sprint_jql, JiraIssueSource};
pub use types::map_issue;
