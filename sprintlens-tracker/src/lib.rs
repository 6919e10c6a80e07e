//! SprintLens Tracker
//!
//! Turns tracker data into pipeline records:
//! - [`summarize`]: raw issues to sprint/backlog summaries
//! - [`changelog`]: recent field changes inside a lookback window
//! - [`jira`]: the Jira-backed [`sprintlens_core::IssueSource`]

pub mod changelog;
pub mod jira;
pub mod summarize;

pub use changelog::{recent_updates, updates_for_keys, ChangeLogDigest, ChangeLogWindow};
pub use jira::{JiraConfig, JiraIssueSource};
pub use summarize::{assigned_to, summarize_backlog, summarize_sprint};
