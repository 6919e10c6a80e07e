//! Core entity structures
//!
//! Raw tracker records on the way in, summaries and corpus entries on the way
//! out. Everything here lives for exactly one pipeline invocation.

use crate::{EmbeddingVector, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Assignee rendered for issues nobody owns.
pub const UNASSIGNED: &str = "Unassigned";

/// Author rendered for history entries without an author (deleted users, automation).
pub const UNKNOWN_AUTHOR: &str = "Unknown";

// ============================================================================
// RAW TRACKER RECORDS
// ============================================================================

/// A single field change inside a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChangeItem {
    pub field: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// One change-log history entry as supplied by the tracker.
///
/// `created` is kept verbatim; parsing happens in the change-log aggregator so
/// a bad entry can be skipped on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHistory {
    pub author: Option<String>,
    pub created: String,
    pub items: Vec<RawChangeItem>,
}

/// Issue record produced by a tracker adapter.
/// Required fields are validated at the adapter boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawIssue {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub reporter: Option<String>,
    pub story_points: Option<f64>,
    pub labels: Vec<String>,
    pub created: Timestamp,
    pub updated: Timestamp,
    /// Change-log histories, oldest first. Empty when not expanded.
    pub histories: Vec<RawHistory>,
}

// ============================================================================
// SUMMARIES
// ============================================================================

/// Compact view of an issue in the active sprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub key: String,
    pub summary: String,
    pub status: String,
    /// Display name, or [`UNASSIGNED`].
    pub assignee: String,
    pub story_points: Option<f64>,
    pub labels: BTreeSet<String>,
    pub updated: Timestamp,
}

/// Compact view of a backlog issue (no sprint assigned).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogSummary {
    pub key: String,
    pub summary: String,
    pub priority: Option<String>,
    pub reporter: Option<String>,
    pub story_points: Option<f64>,
    pub labels: BTreeSet<String>,
    pub created: Timestamp,
}

/// A recent field-level change on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRecord {
    /// Key of the issue this change belongs to.
    pub issue: String,
    pub author: String,
    pub timestamp: Timestamp,
    pub field: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

// ============================================================================
// CORPUS
// ============================================================================

/// Retrievable text entry. `source` is an issue key and is not required to be
/// unique across the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub source: String,
    pub text: String,
    /// Absent until the retriever embeds the entry.
    pub embedding: Option<EmbeddingVector>,
}

impl CorpusEntry {
    /// Create an entry that has not been embedded yet.
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            embedding: None,
        }
    }

    /// Attach a precomputed embedding.
    pub fn with_embedding(mut self, embedding: EmbeddingVector) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn is_embedded(&self) -> bool {
        self.embedding.is_some()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_corpus_entry_starts_unembedded() {
        let entry = CorpusEntry::new("SCRUM-1", "deploy pipeline broken");
        assert_eq!(entry.source, "SCRUM-1");
        assert_eq!(entry.text, "deploy pipeline broken");
        assert!(!entry.is_embedded());

        let entry = entry.with_embedding(EmbeddingVector::new(vec![1.0], "m".to_string()));
        assert!(entry.is_embedded());
    }

    #[test]
    fn test_issue_summary_serializes_labels_sorted() {
        let summary = IssueSummary {
            key: "SCRUM-7".to_string(),
            summary: "Fix login".to_string(),
            status: "In Progress".to_string(),
            assignee: UNASSIGNED.to_string(),
            story_points: Some(3.0),
            labels: ["ux", "auth"].iter().map(|s| s.to_string()).collect(),
            updated: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["labels"], serde_json::json!(["auth", "ux"]));
        assert_eq!(json["assignee"], "Unassigned");
    }
}
