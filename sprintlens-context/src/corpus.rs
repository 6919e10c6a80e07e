//! Corpus Builder

use sprintlens_core::{BacklogSummary, CorpusEntry, IssueSummary};

/// One entry per summary: sprint first, then backlog, each in input order.
///
/// `source` is the issue key and `text` the issue summary. Duplicates are
/// kept and no entry carries an embedding yet.
pub fn build_corpus(sprint: &[IssueSummary], backlog: &[BacklogSummary]) -> Vec<CorpusEntry> {
    sprint
        .iter()
        .map(|s| CorpusEntry::new(s.key.clone(), s.summary.clone()))
        .chain(
            backlog
                .iter()
                .map(|b| CorpusEntry::new(b.key.clone(), b.summary.clone())),
        )
        .collect()
}
