//! Change Log Aggregator
//!
//! Flattens per-issue histories into [`UpdateRecord`]s inside a lookback
//! window. Two entry points share the same extraction:
//! - [`recent_updates`] works on issues already in memory
//! - [`updates_for_keys`] refetches each issue's history from an [`IssueSource`]

use chrono::Duration;
use futures_util::{stream, StreamExt, TryStreamExt};
use sprintlens_core::{
    parse_tracker_timestamp, FieldFilter, IssueSource, LensResult, RawIssue, Timestamp,
    TimestampParseError, UpdateRecord, UNKNOWN_AUTHOR,
};

/// Which updates count as recent.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeLogWindow {
    /// Reference instant; the caller decides (usually `Utc::now()`).
    pub now: Timestamp,
    pub lookback: Duration,
    pub fields: FieldFilter,
}

impl ChangeLogWindow {
    pub fn new(now: Timestamp, lookback: Duration, fields: FieldFilter) -> Self {
        Self {
            now,
            lookback,
            fields,
        }
    }

    /// Earliest included instant.
    pub fn cutoff(&self) -> Timestamp {
        self.now - self.lookback
    }

    /// Inclusive at the cutoff.
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        timestamp >= self.cutoff()
    }
}

/// Updates inside the window plus the history entries that had to be skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeLogDigest {
    pub updates: Vec<UpdateRecord>,
    pub parse_errors: Vec<TimestampParseError>,
}

impl ChangeLogDigest {
    pub fn parse_error_count(&self) -> usize {
        self.parse_errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    fn absorb(&mut self, issue: &RawIssue, window: &ChangeLogWindow) {
        for history in &issue.histories {
            let timestamp = match parse_tracker_timestamp(&history.created) {
                Ok(ts) => ts,
                Err(reason) => {
                    tracing::warn!(
                        issue = %issue.key,
                        value = %history.created,
                        %reason,
                        "Skipping history entry with unparsable timestamp"
                    );
                    self.parse_errors.push(TimestampParseError {
                        issue: issue.key.clone(),
                        value: history.created.clone(),
                        reason,
                    });
                    continue;
                }
            };

            if !window.contains(timestamp) {
                continue;
            }

            let author = history
                .author
                .clone()
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

            self.updates.extend(
                history
                    .items
                    .iter()
                    .filter(|item| window.fields.allows(&item.field))
                    .map(|item| UpdateRecord {
                        issue: issue.key.clone(),
                        author: author.clone(),
                        timestamp,
                        field: item.field.clone(),
                        from: item.from.clone(),
                        to: item.to.clone(),
                    }),
            );
        }
    }
}

/// Collect recent field changes from issues already fetched with histories.
///
/// Records are grouped by issue in input order, then history order, then
/// item order. A history entry with an unparsable timestamp is skipped and
/// recorded in [`ChangeLogDigest::parse_errors`].
pub fn recent_updates(issues: &[RawIssue], window: &ChangeLogWindow) -> ChangeLogDigest {
    let mut digest = ChangeLogDigest::default();
    for issue in issues {
        digest.absorb(issue, window);
    }
    digest
}

/// Refetch each key's history and collect recent field changes.
///
/// At most `concurrency` fetches are in flight; results keep the order of
/// `keys`. The first fetch error fails the whole call.
pub async fn updates_for_keys(
    source: &dyn IssueSource,
    keys: &[String],
    window: &ChangeLogWindow,
    concurrency: usize,
) -> LensResult<ChangeLogDigest> {
    let issues: Vec<RawIssue> = stream::iter(keys)
        .map(|key| source.fetch_issue_history(key))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    tracing::debug!(
        source = source.source_name(),
        fetched = issues.len(),
        "Fetched issue histories"
    );

    Ok(recent_updates(&issues, window))
}

// =============================================================================
// TESTS
// =============================================================================
