//! Issue Summarizer
//!
//! Normalizes raw tracker records into [`IssueSummary`] / [`BacklogSummary`].
//! Pure transformation: output order equals input order, nothing is dropped
//! or merged.

use sprintlens_core::{
    BacklogSummary, IssueSummary, LensError, LensResult, RawIssue, ValidationError, UNASSIGNED,
};
use std::collections::BTreeSet;

/// Reject records missing the fields every summary needs.
fn check_required(position: usize, issue: &RawIssue) -> LensResult<()> {
    for (field, value) in [("key", &issue.key), ("summary", &issue.summary)] {
        if value.trim().is_empty() {
            return Err(LensError::Validation(ValidationError::MalformedInput {
                position,
                field: field.to_string(),
            }));
        }
    }
    Ok(())
}

fn label_set(labels: &[String]) -> BTreeSet<String> {
    labels.iter().cloned().collect()
}

/// Summarize issues from the active sprint.
///
/// A missing assignee becomes [`UNASSIGNED`]; missing story points stay
/// `None`; missing labels become an empty set.
pub fn summarize_sprint(issues: &[RawIssue]) -> LensResult<Vec<IssueSummary>> {
    issues
        .iter()
        .enumerate()
        .map(|(position, issue)| {
            check_required(position, issue)?;
            Ok(IssueSummary {
                key: issue.key.clone(),
                summary: issue.summary.clone(),
                status: issue.status.clone(),
                assignee: issue
                    .assignee
                    .clone()
                    .unwrap_or_else(|| UNASSIGNED.to_string()),
                story_points: issue.story_points,
                labels: label_set(&issue.labels),
                updated: issue.updated,
            })
        })
        .collect()
}

/// Summarize backlog issues (not yet assigned to a sprint).
pub fn summarize_backlog(issues: &[RawIssue]) -> LensResult<Vec<BacklogSummary>> {
    issues
        .iter()
        .enumerate()
        .map(|(position, issue)| {
            check_required(position, issue)?;
            Ok(BacklogSummary {
                key: issue.key.clone(),
                summary: issue.summary.clone(),
                priority: issue.priority.clone(),
                reporter: issue.reporter.clone(),
                story_points: issue.story_points,
                labels: label_set(&issue.labels),
                created: issue.created,
            })
        })
        .collect()
}

/// Keep only the summaries assigned to `user`.
pub fn assigned_to<'a>(
    summaries: &'a [IssueSummary],
    user: &'a str,
) -> impl Iterator<Item = &'a IssueSummary> + 'a {
    summaries.iter().filter(move |s| s.assignee == user)
}

// =============================================================================
// TESTS
// =============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use sprintlens_test_utils::generators::arb_raw_issue;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Sprint summaries keep input length and position.
        #[test]
        fn prop_sprint_summary_preserves_position(
            issues in prop::collection::vec(arb_raw_issue(), 0..20)
        ) {
            let summaries = summarize_sprint(&issues).unwrap();
            prop_assert_eq!(summaries.len(), issues.len());
            for (summary, issue) in summaries.iter().zip(issues.iter()) {
                prop_assert_eq!(&summary.key, &issue.key);
                prop_assert_eq!(&summary.summary, &issue.summary);
            }
        }

        /// Backlog summaries keep input length and position.
        #[test]
        fn prop_backlog_summary_preserves_position(
            issues in prop::collection::vec(arb_raw_issue(), 0..20)
        ) {
            let summaries = summarize_backlog(&issues).unwrap();
            prop_assert_eq!(summaries.len(), issues.len());
            for (summary, issue) in summaries.iter().zip(issues.iter()) {
                prop_assert_eq!(&summary.key, &issue.key);
                prop_assert_eq!(summary.story_points, issue.story_points);
            }
        }

        /// The assignee is always populated.
        #[test]
        fn prop_assignee_never_empty(issue in arb_raw_issue()) {
            let summary = &summarize_sprint(&[issue.clone()]).unwrap()[0];
            match issue.assignee {
                Some(name) => prop_assert_eq!(&summary.assignee, &name),
                None => prop_assert_eq!(summary.assignee.as_str(), UNASSIGNED),
            }
        }
    }
}
