//! Jira REST wire types and their mapping into [`RawIssue`].
//!
//! Everything past the HTTP boundary is validated here so the rest of the
//! pipeline only ever sees well-formed records.

use serde::Deserialize;
use serde_json::{Map, Value};
use sprintlens_core::{
    parse_tracker_timestamp, RawChangeItem, RawHistory, RawIssue, SourceError, Timestamp,
};

// ============================================================================
// AGILE API
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SprintPage {
    #[serde(default)]
    pub values: Vec<Sprint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sprint {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

// ============================================================================
// SEARCH / ISSUE API
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    #[serde(default)]
    pub start_at: usize,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub issues: Vec<JiraIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraIssue {
    pub key: String,
    pub fields: IssueFields,
    #[serde(default)]
    pub changelog: Option<Changelog>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub status: Option<Named>,
    #[serde(default)]
    pub assignee: Option<User>,
    #[serde(default)]
    pub priority: Option<Named>,
    #[serde(default)]
    pub reporter: Option<User>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    /// Custom fields (story points among them), keyed by field id.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Changelog {
    #[serde(default)]
    pub histories: Vec<History>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct History {
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub items: Vec<HistoryItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryItem {
    pub field: String,
    #[serde(default, rename = "fromString")]
    pub from_value: Option<String>,
    #[serde(default, rename = "toString")]
    pub to_value: Option<String>,
}

// ============================================================================
// MAPPING
// ============================================================================

fn malformed(key: &str, reason: impl Into<String>) -> SourceError {
    SourceError::MalformedIssue {
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Story points may arrive as a number or a numeric string.
fn story_points(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn display_name(user: Option<User>) -> Option<String> {
    user.and_then(|u| u.display_name)
        .filter(|name| !name.trim().is_empty())
}

/// Map one Jira issue into a [`RawIssue`].
///
/// `created`/`updated` must parse; history timestamps are kept verbatim and
/// parsed later by the change-log aggregator.
pub fn map_issue(issue: JiraIssue, story_points_field: &str) -> Result<RawIssue, SourceError> {
    let JiraIssue {
        key,
        fields,
        changelog,
    } = issue;

    let parse = |name: &str, value: Option<&String>| -> Result<Timestamp, SourceError> {
        let value = value.ok_or_else(|| malformed(&key, format!("missing {name}")))?;
        parse_tracker_timestamp(value).map_err(|e| malformed(&key, format!("{name}: {e}")))
    };
    let created = parse("created", fields.created.as_ref())?;
    let updated = parse("updated", fields.updated.as_ref())?;

    let histories = changelog
        .unwrap_or_default()
        .histories
        .into_iter()
        .map(|h| RawHistory {
            author: display_name(h.author),
            created: h.created,
            items: h
                .items
                .into_iter()
                .map(|item| RawChangeItem {
                    field: item.field,
                    from: item.from_value,
                    to: item.to_value,
                })
                .collect(),
        })
        .collect();

    Ok(RawIssue {
        summary: fields.summary.unwrap_or_default(),
        status: fields.status.map(|s| s.name).unwrap_or_default(),
        assignee: display_name(fields.assignee),
        priority: fields.priority.map(|p| p.name),
        reporter: display_name(fields.reporter),
        story_points: story_points(fields.extra.get(story_points_field)),
        labels: fields.labels.unwrap_or_default(),
        created,
        updated,
        histories,
        key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn fixture() -> Value {
        json!({
            "key": "SCRUM-42",
            "fields": {
                "summary": "Deploy the payments service",
                "status": {"name": "In Progress"},
                "assignee": {"displayName": "Ada Lovelace"},
                "priority": {"name": "High"},
                "reporter": {"displayName": "Grace Hopper"},
                "labels": ["backend", "release"],
                "created": "2024-04-28T09:00:00.000+0000",
                "updated": "2024-05-01T10:15:30.123+0000",
                "customfield_10002": 5.0
            },
            "changelog": {
                "histories": [{
                    "author": {"displayName": "Ada Lovelace"},
                    "created": "2024-05-01T10:15:30.123+0000",
                    "items": [{"field": "status", "fromString": "To Do", "toString": "In Progress"}]
                }]
            }
        })
    }

    fn map(value: Value) -> Result<RawIssue, SourceError> {
        let issue: JiraIssue = serde_json::from_value(value).unwrap();
        map_issue(issue, "customfield_10002")
    }

    #[test]
    fn test_maps_full_issue() {
        let issue = map(fixture()).unwrap();
        assert_eq!(issue.key, "SCRUM-42");
        assert_eq!(issue.status, "In Progress");
        assert_eq!(issue.assignee.as_deref(), Some("Ada Lovelace"));
        assert_eq!(issue.priority.as_deref(), Some("High"));
        assert_eq!(issue.story_points, Some(5.0));
        assert_eq!(issue.labels, vec!["backend", "release"]);
        assert_eq!(issue.created, Utc.with_ymd_and_hms(2024, 4, 28, 9, 0, 0).unwrap());
        assert_eq!(issue.histories.len(), 1);
        assert_eq!(issue.histories[0].items[0].to.as_deref(), Some("In Progress"));
    }

    #[test]
    fn test_story_points_from_string() {
        let mut value = fixture();
        value["fields"]["customfield_10002"] = json!("3");
        assert_eq!(map(value).unwrap().story_points, Some(3.0));
    }

    #[test]
    fn test_null_fields_become_absent() {
        let mut value = fixture();
        value["fields"]["assignee"] = Value::Null;
        value["fields"]["priority"] = Value::Null;
        value["fields"]["labels"] = Value::Null;
        value["fields"]["customfield_10002"] = Value::Null;
        value.as_object_mut().unwrap().remove("changelog");
        let issue = map(value).unwrap();
        assert_eq!(issue.assignee, None);
        assert_eq!(issue.priority, None);
        assert!(issue.labels.is_empty());
        assert_eq!(issue.story_points, None);
        assert!(issue.histories.is_empty());
    }

    #[test]
    fn test_bad_created_is_malformed() {
        let mut value = fixture();
        value["fields"]["created"] = json!("not a date");
        assert!(matches!(
            map(value).unwrap_err(),
            SourceError::MalformedIssue { ref key, .. } if key == "SCRUM-42"
        ));
    }

    #[test]
    fn test_history_timestamp_kept_verbatim() {
        let mut value = fixture();
        value["changelog"]["histories"][0]["created"] = json!("garbage");
        let issue = map(value).unwrap();
        assert_eq!(issue.histories[0].created, "garbage");
    }

    #[test]
    fn test_search_page_deserializes() {
        let page: SearchPage = serde_json::from_value(json!({
            "startAt": 0, "maxResults": 100, "total": 1, "issues": [fixture()]
        }))
        .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.issues.len(), 1);
    }
}
