//! [`IssueSource`] backed by the Jira REST API.

use super::client::{JiraClient, JiraConfig};
use super::types::{map_issue, JiraIssue, SearchPage, SprintPage};
use async_trait::async_trait;
use sprintlens_core::{
    EmptyReason, FetchOutcome, IssueSource, LensResult, RawIssue, SourceError,
};

/// Reads sprint, backlog and history data from Jira.
#[derive(Debug)]
pub struct JiraIssueSource {
    client: JiraClient,
    story_points_field: String,
    page_size: usize,
    max_results: usize,
}

/// JQL for open issues of `project_key` not planned into any sprint.
pub fn backlog_jql(project_key: &str) -> String {
    format!(
        "project = \"{}\" AND sprint IS EMPTY AND statusCategory != Done",
        project_key.replace('\\', "\\\\").replace('"', "\\\"")
    )
}

pub fn sprint_jql(sprint_id: u64) -> String {
    format!("sprint = {}", sprint_id)
}

impl JiraIssueSource {
    pub fn new(config: &JiraConfig) -> LensResult<Self> {
        Ok(Self {
            client: JiraClient::new(config)?,
            story_points_field: config.story_points_field.clone(),
            page_size: config.page_size.max(1),
            max_results: config.max_results,
        })
    }

    async fn active_sprint_id(&self, board_id: u64) -> LensResult<Option<u64>> {
        let path = format!("rest/agile/1.0/board/{}/sprint", board_id);
        let page: Option<SprintPage> = self
            .client
            .get(&path, &[("state", "active".to_string())])
            .await?;

        let page = page.ok_or_else(|| SourceError::Unavailable {
            source_name: "jira".to_string(),
            reason: format!("board {} not found", board_id),
        })?;

        Ok(page.values.first().map(|sprint| sprint.id))
    }

    /// Run a JQL search, paging until `max_results` or the last page.
    async fn search(&self, jql: &str) -> LensResult<Vec<RawIssue>> {
        let mut issues = Vec::new();
        let mut start_at = 0usize;

        while issues.len() < self.max_results {
            let page_size = self.page_size.min(self.max_results - issues.len());
            let query = [
                ("jql", jql.to_string()),
                ("startAt", start_at.to_string()),
                ("maxResults", page_size.to_string()),
                ("expand", "changelog".to_string()),
            ];
            let page: SearchPage = self
                .client
                .get("rest/api/2/search", &query)
                .await?
                .unwrap_or(SearchPage {
                    start_at,
                    total: 0,
                    issues: Vec::new(),
                });

            let fetched = page.issues.len();
            for issue in page.issues {
                issues.push(map_issue(issue, &self.story_points_field)?);
            }

            start_at = page.start_at + fetched;
            if fetched == 0 || start_at >= page.total {
                break;
            }
        }

        tracing::debug!(jql, count = issues.len(), "Jira search complete");
        Ok(issues)
    }
}

#[async_trait]
impl IssueSource for JiraIssueSource {
    fn source_name(&self) -> &str {
        "jira"
    }

    async fn fetch_sprint_issues(&self, board_id: u64) -> LensResult<FetchOutcome> {
        let Some(sprint_id) = self.active_sprint_id(board_id).await? else {
            tracing::info!(board_id, "No active sprint on board");
            return Ok(FetchOutcome::Empty(EmptyReason::NoActiveSprint));
        };

        let issues = self.search(&sprint_jql(sprint_id)).await?;
        Ok(FetchOutcome::from_issues(issues, EmptyReason::NoMatchingIssues))
    }

    async fn fetch_backlog_issues(&self, project_key: &str) -> LensResult<FetchOutcome> {
        let issues = self.search(&backlog_jql(project_key)).await?;
        Ok(FetchOutcome::from_issues(issues, EmptyReason::NoMatchingIssues))
    }

    async fn fetch_issue_history(&self, issue_key: &str) -> LensResult<RawIssue> {
        let path = format!("rest/api/2/issue/{}", issue_key);
        let issue: JiraIssue = self
            .client
            .get(&path, &[("expand", "changelog".to_string())])
            .await?
            .ok_or_else(|| SourceError::IssueNotFound {
                key: issue_key.to_string(),
            })?;

        Ok(map_issue(issue, &self.story_points_field)?)
    }
}
