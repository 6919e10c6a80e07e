//! One assistant invocation: fetch, summarize, retrieve or template, complete.

use serde::Serialize;
use sprintlens_context::{
    assemble, build_corpus, feature_prompt, qa_prompt, triage_prompt, truncate_entries,
    PromptData, Retriever,
};
use sprintlens_core::{
    BacklogSummary, CompletionProvider, EmbeddingProvider, Feature, FetchOutcome, IssueSource,
    IssueSummary, LensConfig, LensError, LensResult, LlmError, RawIssue, Role, Timestamp,
    TokenUsage, UpdateRecord, ValidationError,
};
use sprintlens_llm::{with_retry, ProviderRegistry, UsageTracker};
use sprintlens_tracker::{
    assigned_to, recent_updates, summarize_backlog, summarize_sprint, updates_for_keys,
    ChangeLogWindow,
};
use std::sync::Arc;

/// What the caller asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRequest {
    pub feature: Feature,
    pub role: Role,
    /// Assignee display name the Developer role filters on.
    pub user_identifier: String,
    pub board_id: u64,
    pub project_key: Option<String>,
    /// Question for Q&A, ticket text for triage.
    pub question: Option<String>,
}

/// Generated answer plus where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureAnswer {
    pub feature: Feature,
    pub title: String,
    pub text: String,
    /// Issue keys the prompt was built from.
    pub sources: Vec<String>,
    pub model_id: String,
    pub usage: Option<TokenUsage>,
    /// Non-fatal conditions worth showing next to the answer.
    pub notices: Vec<String>,
}

pub struct Assistant {
    source: Arc<dyn IssueSource>,
    embedding: Arc<dyn EmbeddingProvider>,
    completion: Arc<dyn CompletionProvider>,
    config: LensConfig,
    usage: Arc<UsageTracker>,
}

impl Assistant {
    /// Both providers must be registered.
    pub fn new(
        source: Arc<dyn IssueSource>,
        providers: &ProviderRegistry,
        config: LensConfig,
    ) -> LensResult<Self> {
        Ok(Self {
            source,
            embedding: providers.embedding()?,
            completion: providers.completion()?,
            config,
            usage: Arc::new(UsageTracker::new()),
        })
    }

    /// Share the tracker the providers record into.
    pub fn with_usage_tracker(mut self, usage: Arc<UsageTracker>) -> Self {
        self.usage = usage;
        self
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    pub fn config(&self) -> &LensConfig {
        &self.config
    }

    pub async fn run(&self, request: &FeatureRequest) -> LensResult<FeatureAnswer> {
        self.run_at(request, chrono::Utc::now()).await
    }

    /// Run with `now` as the end of the change-log window.
    pub async fn run_at(
        &self,
        request: &FeatureRequest,
        now: Timestamp,
    ) -> LensResult<FeatureAnswer> {
        let feature = request.feature;
        tracing::info!(
            feature = %feature,
            role = %request.role,
            board_id = request.board_id,
            project_key = ?request.project_key,
            "Running feature"
        );

        let answer = match feature {
            Feature::TicketTriage => {
                let ticket = required_text(request.question.as_deref(), "question")?;
                self.complete(
                    feature,
                    triage_prompt(ticket),
                    self.config.completion.triage_max_tokens,
                    Vec::new(),
                    Vec::new(),
                )
                .await?
            }
            Feature::Qa => {
                let question = required_text(request.question.as_deref(), "question")?;
                let mut notices = Vec::new();
                let data = self.fetch(request, &mut notices).await?;
                self.answer_question(question, &data.sprint, &data.backlog, notices)
                    .await?
            }
            _ => {
                if feature.requires_backlog() && request.project_key.is_none() {
                    return Err(LensError::Validation(ValidationError::RequiredFieldMissing {
                        field: "project_key".to_string(),
                    }));
                }
                if request.role == Role::Developer && request.user_identifier.trim().is_empty() {
                    return Err(LensError::Validation(ValidationError::RequiredFieldMissing {
                        field: "user_identifier".to_string(),
                    }));
                }
                let mut notices = Vec::new();
                let data = self.fetch(request, &mut notices).await?;
                self.templated(request, data, now, notices).await?
            }
        };

        tracing::info!(
            feature = %feature,
            sources = answer.sources.len(),
            embedding_tokens = self.usage.embedding_tokens(),
            prompt_tokens = self.usage.prompt_tokens(),
            completion_tokens = self.usage.completion_tokens(),
            "Feature complete"
        );
        Ok(answer)
    }

    async fn fetch(
        &self,
        request: &FeatureRequest,
        notices: &mut Vec<String>,
    ) -> LensResult<TrackerData> {
        let outcome = self.source.fetch_sprint_issues(request.board_id).await?;
        if let FetchOutcome::Empty(reason) = &outcome {
            tracing::info!(board_id = request.board_id, reason = %reason, "Sprint fetch empty");
            notices.push(format!("Board {}: {}", request.board_id, reason));
        }
        let sprint_raw = outcome.into_issues();
        let sprint = summarize_sprint(&sprint_raw)?;

        let backlog = match request.project_key.as_deref() {
            Some(key) => {
                let outcome = self.source.fetch_backlog_issues(key).await?;
                if let FetchOutcome::Empty(reason) = &outcome {
                    tracing::info!(project_key = key, reason = %reason, "Backlog fetch empty");
                    notices.push(format!("Backlog {}: {}", key, reason));
                }
                summarize_backlog(&outcome.into_issues())?
            }
            None => Vec::new(),
        };

        tracing::debug!(
            sprint = sprint.len(),
            backlog = backlog.len(),
            source = self.source.source_name(),
            "Tracker data summarized"
        );
        Ok(TrackerData {
            sprint_raw,
            sprint,
            backlog,
        })
    }

    async fn answer_question(
        &self,
        question: &str,
        sprint: &[IssueSummary],
        backlog: &[BacklogSummary],
        mut notices: Vec<String>,
    ) -> LensResult<FeatureAnswer> {
        let mut corpus = build_corpus(sprint, backlog);
        if let Some(max_tokens) = self.config.retrieval.max_entry_tokens {
            let shortened = truncate_entries(&mut corpus, max_tokens);
            if shortened > 0 {
                tracing::debug!(shortened, max_tokens, "Truncated corpus entries");
            }
        }

        let retriever = Retriever::new(self.embedding.clone(), self.config.retrieval.clone());
        let (context, sources) = match retriever.retrieve_top(&mut corpus, question).await {
            Ok(result) => (
                assemble(&result),
                result.sources().into_iter().map(str::to_string).collect(),
            ),
            Err(LensError::Llm(LlmError::EmbeddingUnavailable { stage, reason }))
                if self.config.degrade_without_retrieval =>
            {
                tracing::warn!(
                    stage = %stage,
                    reason = %reason,
                    "Embeddings unavailable, answering without context"
                );
                notices.push(format!("Answered without issue context ({} embedding failed)", stage));
                (String::new(), Vec::new())
            }
            Err(err) => return Err(err),
        };

        self.complete(
            Feature::Qa,
            qa_prompt(&context, question),
            self.config.completion.qa_max_tokens,
            sources,
            notices,
        )
        .await
    }

    async fn templated(
        &self,
        request: &FeatureRequest,
        data: TrackerData,
        now: Timestamp,
        mut notices: Vec<String>,
    ) -> LensResult<FeatureAnswer> {
        let feature = request.feature;
        if feature.requires_backlog() && data.backlog.is_empty() {
            return Err(LensError::Validation(ValidationError::InvalidValue {
                field: "project_key".to_string(),
                reason: format!(
                    "no backlog issues found for project {}",
                    request.project_key.as_deref().unwrap_or_default()
                ),
            }));
        }

        let updates = if feature == Feature::RetroSentiment {
            self.recent_updates(&data.sprint_raw, now, &mut notices)
                .await?
        } else {
            Vec::new()
        };

        let sprint: Vec<IssueSummary> = if request.role == Role::Developer {
            let own: Vec<IssueSummary> = assigned_to(&data.sprint, &request.user_identifier)
                .cloned()
                .collect();
            if own.is_empty() && !data.sprint.is_empty() {
                tracing::info!(
                    user = %request.user_identifier,
                    sprint = data.sprint.len(),
                    "No sprint issues assigned to user"
                );
                notices.push(format!(
                    "No sprint issues are assigned to {}",
                    request.user_identifier
                ));
            }
            own
        } else {
            data.sprint
        };

        let prompt_data = PromptData {
            sprint: &sprint,
            backlog: &data.backlog,
            updates: &updates,
        };
        let prompt = feature_prompt(feature, request.role, prompt_data)?;
        let sources = prompt_sources(feature, prompt_data);

        self.complete(
            feature,
            prompt,
            self.config.completion.feature_max_tokens,
            sources,
            notices,
        )
        .await
    }

    async fn recent_updates(
        &self,
        sprint: &[RawIssue],
        now: Timestamp,
        notices: &mut Vec<String>,
    ) -> LensResult<Vec<UpdateRecord>> {
        let settings = &self.config.changelog;
        let window = ChangeLogWindow::new(now, settings.lookback(), settings.fields.clone());

        let digest = if settings.refetch_history {
            let keys: Vec<String> = sprint.iter().map(|issue| issue.key.clone()).collect();
            updates_for_keys(
                self.source.as_ref(),
                &keys,
                &window,
                settings.history_concurrency,
            )
            .await?
        } else {
            recent_updates(sprint, &window)
        };

        if digest.parse_error_count() > 0 {
            notices.push(format!(
                "Skipped {} history entries with unreadable timestamps",
                digest.parse_error_count()
            ));
        }
        Ok(digest.updates)
    }

    async fn complete(
        &self,
        feature: Feature,
        prompt: String,
        max_tokens: u32,
        sources: Vec<String>,
        notices: Vec<String>,
    ) -> LensResult<FeatureAnswer> {
        let provider = self.completion.as_ref();
        let completion = with_retry(&self.config.llm_retry_config, feature.as_str(), || {
            provider.complete(&prompt, max_tokens)
        })
        .await?;

        Ok(FeatureAnswer {
            feature,
            title: feature.title().to_string(),
            text: completion.text,
            sources,
            model_id: completion.model_id,
            usage: completion.usage,
            notices,
        })
    }
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("source", &self.source.source_name())
            .field("embedding_model", &self.embedding.model_id())
            .field("completion_model", &self.completion.model_id())
            .field("config", &self.config)
            .finish()
    }
}

struct TrackerData {
    sprint_raw: Vec<RawIssue>,
    sprint: Vec<IssueSummary>,
    backlog: Vec<BacklogSummary>,
}

fn required_text<'a>(value: Option<&'a str>, field: &str) -> LensResult<&'a str> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(LensError::Validation(ValidationError::RequiredFieldMissing {
            field: field.to_string(),
        })),
    }
}

/// Keys of the records a templated prompt embeds, first occurrence order.
fn prompt_sources(feature: Feature, data: PromptData<'_>) -> Vec<String> {
    let keys: Vec<&str> = match feature {
        Feature::BacklogRefinement | Feature::OnboardingDocs => {
            data.backlog.iter().map(|b| b.key.as_str()).collect()
        }
        Feature::RetroSentiment => data.updates.iter().map(|u| u.issue.as_str()).collect(),
        _ => data.sprint.iter().map(|s| s.key.as_str()).collect(),
    };
    let mut seen = std::collections::HashSet::new();
    keys.into_iter()
        .filter(|key| seen.insert(*key))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprintlens_core::{RawChangeItem, RawHistory, SourceError};
    use sprintlens_test_utils::fixtures::{
        assigned_issue, deploy_and_dark_mode_sprint, raw_issue, reference_time,
    };
    use sprintlens_test_utils::{
        FailingEmbeddingProvider, FailureMode, KeywordEmbeddingProvider, MockCompletionProvider,
        StaticIssueSource,
    };

    struct Harness {
        assistant: Assistant,
        source: Arc<StaticIssueSource>,
        embedding: Arc<KeywordEmbeddingProvider>,
        completion: Arc<MockCompletionProvider>,
    }

    fn harness(source: StaticIssueSource, config: LensConfig) -> Harness {
        let source = Arc::new(source);
        let embedding = Arc::new(KeywordEmbeddingProvider::sprint_vocabulary());
        let completion = Arc::new(MockCompletionProvider::new());
        let mut providers = ProviderRegistry::new();
        providers.register_embedding(embedding.clone());
        providers.register_completion(completion.clone());
        let assistant = Assistant::new(source.clone(), &providers, config).unwrap();
        Harness {
            assistant,
            source,
            embedding,
            completion,
        }
    }

    fn request(feature: Feature) -> FeatureRequest {
        FeatureRequest {
            feature,
            role: Role::ScrumMaster,
            user_identifier: "Ada".to_string(),
            board_id: 7,
            project_key: None,
            question: None,
        }
    }

    fn history(minutes_ago: i64, field: &str) -> RawHistory {
        RawHistory {
            author: Some("Grace".to_string()),
            created: (reference_time() - chrono::Duration::minutes(minutes_ago)).to_rfc3339(),
            items: vec![RawChangeItem {
                field: field.to_string(),
                from: Some("To Do".to_string()),
                to: Some("Done".to_string()),
            }],
        }
    }

    #[test]
    fn test_new_requires_both_providers() {
        let providers = ProviderRegistry::new();
        let result = Assistant::new(Arc::new(StaticIssueSource::new()), &providers, LensConfig::default());
        assert!(matches!(result, Err(LensError::Llm(LlmError::ProviderNotConfigured))));
    }

    #[tokio::test]
    async fn test_qa_retrieves_deploy_issue() {
        let h = harness(
            StaticIssueSource::new().with_sprint(deploy_and_dark_mode_sprint()),
            LensConfig {
                retrieval: sprintlens_core::RetrievalConfig {
                    top_k: 1,
                    ..Default::default()
                },
                ..LensConfig::default()
            },
        );
        let answer = h
            .assistant
            .run_at(
                &FeatureRequest {
                    question: Some("When is the deploy?".to_string()),
                    ..request(Feature::Qa)
                },
                reference_time(),
            )
            .await
            .unwrap();

        assert_eq!(answer.sources, vec!["SCRUM-1".to_string()]);
        assert_eq!(answer.title, "Answer");
        let (prompt, max_tokens) = h.completion.prompts().pop().unwrap();
        assert_eq!(max_tokens, 500);
        assert!(prompt.contains("Context:\n[SCRUM-1]: Deploy payment service\nQuestion: When is the deploy?"));
    }

    #[tokio::test]
    async fn test_qa_without_active_sprint_still_answers() {
        let h = harness(StaticIssueSource::new(), LensConfig::default());
        let answer = h
            .assistant
            .run_at(
                &FeatureRequest {
                    question: Some("Anything blocked?".to_string()),
                    ..request(Feature::Qa)
                },
                reference_time(),
            )
            .await
            .unwrap();

        assert!(answer.sources.is_empty());
        assert_eq!(answer.notices, vec!["Board 7: no active sprint".to_string()]);
        assert_eq!(h.embedding.total_calls(), 0);
        assert!(h
            .completion
            .last_prompt()
            .unwrap()
            .contains("Context:\n\nQuestion: Anything blocked?"));
    }

    #[tokio::test]
    async fn test_qa_requires_question() {
        let h = harness(StaticIssueSource::new(), LensConfig::default());
        let result = h.assistant.run_at(&request(Feature::Qa), reference_time()).await;
        assert!(matches!(
            result,
            Err(LensError::Validation(ValidationError::RequiredFieldMissing { .. }))
        ));
        assert!(h.completion.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_qa_degrades_when_configured() {
        let source = Arc::new(StaticIssueSource::new().with_sprint(deploy_and_dark_mode_sprint()));
        let completion = Arc::new(MockCompletionProvider::new());
        let mut providers = ProviderRegistry::new();
        providers.register_embedding(Arc::new(FailingEmbeddingProvider::new(FailureMode::Query)));
        providers.register_completion(completion.clone());
        let config = LensConfig {
            degrade_without_retrieval: true,
            ..LensConfig::default()
        };
        let assistant = Assistant::new(source, &providers, config).unwrap();

        let answer = assistant
            .run_at(
                &FeatureRequest {
                    question: Some("deploy?".to_string()),
                    ..request(Feature::Qa)
                },
                reference_time(),
            )
            .await
            .unwrap();
        assert!(answer.sources.is_empty());
        assert_eq!(answer.notices.len(), 1);
        assert!(completion.last_prompt().unwrap().contains("Context:\n\nQuestion: deploy?"));
    }

    #[tokio::test]
    async fn test_qa_embedding_failure_propagates_by_default() {
        let source = Arc::new(StaticIssueSource::new().with_sprint(deploy_and_dark_mode_sprint()));
        let completion = Arc::new(MockCompletionProvider::new());
        let mut providers = ProviderRegistry::new();
        providers.register_embedding(Arc::new(FailingEmbeddingProvider::new(FailureMode::Corpus)));
        providers.register_completion(completion.clone());
        let assistant = Assistant::new(source, &providers, LensConfig::default()).unwrap();

        let result = assistant
            .run_at(
                &FeatureRequest {
                    question: Some("deploy?".to_string()),
                    ..request(Feature::Qa)
                },
                reference_time(),
            )
            .await;
        assert!(matches!(
            result,
            Err(LensError::Llm(LlmError::EmbeddingUnavailable { .. }))
        ));
        assert!(completion.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_triage_skips_tracker() {
        let h = harness(
            StaticIssueSource::new().with_sprint(deploy_and_dark_mode_sprint()),
            LensConfig::default(),
        );
        let answer = h
            .assistant
            .run_at(
                &FeatureRequest {
                    question: Some("Login page crashes".to_string()),
                    project_key: Some("SCRUM".to_string()),
                    ..request(Feature::TicketTriage)
                },
                reference_time(),
            )
            .await
            .unwrap();

        assert_eq!(answer.title, "Triage & Labeling");
        assert_eq!(h.source.backlog_calls(), 0);
        assert_eq!(h.embedding.total_calls(), 0);
        assert_eq!(
            h.completion.prompts(),
            vec![(
                "Triage this ticket: Login page crashes. Suggest labels, priority, and assignment."
                    .to_string(),
                500
            )]
        );
    }

    #[tokio::test]
    async fn test_developer_sees_only_own_issues() {
        let h = harness(
            StaticIssueSource::new().with_sprint(deploy_and_dark_mode_sprint()),
            LensConfig::default(),
        );
        let answer = h
            .assistant
            .run_at(
                &FeatureRequest {
                    role: Role::Developer,
                    user_identifier: "Grace".to_string(),
                    ..request(Feature::SprintSummary)
                },
                reference_time(),
            )
            .await
            .unwrap();

        assert_eq!(answer.sources, vec!["SCRUM-2".to_string()]);
        let (prompt, max_tokens) = h.completion.prompts().pop().unwrap();
        assert_eq!(max_tokens, 600);
        assert!(prompt.starts_with("Generate a Developer sprint summary."));
        assert!(prompt.contains("SCRUM-2"));
        assert!(!prompt.contains("SCRUM-1"));
    }

    #[tokio::test]
    async fn test_developer_without_matching_issues_gets_notice() {
        let h = harness(
            StaticIssueSource::new().with_sprint(deploy_and_dark_mode_sprint()),
            LensConfig::default(),
        );
        let answer = h
            .assistant
            .run_at(
                &FeatureRequest {
                    role: Role::Developer,
                    user_identifier: "grace@example.com".to_string(),
                    ..request(Feature::SprintSummary)
                },
                reference_time(),
            )
            .await
            .unwrap();

        assert!(answer.sources.is_empty());
        assert_eq!(
            answer.notices,
            vec!["No sprint issues are assigned to grace@example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn test_developer_requires_user_identifier() {
        let h = harness(
            StaticIssueSource::new().with_sprint(deploy_and_dark_mode_sprint()),
            LensConfig::default(),
        );
        let result = h
            .assistant
            .run_at(
                &FeatureRequest {
                    role: Role::Developer,
                    user_identifier: " ".to_string(),
                    ..request(Feature::SprintSummary)
                },
                reference_time(),
            )
            .await;
        assert!(matches!(
            result,
            Err(LensError::Validation(ValidationError::RequiredFieldMissing { ref field }))
                if field == "user_identifier"
        ));
        assert!(h.completion.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_backlog_feature_needs_project_key() {
        let h = harness(StaticIssueSource::new(), LensConfig::default());
        let result = h
            .assistant
            .run_at(&request(Feature::BacklogRefinement), reference_time())
            .await;
        assert!(matches!(
            result,
            Err(LensError::Validation(ValidationError::RequiredFieldMissing { ref field }))
                if field == "project_key"
        ));
    }

    #[tokio::test]
    async fn test_backlog_feature_rejects_empty_backlog() {
        let h = harness(StaticIssueSource::new(), LensConfig::default());
        let result = h
            .assistant
            .run_at(
                &FeatureRequest {
                    project_key: Some("SCRUM".to_string()),
                    ..request(Feature::OnboardingDocs)
                },
                reference_time(),
            )
            .await;
        assert!(matches!(
            result,
            Err(LensError::Validation(ValidationError::InvalidValue { .. }))
        ));
        assert_eq!(h.source.backlog_calls(), 1);
        assert!(h.completion.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_backlog_refinement_uses_backlog_keys() {
        let h = harness(
            StaticIssueSource::new()
                .with_sprint(deploy_and_dark_mode_sprint())
                .with_backlog(vec![raw_issue("SCRUM-9", "Export reports")]),
            LensConfig::default(),
        );
        let answer = h
            .assistant
            .run_at(
                &FeatureRequest {
                    project_key: Some("SCRUM".to_string()),
                    ..request(Feature::BacklogRefinement)
                },
                reference_time(),
            )
            .await
            .unwrap();
        assert_eq!(answer.sources, vec!["SCRUM-9".to_string()]);
        assert!(h.completion.last_prompt().unwrap().contains("Export reports"));
    }

    #[tokio::test]
    async fn test_retro_refetches_histories() {
        let mut recent = assigned_issue("SCRUM-1", "Deploy payment service", "Ada");
        recent.histories = vec![history(30, "status"), history(60 * 48, "status")];
        let mut stale = assigned_issue("SCRUM-2", "Add dark mode toggle", "Grace");
        stale.histories = vec![history(60 * 30, "status")];

        let h = harness(
            StaticIssueSource::new().with_sprint(vec![recent, stale]),
            LensConfig::default(),
        );
        let answer = h
            .assistant
            .run_at(&request(Feature::RetroSentiment), reference_time())
            .await
            .unwrap();

        assert_eq!(h.source.history_calls(), 2);
        assert_eq!(answer.sources, vec!["SCRUM-1".to_string()]);
        let prompt = h.completion.last_prompt().unwrap();
        assert!(prompt.starts_with("Summarize retrospective sentiment based on updates: [{"));
        assert!(prompt.contains(r#""author":"Grace""#));
    }

    #[tokio::test]
    async fn test_retro_in_memory_reports_skipped_entries() {
        let mut issue = raw_issue("SCRUM-1", "Deploy payment service");
        let mut broken = history(5, "status");
        broken.created = "yesterday-ish".to_string();
        issue.histories = vec![history(10, "status"), broken];

        let mut config = LensConfig::default();
        config.changelog.refetch_history = false;
        let h = harness(StaticIssueSource::new().with_sprint(vec![issue]), config);
        let answer = h
            .assistant
            .run_at(&request(Feature::RetroSentiment), reference_time())
            .await
            .unwrap();

        assert_eq!(h.source.history_calls(), 0);
        assert_eq!(answer.sources, vec!["SCRUM-1".to_string()]);
        assert_eq!(
            answer.notices,
            vec!["Skipped 1 history entries with unreadable timestamps".to_string()]
        );
    }

    #[tokio::test]
    async fn test_completion_failure_propagates() {
        let source = Arc::new(StaticIssueSource::new().with_sprint(deploy_and_dark_mode_sprint()));
        let mut providers = ProviderRegistry::new();
        providers.register_embedding(Arc::new(KeywordEmbeddingProvider::sprint_vocabulary()));
        providers.register_completion(Arc::new(MockCompletionProvider::failing()));
        let mut config = LensConfig::default();
        config.llm_retry_config.max_retries = 0;
        let assistant = Assistant::new(source, &providers, config).unwrap();

        let result = assistant
            .run_at(&request(Feature::RiskAnalysis), reference_time())
            .await;
        assert!(matches!(
            result,
            Err(LensError::Llm(LlmError::ProviderUnavailable { .. }))
        ));
    }

    #[tokio::test]
    async fn test_missing_history_fails_retro() {
        struct Vanishing;

        #[async_trait::async_trait]
        impl IssueSource for Vanishing {
            fn source_name(&self) -> &str {
                "vanishing"
            }
            async fn fetch_sprint_issues(&self, _board_id: u64) -> LensResult<FetchOutcome> {
                Ok(FetchOutcome::Issues(vec![raw_issue("SCRUM-1", "Deploy")]))
            }
            async fn fetch_backlog_issues(&self, _key: &str) -> LensResult<FetchOutcome> {
                Ok(FetchOutcome::Empty(sprintlens_core::EmptyReason::NoMatchingIssues))
            }
            async fn fetch_issue_history(&self, key: &str) -> LensResult<RawIssue> {
                Err(LensError::Source(SourceError::IssueNotFound {
                    key: key.to_string(),
                }))
            }
        }

        let mut providers = ProviderRegistry::new();
        providers.register_embedding(Arc::new(KeywordEmbeddingProvider::sprint_vocabulary()));
        providers.register_completion(Arc::new(MockCompletionProvider::new()));
        let assistant = Assistant::new(Arc::new(Vanishing), &providers, LensConfig::default()).unwrap();

        let result = assistant
            .run_at(&request(Feature::RetroSentiment), reference_time())
            .await;
        assert!(matches!(
            result,
            Err(LensError::Source(SourceError::IssueNotFound { .. }))
        ));
    }

    #[test]
    fn test_prompt_sources_deduplicates() {
        let updates = vec![
            UpdateRecord {
                issue: "A-1".to_string(),
                author: "x".to_string(),
                timestamp: reference_time(),
                field: "status".to_string(),
                from: None,
                to: None,
            },
            UpdateRecord {
                issue: "A-1".to_string(),
                author: "y".to_string(),
                timestamp: reference_time(),
                field: "labels".to_string(),
                from: None,
                to: None,
            },
        ];
        let data = PromptData {
            updates: &updates,
            ..PromptData::default()
        };
        assert_eq!(prompt_sources(Feature::RetroSentiment, data), vec!["A-1".to_string()]);
    }
}
