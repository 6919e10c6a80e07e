//! SprintLens Test Utilities
//!
//! Shared test infrastructure for the SprintLens workspace:
//! - Provider and issue-source doubles
//! - Proptest generators for tracker records
//! - Fixtures for common scenarios
//! - Assertions for SprintLens-specific errors

pub use sprintlens_core::{
    BacklogSummary, Completion, CompletionProvider, CorpusEntry, EmbeddingProvider,
    EmbeddingStage, EmbeddingVector, EmptyReason, FetchOutcome, IssueSource, IssueSummary,
    LensConfig, LensError, LensResult, LlmError, RawChangeItem, RawHistory, RawIssue,
    SourceError, Timestamp, TokenUsage, ValidationError, VectorError,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// EMBEDDING DOUBLES
// ============================================================================

/// Embeds text as keyword counts over a fixed vocabulary.
///
/// Texts sharing vocabulary words point the same way, which makes ranking
/// outcomes predictable. Text with no vocabulary word embeds to zero.
#[derive(Debug, Default)]
pub struct KeywordEmbeddingProvider {
    vocabulary: Vec<String>,
    embed_calls: AtomicUsize,
    batch_calls: AtomicUsize,
}

impl KeywordEmbeddingProvider {
    pub fn new<I, S>(vocabulary: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vocabulary: vocabulary
                .into_iter()
                .map(|w| w.into().to_lowercase())
                .collect(),
            ..Self::default()
        }
    }

    /// Vocabulary covering the fixtures in [`fixtures`].
    pub fn sprint_vocabulary() -> Self {
        Self::new([
            "deploy", "release", "dark", "mode", "login", "payment", "test", "bug",
        ])
    }

    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        self.vocabulary
            .iter()
            .map(|keyword| {
                words
                    .iter()
                    .filter(|w| w.starts_with(keyword.as_str()))
                    .count() as f32
            })
            .collect()
    }

    /// Number of single-text `embed` calls.
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    /// Number of `embed_batch` calls.
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.embed_calls() + self.batch_calls()
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbeddingProvider {
    async fn embed(&self, text: &str) -> LensResult<EmbeddingVector> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(EmbeddingVector::new(self.vectorize(text), "keyword".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> LensResult<Vec<EmbeddingVector>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| EmbeddingVector::new(self.vectorize(t), "keyword".to_string()))
            .collect())
    }

    fn dimensions(&self) -> Option<i32> {
        Some(self.vocabulary.len() as i32)
    }

    fn model_id(&self) -> &str {
        "keyword"
    }
}

/// How a [`FailingEmbeddingProvider`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// `embed_batch` errors
    Corpus,
    /// `embed` errors
    Query,
    /// `embed_batch` returns one vector fewer than requested
    ShortBatch,
}

/// Embedding provider that fails in a chosen way and counts calls.
#[derive(Debug)]
pub struct FailingEmbeddingProvider {
    mode: FailureMode,
    calls: AtomicUsize,
}

impl FailingEmbeddingProvider {
    pub fn new(mode: FailureMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn outage() -> LensError {
        LensError::Llm(LlmError::ProviderUnavailable {
            provider: "failing".to_string(),
            reason: "simulated outage".to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbeddingProvider {
    async fn embed(&self, _text: &str) -> LensResult<EmbeddingVector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            FailureMode::Query => Err(Self::outage()),
            _ => Ok(EmbeddingVector::new(vec![1.0, 0.0], "failing".to_string())),
        }
    }

    async fn embed_batch(&self, texts: &[&str]) -> LensResult<Vec<EmbeddingVector>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let one = || EmbeddingVector::new(vec![1.0, 0.0], "failing".to_string());
        match self.mode {
            FailureMode::Corpus => Err(Self::outage()),
            FailureMode::ShortBatch => Ok(texts.iter().skip(1).map(|_| one()).collect()),
            FailureMode::Query => Ok(texts.iter().map(|_| one()).collect()),
        }
    }

    fn dimensions(&self) -> Option<i32> {
        Some(2)
    }

    fn model_id(&self) -> &str {
        "failing"
    }
}

// ============================================================================
// COMPLETION DOUBLE
// ============================================================================

/// Completion provider that echoes and records every prompt.
#[derive(Debug)]
pub struct MockCompletionProvider {
    prefix: String,
    fail: bool,
    prompts: Mutex<Vec<(String, u32)>>,
}

impl MockCompletionProvider {
    pub fn new() -> Self {
        Self::with_prefix("Answer: ")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with `ProviderUnavailable`.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Prompts received so far with their `max_tokens`.
    pub fn prompts(&self) -> Vec<(String, u32)> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts().pop().map(|(prompt, _)| prompt)
    }
}

impl Default for MockCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> LensResult<Completion> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((prompt.to_string(), max_tokens));
        }
        if self.fail {
            return Err(LensError::Llm(LlmError::ProviderUnavailable {
                provider: "mock".to_string(),
                reason: "simulated outage".to_string(),
            }));
        }

        let first_line = prompt.lines().next().unwrap_or_default();
        Ok(Completion {
            text: format!("{}{}", self.prefix, first_line),
            model_id: "mock".to_string(),
            usage: Some(TokenUsage {
                prompt_tokens: prompt.split_whitespace().count() as i64,
                completion_tokens: 1,
            }),
        })
    }

    fn model_id(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// ISSUE SOURCE DOUBLE
// ============================================================================

/// In-memory issue source.
///
/// The sprint starts inactive; [`StaticIssueSource::with_sprint`] activates it.
#[derive(Debug, Default)]
pub struct StaticIssueSource {
    sprint: Option<Vec<RawIssue>>,
    backlog: Vec<RawIssue>,
    issues: HashMap<String, RawIssue>,
    history_calls: AtomicUsize,
    backlog_calls: AtomicUsize,
}

impl StaticIssueSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate a sprint holding `issues`; each is also fetchable by key.
    pub fn with_sprint(mut self, issues: Vec<RawIssue>) -> Self {
        for issue in &issues {
            self.issues.insert(issue.key.clone(), issue.clone());
        }
        self.sprint = Some(issues);
        self
    }

    pub fn with_backlog(mut self, issues: Vec<RawIssue>) -> Self {
        for issue in &issues {
            self.issues.insert(issue.key.clone(), issue.clone());
        }
        self.backlog = issues;
        self
    }

    /// Register issues fetchable by key only.
    pub fn with_issues(mut self, issues: Vec<RawIssue>) -> Self {
        for issue in issues {
            self.issues.insert(issue.key.clone(), issue);
        }
        self
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn backlog_calls(&self) -> usize {
        self.backlog_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IssueSource for StaticIssueSource {
    fn source_name(&self) -> &str {
        "static"
    }

    async fn fetch_sprint_issues(&self, _board_id: u64) -> LensResult<FetchOutcome> {
        Ok(match &self.sprint {
            None => FetchOutcome::Empty(EmptyReason::NoActiveSprint),
            Some(issues) => FetchOutcome::from_issues(issues.clone(), EmptyReason::NoMatchingIssues),
        })
    }

    async fn fetch_backlog_issues(&self, _project_key: &str) -> LensResult<FetchOutcome> {
        self.backlog_calls.fetch_add(1, Ordering::SeqCst);
        Ok(FetchOutcome::from_issues(
            self.backlog.clone(),
            EmptyReason::NoMatchingIssues,
        ))
    }

    async fn fetch_issue_history(&self, issue_key: &str) -> LensResult<RawIssue> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.issues.get(issue_key).cloned().ok_or_else(|| {
            LensError::Source(SourceError::IssueNotFound {
                key: issue_key.to_string(),
            })
        })
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for tracker records.

    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    /// Timestamps between 2024-04-01 and 2024-06-01 UTC.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        let start = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap().timestamp();
        let end = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap().timestamp();
        (start..end).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
    }

    /// Timestamp text as a tracker would send it, in one of several formats.
    pub fn arb_tracker_timestamp_text() -> impl Strategy<Value = String> {
        (arb_timestamp(), 0u8..3).prop_map(|(ts, style)| match style {
            0 => ts.format("%Y-%m-%dT%H:%M:%S%.3f+0000").to_string(),
            1 => ts.to_rfc3339(),
            _ => ts.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        })
    }

    pub fn arb_field_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("status".to_string()),
            Just("comment".to_string()),
            Just("assignee".to_string()),
            Just("labels".to_string()),
            Just("priority".to_string()),
        ]
    }

    pub fn arb_raw_change_item() -> impl Strategy<Value = RawChangeItem> {
        (
            arb_field_name(),
            proptest::option::of("[A-Za-z ]{1,12}"),
            proptest::option::of("[A-Za-z ]{1,12}"),
        )
            .prop_map(|(field, from, to)| RawChangeItem { field, from, to })
    }

    pub fn arb_raw_history() -> impl Strategy<Value = RawHistory> {
        (
            proptest::option::of("[A-Z][a-z]{2,8} [A-Z][a-z]{2,8}"),
            arb_tracker_timestamp_text(),
            prop::collection::vec(arb_raw_change_item(), 0..4),
        )
            .prop_map(|(author, created, items)| RawHistory {
                author,
                created,
                items,
            })
    }

    pub fn arb_issue_key() -> impl Strategy<Value = String> {
        ("[A-Z]{2,6}", 1u32..5000).prop_map(|(project, n)| format!("{}-{}", project, n))
    }

    /// Well-formed raw issue (non-blank key and summary).
    pub fn arb_raw_issue() -> impl Strategy<Value = RawIssue> {
        (
            arb_issue_key(),
            "[A-Za-z][A-Za-z ]{0,40}",
            prop_oneof![Just("To Do"), Just("In Progress"), Just("Done")],
            proptest::option::of("[A-Z][a-z]{2,8}"),
            proptest::option::of(prop_oneof![Just("High"), Just("Medium"), Just("Low")]),
            proptest::option::of(0.0f64..13.0),
            prop::collection::vec("[a-z]{2,8}", 0..4),
            arb_timestamp(),
            prop::collection::vec(arb_raw_history(), 0..4),
        )
            .prop_map(
                |(key, summary, status, assignee, priority, story_points, labels, created, histories)| {
                    RawIssue {
                        key,
                        summary,
                        status: status.to_string(),
                        reporter: assignee.clone(),
                        assignee,
                        priority: priority.map(str::to_string),
                        story_points,
                        labels,
                        created,
                        updated: created,
                        histories,
                    }
                },
            )
    }

    pub fn arb_issue_summary() -> impl Strategy<Value = IssueSummary> {
        (arb_issue_key(), "[A-Za-z][A-Za-z ]{0,40}", arb_timestamp()).prop_map(
            |(key, summary, updated)| IssueSummary {
                key,
                summary,
                status: "To Do".to_string(),
                assignee: sprintlens_core::UNASSIGNED.to_string(),
                story_points: None,
                labels: Default::default(),
                updated,
            },
        )
    }

    pub fn arb_backlog_summary() -> impl Strategy<Value = BacklogSummary> {
        (arb_issue_key(), "[A-Za-z][A-Za-z ]{0,40}", arb_timestamp()).prop_map(
            |(key, summary, created)| BacklogSummary {
                key,
                summary,
                priority: None,
                reporter: None,
                story_points: None,
                labels: Default::default(),
                created,
            },
        )
    }

    /// Embedding with exactly `dimensions` components in [-1, 1).
    pub fn arb_embedding_vector(dimensions: usize) -> impl Strategy<Value = EmbeddingVector> {
        prop::collection::vec(-1.0f32..1.0f32, dimensions)
            .prop_map(|data| EmbeddingVector::new(data, "arb".to_string()))
    }

    /// Pre-embedded corpus entry of the given dimension.
    pub fn arb_embedded_entry(dimensions: usize) -> impl Strategy<Value = CorpusEntry> {
        (arb_issue_key(), "[a-z ]{1,30}", arb_embedding_vector(dimensions))
            .prop_map(|(source, text, embedding)| CorpusEntry::new(source, text).with_embedding(embedding))
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made records for common scenarios.

    use super::*;
    use chrono::{TimeZone, Utc};

    /// Fixed reference instant used by fixtures.
    pub fn reference_time() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    /// Minimal "To Do" issue with no optional fields and no history.
    pub fn raw_issue(key: &str, summary: &str) -> RawIssue {
        RawIssue {
            key: key.to_string(),
            summary: summary.to_string(),
            status: "To Do".to_string(),
            assignee: None,
            priority: None,
            reporter: None,
            story_points: None,
            labels: Vec::new(),
            created: reference_time(),
            updated: reference_time(),
            histories: Vec::new(),
        }
    }

    pub fn assigned_issue(key: &str, summary: &str, assignee: &str) -> RawIssue {
        RawIssue {
            assignee: Some(assignee.to_string()),
            ..raw_issue(key, summary)
        }
    }

    /// Two-issue sprint: a deploy task and a dark-mode toggle.
    pub fn deploy_and_dark_mode_sprint() -> Vec<RawIssue> {
        vec![
            assigned_issue("SCRUM-1", "Deploy payment service", "Ada"),
            assigned_issue("SCRUM-2", "Add dark mode toggle", "Grace"),
        ]
    }

    pub fn corpus_entry(source: &str, text: &str) -> CorpusEntry {
        CorpusEntry::new(source, text)
    }

    /// Unit vector along `axis`.
    pub fn unit_embedding(dimensions: usize, axis: usize) -> EmbeddingVector {
        let mut data = vec![0.0f32; dimensions];
        if axis < dimensions {
            data[axis] = 1.0;
        }
        EmbeddingVector::new(data, "test-model".to_string())
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for SprintLens error variants.

    use super::*;

    #[track_caller]
    pub fn assert_malformed_input<T: std::fmt::Debug>(result: &LensResult<T>, position: usize) {
        match result {
            Err(LensError::Validation(ValidationError::MalformedInput { position: p, .. })) => {
                assert_eq!(*p, position, "Wrong position in MalformedInput");
            }
            other => panic!("Expected MalformedInput at {}, got: {:?}", position, other),
        }
    }

    #[track_caller]
    pub fn assert_embedding_unavailable<T: std::fmt::Debug>(
        result: &LensResult<T>,
        stage: EmbeddingStage,
    ) {
        match result {
            Err(LensError::Llm(LlmError::EmbeddingUnavailable { stage: s, .. })) => {
                assert_eq!(*s, stage, "Wrong embedding stage");
            }
            other => panic!("Expected EmbeddingUnavailable({}), got: {:?}", stage, other),
        }
    }

    #[track_caller]
    pub fn assert_dimension_mismatch<T: std::fmt::Debug>(
        result: &LensResult<T>,
        expected: i32,
        got: i32,
    ) {
        match result {
            Err(LensError::Vector(VectorError::DimensionMismatch { expected: e, got: g })) => {
                assert_eq!(*e, expected, "Wrong expected dimension");
                assert_eq!(*g, got, "Wrong got dimension");
            }
            other => panic!(
                "Expected DimensionMismatch({}, {}), got: {:?}",
                expected, got, other
            ),
        }
    }

    #[track_caller]
    pub fn assert_source_unavailable<T: std::fmt::Debug>(result: &LensResult<T>) {
        match result {
            Err(LensError::Source(SourceError::Unavailable { .. })) => {}
            other => panic!("Expected source Unavailable, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_config_valid(config: &LensConfig) {
        if let Err(e) = config.validate() {
            panic!("Config should be valid but got: {:?}", e);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_keyword_vectors_share_direction() {
        let provider = KeywordEmbeddingProvider::sprint_vocabulary();
        let a = provider.vectorize("Deploy payment service");
        let b = provider.vectorize("When is the deploy?");
        assert!(a.iter().zip(&b).any(|(x, y)| *x > 0.0 && *y > 0.0));
        assert!(provider.vectorize("nothing relevant").iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_keyword_provider_counts_calls() {
        let provider = KeywordEmbeddingProvider::sprint_vocabulary();
        provider.embed("deploy").await.unwrap();
        provider.embed_batch(&["a", "b"]).await.unwrap();
        assert_eq!(provider.embed_calls(), 1);
        assert_eq!(provider.batch_calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_provider_modes() {
        let corpus = FailingEmbeddingProvider::new(FailureMode::Corpus);
        assert!(corpus.embed_batch(&["a"]).await.is_err());
        assert!(corpus.embed("q").await.is_ok());

        let short = FailingEmbeddingProvider::new(FailureMode::ShortBatch);
        assert_eq!(short.embed_batch(&["a", "b"]).await.unwrap().len(), 1);
        assert_eq!(short.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_completion_records_prompts() {
        let provider = MockCompletionProvider::new();
        let completion = provider.complete("line one\nline two", 42).await.unwrap();
        assert_eq!(completion.text, "Answer: line one");
        assert_eq!(provider.prompts(), vec![("line one\nline two".to_string(), 42)]);
        assert!(MockCompletionProvider::failing().complete("x", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_static_source_defaults_to_no_active_sprint() {
        let source = StaticIssueSource::new();
        let outcome = source.fetch_sprint_issues(1).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Empty(EmptyReason::NoActiveSprint));
    }

    #[tokio::test]
    async fn test_static_source_history_lookup() {
        let source = StaticIssueSource::new().with_sprint(fixtures::deploy_and_dark_mode_sprint());
        assert_eq!(source.fetch_issue_history("SCRUM-2").await.unwrap().key, "SCRUM-2");
        assert!(source.fetch_issue_history("SCRUM-99").await.is_err());
        assert_eq!(source.history_calls(), 2);
    }

    #[test]
    fn test_default_config_is_valid() {
        assertions::assert_config_valid(&LensConfig::default());
    }

    proptest! {
        #[test]
        fn prop_generated_issues_are_well_formed(issue in generators::arb_raw_issue()) {
            prop_assert!(!issue.key.trim().is_empty());
            prop_assert!(!issue.summary.trim().is_empty());
        }

        #[test]
        fn prop_generated_timestamps_parse(text in generators::arb_tracker_timestamp_text()) {
            prop_assert!(sprintlens_core::parse_tracker_timestamp(&text).is_ok());
        }
    }
}
