//! OpenAI chat-completion provider

use super::client::OpenAIClient;
use super::types::{CompletionRequest, CompletionResponse, Message};
use crate::providers::invalid_response;
use crate::UsageTracker;
use async_trait::async_trait;
use sprintlens_core::{Completion, CompletionProvider, LensResult, TokenUsage};
use std::sync::Arc;

/// OpenAI completion provider using GPT chat models.
///
/// The whole prompt is sent as a single system message.
pub struct OpenAICompletionProvider {
    client: OpenAIClient,
    model: String,
    temperature: Option<f32>,
    usage: Option<Arc<UsageTracker>>,
}

impl OpenAICompletionProvider {
    /// Create a new OpenAI completion provider.
    ///
    /// # Arguments
    /// * `client` - Configured OpenAI client
    /// * `model` - Model name (e.g., "gpt-4o-mini", "gpt-4o")
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: None,
            usage: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_usage_tracker(mut self, usage: Arc<UsageTracker>) -> Self {
        self.usage = Some(usage);
        self
    }

    fn build_request(&self, prompt: &str, max_tokens: u32) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::system(prompt)],
            max_tokens: Some(max_tokens),
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAICompletionProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> LensResult<Completion> {
        let request = self.build_request(prompt, max_tokens);
        let response: CompletionResponse =
            self.client.request("chat/completions", &request).await?;

        let usage = response.usage.as_ref().map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens.unwrap_or(0),
        });
        if let (Some(usage), Some(tracker)) = (usage, &self.usage) {
            tracker.record_completion(usage.prompt_tokens, usage.completion_tokens);
        }

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| invalid_response("openai", "No completion in response"))?;

        Ok(Completion {
            text: text.trim().to_string(),
            model_id: response.model.unwrap_or_else(|| self.model.clone()),
            usage,
        })
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for OpenAICompletionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAICompletionProvider")
            .field("model", &self.model)
            .finish()
    }
}
