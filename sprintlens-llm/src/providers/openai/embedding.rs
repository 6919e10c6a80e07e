//! OpenAI embedding provider implementation

use super::client::OpenAIClient;
use super::types::{EmbeddingData, EmbeddingRequest, EmbeddingResponse};
use crate::providers::invalid_response;
use crate::UsageTracker;
use async_trait::async_trait;
use sprintlens_core::{EmbeddingProvider, EmbeddingVector, LensResult};
use std::sync::Arc;

/// Most inputs the embeddings endpoint accepts in one request.
pub const MAX_BATCH_INPUTS: usize = 2048;

/// OpenAI embedding provider using text-embedding-ada-002 or a custom model.
pub struct OpenAIEmbeddingProvider {
    client: OpenAIClient,
    model: String,
    dimensions: Option<i32>,
    usage: Option<Arc<UsageTracker>>,
}

impl OpenAIEmbeddingProvider {
    /// Create a new OpenAI embedding provider.
    ///
    /// # Arguments
    /// * `client` - Configured OpenAI client
    /// * `model` - Model name (e.g., "text-embedding-ada-002")
    /// * `dimensions` - Requested dimensions; only newer models accept this
    pub fn new(client: OpenAIClient, model: impl Into<String>, dimensions: Option<i32>) -> Self {
        Self {
            client,
            model: model.into(),
            dimensions,
            usage: None,
        }
    }

    pub fn with_usage_tracker(mut self, usage: Arc<UsageTracker>) -> Self {
        self.usage = Some(usage);
        self
    }

    async fn embed_chunk(&self, texts: &[&str]) -> LensResult<Vec<EmbeddingVector>> {
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: texts.iter().map(|s| s.to_string()).collect(),
            dimensions: self.dimensions,
        };

        let response: EmbeddingResponse = self.client.request("embeddings", &request).await?;

        if let (Some(usage), Some(tracker)) = (&response.usage, &self.usage) {
            tracker.record_embedding(usage.total_tokens);
        }

        order_by_index(response.data, texts.len(), &self.model)
    }
}

/// Place each returned vector at its `index`; every slot must be filled once.
pub(crate) fn order_by_index(
    data: Vec<EmbeddingData>,
    expected: usize,
    model: &str,
) -> LensResult<Vec<EmbeddingVector>> {
    if data.len() != expected {
        return Err(invalid_response(
            "openai",
            format!("Expected {} embeddings but got {}", expected, data.len()),
        ));
    }

    let mut slots: Vec<Option<EmbeddingVector>> = vec![None; expected];
    for item in data {
        let slot = slots.get_mut(item.index).ok_or_else(|| {
            invalid_response("openai", format!("Embedding index {} out of range", item.index))
        })?;
        if slot.is_some() {
            return Err(invalid_response(
                "openai",
                format!("Duplicate embedding index {}", item.index),
            ));
        }
        *slot = Some(EmbeddingVector::new(item.embedding, model.to_string()));
    }

    slots
        .into_iter()
        .map(|slot| slot.ok_or_else(|| invalid_response("openai", "Missing embedding index")))
        .collect()
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> LensResult<EmbeddingVector> {
        self.embed_chunk(&[text])
            .await?
            .pop()
            .ok_or_else(|| invalid_response("openai", "No embedding data in response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> LensResult<Vec<EmbeddingVector>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH_INPUTS) {
            embeddings.extend(self.embed_chunk(chunk).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> Option<i32> {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for OpenAIEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIEmbeddingProvider")
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}
