//! Retriever
//!
//! Embeds the corpus and the query, scores every entry by cosine similarity
//! and keeps the top `k`. Ties keep corpus order; NaN scores rank last.

use sprintlens_core::{
    CorpusEntry, EmbeddingProvider, EmbeddingStage, EmbeddingVector, LensError, LensResult,
    LlmError, RetrievalConfig, VectorError,
};
use std::cmp::Ordering;
use std::sync::Arc;

/// One retrieved corpus entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHit<'a> {
    pub entry: &'a CorpusEntry,
    pub score: f64,
    /// Index of the entry in the corpus.
    pub position: usize,
}

/// Hits in descending score order, at most `k` long.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RetrievalResult<'a> {
    hits: Vec<RetrievalHit<'a>>,
}

impl<'a> RetrievalResult<'a> {
    pub fn new(hits: Vec<RetrievalHit<'a>>) -> Self {
        Self { hits }
    }

    pub fn hits(&self) -> &[RetrievalHit<'a>] {
        &self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RetrievalHit<'a>> {
        self.hits.iter()
    }

    /// Issue keys of the hits, best first.
    pub fn sources(&self) -> Vec<&'a str> {
        self.hits.iter().map(|h| h.entry.source.as_str()).collect()
    }
}

/// Descending by score with NaN after every number.
fn by_score_desc(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Rank an already-embedded corpus against `query`.
///
/// Every entry must carry an embedding of the query's dimension.
pub fn rank<'a>(
    corpus: &'a [CorpusEntry],
    query: &EmbeddingVector,
    k: usize,
    epsilon: f64,
) -> LensResult<RetrievalResult<'a>> {
    if corpus.is_empty() || k == 0 {
        return Ok(RetrievalResult::default());
    }

    let mut scored = Vec::with_capacity(corpus.len());
    for (position, entry) in corpus.iter().enumerate() {
        let embedding = entry.embedding.as_ref().ok_or_else(|| {
            LensError::Vector(VectorError::InvalidVector {
                reason: format!("corpus entry {} has no embedding", entry.source),
            })
        })?;
        let score = query.cosine_similarity(embedding, epsilon)?;
        scored.push(RetrievalHit {
            entry,
            score,
            position,
        });
    }

    // sort_by is stable, so equal scores keep corpus order
    scored.sort_by(|a, b| by_score_desc(a.score, b.score));
    scored.truncate(k);
    Ok(RetrievalResult::new(scored))
}

fn embedding_unavailable(stage: EmbeddingStage, reason: impl Into<String>) -> LensError {
    LensError::Llm(LlmError::EmbeddingUnavailable {
        stage,
        reason: reason.into(),
    })
}

async fn embed_corpus(
    provider: &dyn EmbeddingProvider,
    texts: &[&str],
) -> LensResult<Vec<EmbeddingVector>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    let vectors = provider
        .embed_batch(texts)
        .await
        .map_err(|e| embedding_unavailable(EmbeddingStage::Corpus, e.to_string()))?;
    if vectors.len() != texts.len() {
        return Err(embedding_unavailable(
            EmbeddingStage::Corpus,
            format!("expected {} vectors, got {}", texts.len(), vectors.len()),
        ));
    }
    Ok(vectors)
}

async fn embed_query(provider: &dyn EmbeddingProvider, query: &str) -> LensResult<EmbeddingVector> {
    provider
        .embed(query)
        .await
        .map_err(|e| embedding_unavailable(EmbeddingStage::Query, e.to_string()))
}

/// Embedding-backed top-K retriever.
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: RetrievalConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Top `config.top_k` entries for `query`.
    pub async fn retrieve_top<'a>(
        &self,
        corpus: &'a mut [CorpusEntry],
        query: &str,
    ) -> LensResult<RetrievalResult<'a>> {
        self.retrieve(corpus, query, self.config.top_k).await
    }

    /// Top `k` entries for `query`.
    ///
    /// Entries without an embedding are embedded in one batched call and the
    /// vectors stored on them. An empty corpus or `k == 0` returns an empty
    /// result without calling the provider.
    pub async fn retrieve<'a>(
        &self,
        corpus: &'a mut [CorpusEntry],
        query: &str,
        k: usize,
    ) -> LensResult<RetrievalResult<'a>> {
        if corpus.is_empty() || k == 0 {
            tracing::debug!(corpus = corpus.len(), k, "Nothing to retrieve");
            return Ok(RetrievalResult::default());
        }

        let pending: Vec<usize> = corpus
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.is_embedded())
            .map(|(i, _)| i)
            .collect();

        let (vectors, query_vector) = {
            let texts: Vec<&str> = pending.iter().map(|&i| corpus[i].text.as_str()).collect();
            let provider = self.provider.as_ref();
            let corpus_call = embed_corpus(provider, &texts);
            let query_call = embed_query(provider, query);

            if self.config.concurrent_embedding {
                tokio::try_join!(corpus_call, query_call)?
            } else {
                let vectors = corpus_call.await?;
                (vectors, query_call.await?)
            }
        };

        for (&i, vector) in pending.iter().zip(vectors) {
            corpus[i].embedding = Some(vector);
        }

        let corpus: &'a [CorpusEntry] = corpus;
        let result = rank(corpus, &query_vector, k, self.config.epsilon)?;
        tracing::debug!(
            corpus = corpus.len(),
            embedded = pending.len(),
            k,
            hits = result.len(),
            top_score = ?result.hits().first().map(|h| h.score),
            "Retrieval complete"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("model", &self.provider.model_id())
            .field("config", &self.config)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
