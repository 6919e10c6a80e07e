//! OpenAI provider implementation
//!
//! Embeddings via `/embeddings`, completions via `/chat/completions`.

pub mod client;
pub mod completion;
pub mod embedding;
pub mod types;

pub use client::OpenAIClient;
pub use completion::OpenAICompletionProvider;
pub use embedding::OpenAIEmbeddingProvider;
