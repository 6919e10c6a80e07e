//! SprintLens Context
//!
//! Everything between tracker summaries and the completion prompt:
//! corpus building, embedding retrieval, context assembly and the
//! feature prompt templates.

pub mod assemble;
pub mod corpus;
pub mod prompt;
pub mod retrieve;

pub use assemble::{assemble, estimate_tokens, truncate_entries, truncate_to_token_budget};
pub use corpus::build_corpus;
pub use prompt::{feature_prompt, qa_prompt, triage_prompt, PromptData};
pub use retrieve::{rank, RetrievalHit, RetrievalResult, Retriever};
