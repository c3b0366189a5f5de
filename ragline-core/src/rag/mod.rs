//! Retrieval Augmented Generation (RAG) core.
//!
//! This module answers questions over a prebuilt, in-memory vector index,
//! grounding the generated answer in retrieved documents.
//!
//! # Architecture
//!
//! - [`VectorIndex`]: immutable document set with L2-normalized vectors
//! - [`Retriever`]: embeds a question and ranks the index by cosine
//!   similarity or by maximal marginal relevance ([`mmr`])
//! - [`RelevanceGate`]: decides whether the retrieved context is thin enough
//!   to warrant another, broader retrieval round
//! - [`PromptTemplates`]: picks a prompt template from keywords in the question
//! - [`Orchestrator`]: the bounded state machine tying these together
//!
//! # How It Works
//!
//! 1. **Keyword detection**: registered keywords found in the question are
//!    recorded; the first one selects the prompt template
//! 2. **Retrieval**: the question is embedded and the top-k documents
//!    (similarity or MMR) are kept, capped at `max_context_docs`
//! 3. **Relevance check** (branching only): thin context triggers a
//!    re-retrieval with a broadened question, at most `max_reretrieves` times
//! 4. **Generation**: documents are rendered as labeled context and the
//!    generation backend produces the answer
//!
//! The index is loaded once and shared read-only; every query carries its
//! own [`RagState`], so any number of questions may run concurrently.

mod context;
mod embedder;
pub mod eval;
mod index;
pub mod mmr;
mod orchestrator;
mod prompt;
mod relevance;
mod retriever;
mod types;

#[cfg(test)]
mod testing;

pub use context::{format_context, preview_documents, NO_DOCUMENTS_CONTEXT};
pub use embedder::{Embedder, EmbedderError};
pub use eval::{load_validation_set, recall_at_k, EvalError, QaExample};
pub use index::{IndexError, Matrix, VectorIndex};
pub use orchestrator::{
    check_relevance, detect_keywords, Answer, AnswerError, AnswerOptions, Orchestrator, RagState,
    Stage, RERETRIEVE_MARKER,
};
pub use prompt::{build_prompt, PromptSelection, PromptTemplates, DEFAULT_INSTRUCTION};
pub use relevance::{LengthScorer, RelevanceDecision, RelevanceGate, RelevanceScorer};
pub use retriever::{rank, top_k, RetrievalMode, RetrievalQuery, RetrieveError, Retriever};
pub use types::{Document, IndexRecord, ScoredDocument};
