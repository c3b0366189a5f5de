//! ragline-core - Retrieval and answer orchestration engine
//!
//! Provides the building blocks for answering questions over a prebuilt
//! vector index:
//! - Model provider abstraction (Ollama embeddings and generation)
//! - Vector index, similarity and MMR retrieval
//! - Relevance-gated re-retrieval and keyword prompt selection
//! - Configuration management
//!
//! ## Primary API
//!
//! Most callers build an [`Orchestrator`] and call
//! [`Orchestrator::answer`] with [`AnswerOptions`] derived from the [`Config`].

// Public modules
pub mod config;
pub mod provider;
pub mod rag;

// Public exports
pub use config::{Config, ConfigError, KeywordPrompt};
pub use rag::{
    Answer, AnswerError, AnswerOptions, Document, Embedder, Orchestrator, RetrievalMode,
    RetrievalQuery, Retriever, VectorIndex,
};

// Provider exports
pub use provider::{GenerateRequest, OllamaProvider, Provider, ProviderError};
