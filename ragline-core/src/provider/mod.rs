//! Model provider abstraction layer.
//!
//! This module defines a common interface for embedding and generation
//! backends. The retrieval core depends only on the [`Provider`] trait.

mod types;
pub mod ollama;

// Re-export common types
pub use types::{
    EmbedRequest,
    EmbedResponse,
    GenerateRequest,
    Provider,
    ProviderError,
    Result,
};

// Re-export provider implementations
pub use ollama::OllamaProvider;
