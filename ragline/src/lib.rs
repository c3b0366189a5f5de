//! ragline - Grounded question answering over a prebuilt vector index
//!
//! This is the convenience wrapper crate that re-exports the ragline core.
//!
//! # Quick Start
//!
//! ```toml
//! [dependencies]
//! ragline = "0.1"
//! ```
//!
//! ```no_run
//! use ragline::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_default();
//! let index = Arc::new(VectorIndex::load_dir(&config.index.path)?);
//! let ollama: Arc<dyn Provider> = Arc::new(OllamaProvider::new(&config.llm.base_url));
//!
//! let retriever = Retriever::new(index, Embedder::new(ollama.clone(), &config.embedding.model));
//! let orchestrator = Orchestrator::new(retriever, ollama, config.llm.clone());
//!
//! let answer = orchestrator
//!     .answer("What does the report conclude?", &AnswerOptions::from_config(&config))
//!     .await?;
//! println!("{}", answer.answer);
//! # Ok(())
//! # }
//! ```

// Re-export core
pub use ragline_core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use ragline_core::rag::{RelevanceScorer, ScoredDocument};
    pub use ragline_core::*;
}
