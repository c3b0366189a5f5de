//! Query embedding through a model provider.

use crate::provider::{Provider, ProviderError};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during embedding generation.
#[derive(Debug, Error)]
pub enum EmbedderError {
    /// The provider API returned an error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The provider returned a vector with no components.
    #[error("No embeddings returned")]
    NoEmbeddings,

    /// The provider returned NaN or infinite components.
    #[error("Embedding contains non-finite values")]
    NonFinite,
}

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedderError>;

/// Converts query text into a vector with a fixed embedding model.
///
/// The model must be the one the index vectors were produced with; the
/// retriever rejects vectors whose dimension disagrees with the index.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl Embedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generates a vector embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails or yields an empty or
    /// non-finite vector.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.provider.embed(text, &self.model).await?;
        if vector.is_empty() {
            return Err(EmbedderError::NoEmbeddings);
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(EmbedderError::NonFinite);
        }
        Ok(vector)
    }
}
