//! Question-to-documents retrieval over a [`VectorIndex`].

use super::embedder::{Embedder, EmbedderError};
use super::index::{IndexError, Matrix, VectorIndex};
use super::mmr;
use super::types::ScoredDocument;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Errors raised for a single retrieval.
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbedderError),

    /// The query vector does not fit the index.
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("Retrieval cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, RetrieveError>;

/// How retrieved documents are ranked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetrievalMode {
    /// Top-k by descending cosine similarity
    Similarity,
    /// Maximal marginal relevance with weight `lambda` on query relevance
    Mmr { lambda: f32 },
}

impl RetrievalMode {
    /// MMR mode, rejecting `lambda` outside `[0, 1]`.
    pub fn mmr(lambda: f32) -> Result<Self> {
        let mode = RetrievalMode::Mmr { lambda };
        mode.validate()?;
        Ok(mode)
    }

    /// Picks the mode from the flat `use_mmr` / `mmr_diversity` options.
    pub fn from_options(use_mmr: bool, mmr_diversity: f32) -> Result<Self> {
        if use_mmr {
            Self::mmr(mmr_diversity)
        } else {
            Ok(RetrievalMode::Similarity)
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            RetrievalMode::Similarity => Ok(()),
            RetrievalMode::Mmr { lambda } if (0.0..=1.0).contains(&lambda) => Ok(()),
            RetrievalMode::Mmr { lambda } => Err(RetrieveError::InvalidQuery(format!(
                "MMR diversity must be within [0, 1], got {}",
                lambda
            ))),
        }
    }
}

/// A validated retrieval request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalQuery {
    text: String,
    k: usize,
    mode: RetrievalMode,
}

impl RetrievalQuery {
    /// # Errors
    ///
    /// [`RetrieveError::InvalidQuery`] when `k == 0` or the MMR weight is out
    /// of range.
    pub fn new(text: impl Into<String>, k: usize, mode: RetrievalMode) -> Result<Self> {
        if k == 0 {
            return Err(RetrieveError::InvalidQuery("k must be at least 1".to_string()));
        }
        mode.validate()?;
        Ok(Self {
            text: text.into(),
            k,
            mode,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn mode(&self) -> RetrievalMode {
        self.mode
    }

    /// Same settings, different text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }
}

/// Embeds questions and ranks the index against them.
///
/// Cheap to clone; the index is shared.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Embedder,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, embedder: Embedder) -> Self {
        Self { index, embedder }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Retrieves up to `k` documents for the query.
    pub async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<ScoredDocument>> {
        self.retrieve_with_cancel(query, &CancellationToken::new()).await
    }

    /// Like [`retrieve`](Self::retrieve), aborting the embedding call when
    /// `cancel` fires.
    ///
    /// # Arguments
    ///
    /// * `query` - Validated question text, `k` and ranking mode
    /// * `cancel` - Token that aborts the pending embedding call
    ///
    /// # Returns
    ///
    /// At most `k` scored documents. Similarity mode orders them by
    /// descending score with ties in index order; MMR mode keeps selection
    /// order.
    ///
    /// # Errors
    ///
    /// Fails when embedding fails, when the query vector does not fit the
    /// index, or when `cancel` fires first.
    pub async fn retrieve_with_cancel(
        &self,
        query: &RetrievalQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<ScoredDocument>> {
        let vector = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetrieveError::Cancelled),
            result = self.embedder.embed(query.text()) => result?,
        };

        let scores = self.index.score(&vector)?;
        let order = rank(&scores, self.index.matrix(), query.k(), query.mode());

        let results: Vec<ScoredDocument> = order
            .into_iter()
            .map(|i| ScoredDocument {
                document: self.index.document(i).clone(),
                score: scores[i],
            })
            .collect();

        debug!(
            query = %query.text(),
            mode = ?query.mode(),
            k = query.k(),
            returned = results.len(),
            top_score = results.first().map(|r| r.score),
            "Retrieved documents"
        );

        Ok(results)
    }
}

/// Orders index rows for `mode`, returning at most `k` row indices.
pub fn rank(scores: &[f32], vectors: &Matrix, k: usize, mode: RetrievalMode) -> Vec<usize> {
    match mode {
        RetrievalMode::Similarity => top_k(scores, k),
        RetrievalMode::Mmr { lambda } => mmr::select(scores, vectors, k, lambda),
    }
}

/// Indices of the `k` highest scores, descending; equal scores keep index order.
pub fn top_k(scores: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    // Stable sort keeps ties in index order
    order.sort_by(|&a, &b| sort_key(scores[b]).total_cmp(&sort_key(scores[a])));
    order.truncate(k);
    order
}

/// Folds -0.0 into 0.0 and sinks NaN so `total_cmp` agrees with `==` on ties.
fn sort_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score + 0.0
    }
}
