//! Relevance gate deciding whether retrieved context is worth a second look.
//!
//! The gate does no semantic scoring. The default [`LengthScorer`] treats short
//! documents as thin context; any other heuristic can be plugged in through
//! [`RelevanceScorer`].

use super::types::Document;
use std::sync::Arc;

/// Scores a retrieved document set in `[0, 1]`.
pub trait RelevanceScorer: Send + Sync {
    /// Only called with a non-empty slice.
    fn score(&self, documents: &[Document]) -> f32;
}

/// `min(mean character length / saturation_chars, 1.0)`.
#[derive(Debug, Clone, Copy)]
pub struct LengthScorer {
    pub saturation_chars: f32,
}

impl Default for LengthScorer {
    fn default() -> Self {
        Self {
            saturation_chars: 100.0,
        }
    }
}

impl RelevanceScorer for LengthScorer {
    fn score(&self, documents: &[Document]) -> f32 {
        let total: usize = documents.iter().map(|d| d.text.chars().count()).sum();
        let avg_len = total as f32 / documents.len() as f32;
        (avg_len / self.saturation_chars).min(1.0)
    }
}

/// Outcome of a relevance check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceDecision {
    /// `None` when there was nothing to score
    pub relevance: Option<f32>,
    pub needs_reretrieve: bool,
}

/// Decides between re-retrieving and generating.
#[derive(Clone)]
pub struct RelevanceGate {
    scorer: Arc<dyn RelevanceScorer>,
    threshold: f32,
    max_reretrieves: usize,
}

impl RelevanceGate {
    pub fn new(scorer: Arc<dyn RelevanceScorer>, threshold: f32, max_reretrieves: usize) -> Self {
        Self {
            scorer,
            threshold,
            max_reretrieves,
        }
    }

    /// Gate with the default length heuristic.
    pub fn with_length_scorer(threshold: f32, max_reretrieves: usize) -> Self {
        Self::new(Arc::new(LengthScorer::default()), threshold, max_reretrieves)
    }

    pub fn max_reretrieves(&self) -> usize {
        self.max_reretrieves
    }

    /// `reretrieves_done` counts re-retrievals already performed, not
    /// retrieval rounds. Re-retrieval is requested only while the score is at
    /// or below the threshold and the bound has not been reached. An empty
    /// document set never asks for another round.
    pub fn assess(&self, documents: &[Document], reretrieves_done: usize) -> RelevanceDecision {
        if documents.is_empty() {
            return RelevanceDecision {
                relevance: None,
                needs_reretrieve: false,
            };
        }

        let relevance = self.scorer.score(documents);
        RelevanceDecision {
            relevance: Some(relevance),
            needs_reretrieve: relevance <= self.threshold && reretrieves_done < self.max_reretrieves,
        }
    }
}
