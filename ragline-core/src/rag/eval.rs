//! Recall@k evaluation against a question/answer validation set.

use super::retriever::{RetrievalMode, RetrievalQuery, RetrieveError, Retriever};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Failed to read validation set: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse validation set: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Retrieve(#[from] RetrieveError),
}

pub type Result<T> = std::result::Result<T, EvalError>;

/// One validation question with the answer text expected in the context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaExample {
    pub question: String,
    pub answer: String,
}

/// Reads a JSON array of `{question, answer}` objects.
pub fn load_validation_set<P: AsRef<Path>>(path: P) -> Result<Vec<QaExample>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Computes Recall@k over a validation set.
///
/// # Arguments
///
/// * `retriever` - Retriever to evaluate, always used in similarity mode
/// * `examples` - Questions with the answer text expected in the context
/// * `k` - Number of documents retrieved per question
///
/// # Returns
///
/// The fraction of examples whose answer occurs verbatim in the text of
/// their top-`k` results. An empty set scores 0.
pub async fn recall_at_k(retriever: &Retriever, examples: &[QaExample], k: usize) -> Result<f32> {
    if examples.is_empty() {
        return Ok(0.0);
    }

    let mut hits = 0usize;
    for example in examples {
        let query = RetrievalQuery::new(&example.question, k, RetrievalMode::Similarity)?;
        let results = retriever.retrieve(&query).await?;
        let context = results
            .iter()
            .map(|r| r.document.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let hit = context.contains(example.answer.as_str());
        debug!(question = %example.question, hit, "Evaluated example");
        if hit {
            hits += 1;
        }
    }

    let recall = hits as f32 / examples.len() as f32;
    info!(hits, total = examples.len(), k, recall, "Recall@k computed");
    Ok(recall)
}
