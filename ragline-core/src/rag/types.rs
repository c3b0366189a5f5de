use serde::{Deserialize, Serialize};

/// A document held by the vector index.
///
/// Documents are the unit of retrieval. The vector is L2-normalized when the
/// index is built and never changes afterwards.
///
/// # Example
///
/// ```
/// use ragline_core::rag::Document;
///
/// let doc = Document::new("doc_00001", "Hello world", vec![0.1, 0.2, 0.3]);
/// assert_eq!(doc.id, "doc_00001");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing)]
    #[serde(default)]
    pub vector: Vec<f32>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            vector,
        }
    }
}

/// A document together with its similarity to the query.
///
/// # Score Range
///
/// Cosine similarity of normalized vectors, from `-1.0` (opposite) to `1.0`
/// (identical).
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

/// One record of the persisted index (`metadata.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub doc_id: String,
    pub text: String,
    pub vector: Vec<f32>,
}

impl From<IndexRecord> for Document {
    fn from(record: IndexRecord) -> Self {
        Document::new(record.doc_id, record.text, record.vector)
    }
}
