//! Exact in-memory vector index.
//!
//! The index holds every document vector as a row of a dense, row-major
//! matrix. Rows are L2-normalized once at construction, so cosine similarity
//! against a normalized query is a plain dot product. Search is a linear scan;
//! there is no approximate structure.

use super::types::{Document, IndexRecord};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Added to every norm before dividing, so all-zero vectors stay zero
/// instead of turning into NaN.
pub const NORM_EPSILON: f64 = 1e-10;

/// File name of the persisted index inside an index directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Errors raised while building or querying the index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Index contains no documents")]
    EmptyIndex,

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Failed to read index: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// Returns `v / (||v|| + ε)`.
///
/// The norm is accumulated in `f64` so large finite components cannot
/// overflow it.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt();
    v.iter()
        .map(|&x| (f64::from(x) / (norm + NORM_EPSILON)) as f32)
        .collect()
}

/// Dot product of two equal-length slices.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Dense row-major `[rows × cols]` matrix of normalized vectors.
#[derive(Debug, Clone)]
pub struct Matrix {
    data: Vec<f32>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Builds a matrix from rows that all have length `cols`.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a [f32]>, cols: usize) -> Self {
        let mut data = Vec::new();
        let mut count = 0;
        for row in rows {
            debug_assert_eq!(row.len(), cols);
            data.extend_from_slice(row);
            count += 1;
        }
        Self {
            data,
            rows: count,
            cols,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Cosine similarity between two rows.
    pub fn similarity(&self, i: usize, j: usize) -> f32 {
        dot(self.row(i), self.row(j))
    }
}

/// Immutable collection of documents and their normalized vectors.
///
/// Built once and then only read, so it can be shared between any number of
/// concurrent queries behind an `Arc` without locking. Rebuilding means
/// constructing a new instance.
///
/// # Example
///
/// ```
/// use ragline_core::rag::{Document, VectorIndex};
///
/// let index = VectorIndex::load(vec![
///     Document::new("a", "cats", vec![2.0, 0.0]),
///     Document::new("b", "dogs", vec![0.0, 3.0]),
/// ]).unwrap();
///
/// let scores = index.score(&[1.0, 0.0]).unwrap();
/// assert!((scores[0] - 1.0).abs() < 1e-6);
/// assert!(scores[1].abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct VectorIndex {
    documents: Vec<Document>,
    matrix: Matrix,
}

impl VectorIndex {
    /// Builds an index, normalizing every vector.
    ///
    /// # Errors
    ///
    /// - [`IndexError::EmptyIndex`] when `documents` is empty
    /// - [`IndexError::DimensionMismatch`] when vector lengths disagree
    /// - [`IndexError::CorruptIndex`] when vectors are zero-length or hold
    ///   non-finite values
    pub fn load(documents: Vec<Document>) -> Result<Self> {
        let dim = match documents.first() {
            Some(first) => first.vector.len(),
            None => return Err(IndexError::EmptyIndex),
        };
        if dim == 0 {
            return Err(IndexError::CorruptIndex("vectors have zero dimension".to_string()));
        }

        let mut normalized = Vec::with_capacity(documents.len());
        for doc in documents {
            if doc.vector.len() != dim {
                return Err(IndexError::DimensionMismatch {
                    expected: dim,
                    found: doc.vector.len(),
                });
            }
            if doc.vector.iter().any(|x| !x.is_finite()) {
                return Err(IndexError::CorruptIndex(format!(
                    "document {} has non-finite vector components",
                    doc.id
                )));
            }
            let vector = normalize(&doc.vector);
            normalized.push(Document { vector, ..doc });
        }

        let matrix = Matrix::from_rows(normalized.iter().map(|d| d.vector.as_slice()), dim);
        debug!(documents = matrix.rows(), dim, "Built vector index");

        Ok(Self {
            documents: normalized,
            matrix,
        })
    }

    /// Builds an index from persisted records.
    ///
    /// Unlike [`load`](Self::load), disagreeing dimensions are reported as
    /// [`IndexError::CorruptIndex`] naming the offending record.
    pub fn from_records(records: Vec<IndexRecord>) -> Result<Self> {
        if let Some(first) = records.first() {
            let dim = first.vector.len();
            if let Some((pos, bad)) = records
                .iter()
                .enumerate()
                .find(|(_, r)| r.vector.len() != dim)
            {
                return Err(IndexError::CorruptIndex(format!(
                    "record {} ({}) has dimension {}, expected {}",
                    pos,
                    bad.doc_id,
                    bad.vector.len(),
                    dim
                )));
            }
        }

        Self::load(records.into_iter().map(Document::from).collect())
    }

    /// Parses the JSON record list of a persisted index.
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<IndexRecord> =
            serde_json::from_str(json).map_err(|e| IndexError::CorruptIndex(e.to_string()))?;
        Self::from_records(records)
    }

    /// Loads `<dir>/metadata.json`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(METADATA_FILE);
        let contents = fs::read_to_string(&path)?;
        let index = Self::from_json(&contents)?;
        info!(path = %path.display(), documents = index.len(), dim = index.dim(), "Loaded index");
        Ok(index)
    }

    /// Cosine similarity of `query` against every document, in index order.
    ///
    /// The query is normalized the same way the rows were.
    pub fn score(&self, query: &[f32]) -> Result<Vec<f32>> {
        if query.len() != self.dim() {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim(),
                found: query.len(),
            });
        }

        let query = normalize(query);
        Ok((0..self.matrix.rows())
            .map(|i| dot(self.matrix.row(i), &query))
            .collect())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Always false for a successfully built index.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.matrix.cols()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, i: usize) -> &Document {
        &self.documents[i]
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }
}
