//! Example store: embedded feature descriptions and their test cases

mod index;
mod record;

pub use index::ExampleStore;
pub use record::{ExampleId, ExampleRecord, MAX_SLUG_LEN};

use crate::embedding::{self, EmbeddingBackend, EmbeddingError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("example store unavailable: {0}")]
    Unavailable(String),

    #[error("example already stored: {0}")]
    DuplicateId(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// What `add` does when the id is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail with `StoreError::DuplicateId`, leaving the stored record untouched.
    #[default]
    Reject,
    /// Replace payload and embedding, keeping the original insertion slot.
    Overwrite,
}

/// One query result.
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub record: ExampleRecord,
    /// Cosine similarity to the query, in [-1, 1].
    pub score: f32,
}

impl ExampleStore {
    /// Load the embedding backend and create an empty store over it.
    ///
    /// Fails with `StoreError::Unavailable` if the backend cannot be
    /// initialized.
    pub fn open(backend: EmbeddingBackend, max_chars: usize) -> StoreResult<Self> {
        let embedder = embedding::load(backend, max_chars)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self::new(embedder))
    }
}

/// Cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_correct() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6, "identical vectors");

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 1e-6, "orthogonal vectors");

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 1e-6, "opposite vectors");
    }

    #[test]
    fn cosine_similarity_zero_vector() {
        let a = vec![1.0, 0.0, 0.0];
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &zero), 0.0);
    }

    #[test]
    fn open_hashing_backend() {
        let store = ExampleStore::open(EmbeddingBackend::Hashing, 100).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.embedder().max_chars(), 100);
    }

    #[cfg(not(feature = "embeddings"))]
    #[test]
    fn open_unavailable_backend_reports_store_unavailable() {
        let err = ExampleStore::open(EmbeddingBackend::Fastembed, 100).err().unwrap();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
