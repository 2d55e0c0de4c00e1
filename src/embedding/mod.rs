//! Embedding providers: map text to fixed-length vectors.
//!
//! The `Embedder` trait is the seam between the example store and whatever
//! model produces vectors. Two backends ship with the crate:
//! - `HashingEmbedder`: deterministic feature hashing, no model download
//! - `FastEmbedEmbedder`: all-MiniLM-L6-v2 via ONNX Runtime (`embeddings` feature)
//!
//! Input longer than the provider's character limit is rejected with
//! `EmbeddingError::TextTooLong`; nothing is truncated silently.

mod hashing;

pub use hashing::HashingEmbedder;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Default input limit, in characters.
pub const DEFAULT_MAX_CHARS: usize = 8192;

/// Error type for embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("text too long to embed: {len} characters (limit {max})")]
    TextTooLong { len: usize, max: usize },

    #[error("embedding returned no results")]
    EmptyResult,

    #[error("embedding model error: {0}")]
    ModelError(String),
}

/// Trait for embedding text into vectors.
///
/// Implementations must be deterministic: the same text always maps to the
/// same vector. Calls may happen concurrently from several threads once the
/// model is loaded.
pub trait Embedder: Send + Sync {
    /// Identifier of the underlying model.
    fn model_name(&self) -> &str;

    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;

    /// Longest accepted input, in characters.
    fn max_chars(&self) -> usize {
        DEFAULT_MAX_CHARS
    }

    /// Embed a batch of texts, returning one vector per text.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single text, enforcing the length limit.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        check_length(text, self.max_chars())?;
        self.embed_batch(&[text])?
            .pop()
            .ok_or(EmbeddingError::EmptyResult)
    }
}

/// Reject text longer than `max` characters.
pub fn check_length(text: &str, max: usize) -> Result<(), EmbeddingError> {
    let len = text.chars().count();
    if len > max {
        return Err(EmbeddingError::TextTooLong { len, max });
    }
    Ok(())
}

/// Which embedding implementation to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Lexical feature hashing; works in every build.
    #[default]
    Hashing,
    /// Pretrained all-MiniLM-L6-v2; requires the `embeddings` feature.
    Fastembed,
}

/// Construct the embedder for `backend`.
///
/// Model loading happens here, once; the returned handle is shared by every
/// caller afterwards.
pub fn load(
    backend: EmbeddingBackend,
    max_chars: usize,
) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match backend {
        EmbeddingBackend::Hashing => Ok(Arc::new(
            HashingEmbedder::default().with_max_chars(max_chars),
        )),
        #[cfg(feature = "embeddings")]
        EmbeddingBackend::Fastembed => Ok(Arc::new(
            FastEmbedEmbedder::default_model()?.with_max_chars(max_chars),
        )),
        #[cfg(not(feature = "embeddings"))]
        EmbeddingBackend::Fastembed => Err(EmbeddingError::ModelError(
            "built without the `embeddings` feature".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// FastEmbedEmbedder: production embedder behind `embeddings` feature
// ---------------------------------------------------------------------------

#[cfg(feature = "embeddings")]
mod fastembed_impl {
    use super::{check_length, Embedder, EmbeddingError, DEFAULT_MAX_CHARS};
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::sync::Mutex;

    /// Production embedder backed by fastembed (ONNX Runtime).
    ///
    /// Wraps `fastembed::TextEmbedding` in a `Mutex` because its `embed`
    /// method requires `&mut self`, while the `Embedder` trait uses `&self`.
    pub struct FastEmbedEmbedder {
        model: Mutex<TextEmbedding>,
        name: String,
        dimension: usize,
        max_chars: usize,
    }

    impl FastEmbedEmbedder {
        /// Load a specific model. Downloads weights on first use.
        pub fn new(
            model: EmbeddingModel,
            name: &str,
            dimension: usize,
        ) -> Result<Self, EmbeddingError> {
            let options = InitOptions::new(model).with_show_download_progress(false);
            let embedding = TextEmbedding::try_new(options)
                .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;
            Ok(Self {
                model: Mutex::new(embedding),
                name: name.to_string(),
                dimension,
                max_chars: DEFAULT_MAX_CHARS,
            })
        }

        /// all-MiniLM-L6-v2, 384 dimensions.
        pub fn default_model() -> Result<Self, EmbeddingError> {
            Self::new(EmbeddingModel::AllMiniLML6V2, "all-MiniLM-L6-v2", 384)
        }

        pub fn with_max_chars(mut self, max_chars: usize) -> Self {
            self.max_chars = max_chars;
            self
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn model_name(&self) -> &str {
            &self.name
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn max_chars(&self) -> usize {
            self.max_chars
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            for text in texts {
                check_length(text, self.max_chars)?;
            }
            let mut model = self
                .model
                .lock()
                .map_err(|_| EmbeddingError::ModelError("model lock poisoned".to_string()))?;
            let embeddings = model
                .embed(texts.to_vec(), None)
                .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;
            if embeddings.is_empty() {
                return Err(EmbeddingError::EmptyResult);
            }
            Ok(embeddings)
        }
    }
}

#[cfg(feature = "embeddings")]
pub use fastembed_impl::FastEmbedEmbedder;
