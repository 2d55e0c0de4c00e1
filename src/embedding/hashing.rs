//! Deterministic feature-hashing embedder.
//!
//! Lowercased word tokens and their character trigrams are hashed into a
//! fixed number of buckets with a sign bit, then L2-normalized. Texts that
//! share vocabulary land close together under cosine similarity. Needs no
//! model files, so it backs tests and offline runs.

use super::{check_length, Embedder, EmbeddingError, DEFAULT_MAX_CHARS};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Dimension matching all-MiniLM-L6-v2, so either backend fits the same store.
pub const DEFAULT_DIMENSION: usize = 384;

/// Trigram features count for less than whole words.
const TRIGRAM_WEIGHT: f32 = 0.5;

pub struct HashingEmbedder {
    dimension: usize,
    max_chars: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            max_chars: DEFAULT_MAX_CHARS,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokens(text) {
            self.accumulate(&mut vector, "w", &token, 1.0);
            let padded: Vec<char> = format!("^{}$", token).chars().collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                self.accumulate(&mut vector, "g", &gram, TRIGRAM_WEIGHT);
            }
        }
        normalize(&mut vector);
        vector
    }

    fn accumulate(&self, vector: &mut [f32], kind: &str, feature: &str, weight: f32) {
        let mut hasher = DefaultHasher::new();
        kind.hash(&mut hasher);
        feature.hash(&mut hasher);
        let h = hasher.finish();
        let bucket = (h % self.dimension as u64) as usize;
        let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        "feature-hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_chars(&self) -> usize {
        self.max_chars
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts
            .iter()
            .map(|text| {
                check_length(text, self.max_chars)?;
                Ok(self.vectorize(text))
            })
            .collect()
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}
