//! Example records and identifier derivation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Prefix for ids derived from user-supplied features.
const ID_PREFIX: &str = "user-";

/// Upper bound on the slug part of a derived id.
pub const MAX_SLUG_LEN: usize = 120;

/// Unique key of an example within a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExampleId(String);

impl ExampleId {
    /// Use a caller-supplied key as-is.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Derive an id from the full feature text.
    ///
    /// The slug is lowercase with whitespace runs collapsed to a single `-`.
    /// When slugging drops anything beyond case and whitespace (punctuation,
    /// symbols, non-ASCII letters), or the slug is longer than
    /// `MAX_SLUG_LEN`, it is suffixed with a hash of the normalized text so
    /// distinct features keep distinct ids.
    pub fn from_feature(feature_text: &str) -> Self {
        let (slug, lossless) = slugify(feature_text);
        if lossless && !slug.is_empty() && slug.len() <= MAX_SLUG_LEN {
            return Self(format!("{}{}", ID_PREFIX, slug));
        }

        let hash = stable_hash(&normalize(feature_text));
        // slug is ASCII, so byte slicing is safe
        let head = slug[..slug.len().min(MAX_SLUG_LEN - 17)].trim_end_matches('-');
        if head.is_empty() {
            Self(format!("{}{:016x}", ID_PREFIX, hash))
        } else {
            Self(format!("{}{}-{:016x}", ID_PREFIX, head, hash))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored (feature → test cases) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleRecord {
    pub id: ExampleId,
    /// Natural-language description; the embedding key.
    pub feature_text: String,
    /// Flattened test cases, see `ingest::flatten`.
    pub test_cases_text: String,
    pub ingested_at: DateTime<Utc>,
}

impl ExampleRecord {
    /// Create a record with an id derived from `feature_text`.
    pub fn new(feature_text: impl Into<String>, test_cases_text: impl Into<String>) -> Self {
        let feature_text = feature_text.into();
        Self {
            id: ExampleId::from_feature(&feature_text),
            feature_text,
            test_cases_text: test_cases_text.into(),
            ingested_at: Utc::now(),
        }
    }

    /// Create a record under an explicit id.
    pub fn with_id(
        id: ExampleId,
        feature_text: impl Into<String>,
        test_cases_text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            feature_text: feature_text.into(),
            test_cases_text: test_cases_text.into(),
            ingested_at: Utc::now(),
        }
    }
}

/// Slug of `text` and whether it kept everything but case and whitespace.
fn slugify(text: &str) -> (String, bool) {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    let mut lossless = true;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            if !c.is_whitespace() {
                lossless = false;
            }
            pending_dash = true;
        }
    }
    (slug, lossless)
}

/// Lowercase with whitespace runs collapsed: the text an id must tell apart.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn stable_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}
