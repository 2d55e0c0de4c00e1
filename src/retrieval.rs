//! Best-effort retrieval of similar past examples
//!
//! Retrieval enriches the prompt but is never required for generation: any
//! store failure (including a store that could not be opened at all) is
//! logged and degrades to an empty result.

use crate::store::{ExampleStore, StoreError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Number of examples retrieved when the caller does not say.
pub const DEFAULT_K: usize = 3;

/// A retrieved example, ready for prompt composition.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedExample {
    pub feature_text: String,
    pub test_cases_text: String,
    pub score: f32,
}

/// Queries the example store for grounding context.
#[derive(Clone)]
pub struct Retriever {
    store: Result<Arc<ExampleStore>, Arc<StoreError>>,
}

impl Retriever {
    pub fn new(store: Arc<ExampleStore>) -> Self {
        Self { store: Ok(store) }
    }

    /// A retriever whose store failed to initialize. Every call returns
    /// an empty result.
    pub fn unavailable(error: StoreError) -> Self {
        Self {
            store: Err(Arc::new(error)),
        }
    }

    /// The backing store, if it initialized.
    pub fn store(&self) -> Option<&Arc<ExampleStore>> {
        self.store.as_ref().ok()
    }

    /// The `k` examples most similar to `feature_text`, most similar first.
    ///
    /// Never fails: store errors yield an empty sequence.
    pub fn retrieve(&self, feature_text: &str, k: usize) -> Vec<RetrievedExample> {
        let store = match &self.store {
            Ok(store) => store,
            Err(e) => {
                warn!(error = %e, "retrieval skipped, store unavailable");
                return Vec::new();
            }
        };

        match store.query(feature_text, k) {
            Ok(hits) => {
                debug!(k, retrieved = hits.len(), "retrieved examples");
                hits.into_iter()
                    .map(|hit| RetrievedExample {
                        feature_text: hit.record.feature_text,
                        test_cases_text: hit.record.test_cases_text,
                        score: hit.score,
                    })
                    .collect()
            }
            Err(e) => {
                warn!(error = %e, "retrieval failed, continuing without examples");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::store::{DuplicatePolicy, ExampleRecord};

    fn store() -> Arc<ExampleStore> {
        Arc::new(ExampleStore::new(Arc::new(HashingEmbedder::default())))
    }

    #[test]
    fn empty_store_retrieves_nothing() {
        let retriever = Retriever::new(store());
        for k in [0, 1, 3, 100] {
            assert!(retriever.retrieve("anything at all", k).is_empty());
        }
    }

    #[test]
    fn unavailable_store_degrades_to_empty() {
        let retriever = Retriever::unavailable(StoreError::Unavailable("no model".into()));
        assert!(retriever.store().is_none());
        assert!(retriever.retrieve("User login", 3).is_empty());
    }

    #[test]
    fn query_failure_degrades_to_empty() {
        let store = Arc::new(ExampleStore::new(Arc::new(
            HashingEmbedder::default().with_max_chars(20),
        )));
        store
            .add(ExampleRecord::new("Login", "cases"), DuplicatePolicy::Reject)
            .unwrap();
        let retriever = Retriever::new(store);
        // Query exceeds the embedder limit
        let long = "x".repeat(50);
        assert!(retriever.retrieve(&long, 3).is_empty());
    }

    #[test]
    fn exact_feature_ranks_first() {
        let store = store();
        for (f, t) in [
            ("Export invoices to PDF", "Title: Export"),
            ("User login", "Title: Valid login"),
            ("Reset forgotten password", "Title: Reset"),
        ] {
            store.add(ExampleRecord::new(f, t), DuplicatePolicy::Reject).unwrap();
        }
        let retriever = Retriever::new(store);
        let results = retriever.retrieve("User login", 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].feature_text, "User login");
        assert!(results[0].test_cases_text.contains("Valid login"));
        assert!(results.iter().all(|r| r.score <= results[0].score));
    }
}
