//! In-memory example index with cosine k-nearest-neighbor query

use super::record::{ExampleId, ExampleRecord};
use super::{cosine_similarity, DuplicatePolicy, QueryHit, StoreError, StoreResult};
use crate::embedding::Embedder;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

struct Entry {
    embedding: Vec<f32>,
    record: ExampleRecord,
}

#[derive(Default)]
struct Entries {
    /// Insertion order; ties in similarity resolve to the lower index.
    items: Vec<Entry>,
    by_id: HashMap<ExampleId, usize>,
}

/// Process-scoped vector index of example records.
///
/// Queries take a shared lock and may run concurrently; `add` takes the
/// exclusive lock only for the insert itself, after the embedding has been
/// computed. The store only grows: records are never deleted.
pub struct ExampleStore {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Entries>,
}

impl ExampleStore {
    /// Create an empty store over the given embedder.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Entries::default()),
        }
    }

    /// The embedder keys are computed with.
    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Embed `example.feature_text` and insert it.
    ///
    /// Returns `true` if the record was new, `false` if it replaced an
    /// existing record under `DuplicatePolicy::Overwrite`.
    pub fn add(&self, example: ExampleRecord, policy: DuplicatePolicy) -> StoreResult<bool> {
        if policy == DuplicatePolicy::Reject && self.contains(&example.id) {
            return Err(StoreError::DuplicateId(example.id.to_string()));
        }

        let embedding = self.embedder.embed(&example.feature_text)?;

        let mut entries = self.write();
        // Re-check under the write lock: another writer may have won the race.
        if let Some(&slot) = entries.by_id.get(&example.id) {
            if policy == DuplicatePolicy::Reject {
                return Err(StoreError::DuplicateId(example.id.to_string()));
            }
            debug!(id = %example.id, "overwriting example");
            entries.items[slot] = Entry {
                embedding,
                record: example,
            };
            return Ok(false);
        }

        let slot = entries.items.len();
        entries.by_id.insert(example.id.clone(), slot);
        debug!(id = %example.id, size = slot + 1, "stored example");
        entries.items.push(Entry {
            embedding,
            record: example,
        });
        Ok(true)
    }

    /// The `k` records most similar to `text`, most similar first.
    ///
    /// Returns at most `min(k, len)` hits. An empty store or `k == 0` gives
    /// an empty result without embedding the query.
    pub fn query(&self, text: &str, k: usize) -> StoreResult<Vec<QueryHit>> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed(text)?;
        let entries = self.read();

        let mut scored: Vec<(usize, f32)> = entries
            .items
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(&query, &entry.embedding)))
            .collect();
        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        debug!(k, size = entries.items.len(), hits = scored.len(), "example query");

        Ok(scored
            .into_iter()
            .map(|(i, score)| QueryHit {
                record: entries.items[i].record.clone(),
                score,
            })
            .collect())
    }

    /// Look up a record by id.
    pub fn get(&self, id: &ExampleId) -> Option<ExampleRecord> {
        let entries = self.read();
        entries
            .by_id
            .get(id)
            .map(|&slot| entries.items[slot].record.clone())
    }

    pub fn contains(&self, id: &ExampleId) -> bool {
        self.read().by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
