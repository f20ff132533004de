//! # tome-vector
//!
//! A pure-Rust embedded vector index with exact-scan cosine search.
//!
//! ## Features
//!
//! - **Pure Rust**: No native dependencies, compiles anywhere Rust does
//! - **Exact search**: Every query scans all vectors, so results are fully
//!   deterministic; scores are clamped cosine similarity and ties break by
//!   insertion order
//! - **Thread-safe**: Concurrent readers; writers hold the exclusive lock
//!   only for the map mutation itself
//! - **Upsert semantics**: Re-inserting an id replaces its vector and
//!   metadata while keeping the original insertion rank
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tome_vector::{VectorIndex, VectorRecord};
//!
//! let index = VectorIndex::new(384);
//! index.upsert(vec![VectorRecord::new("doc1", vec![0.1f32; 384])])?;
//! let hits = index.search(&vec![0.1f32; 384], 10)?;
//! assert_eq!(hits[0].id, "doc1");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod distance;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use distance::{cosine_score, cosine_similarity};
pub use error::{Error, Result};
pub use types::{SearchHit, VectorId, VectorRecord};

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

/// A stored vector with its insertion rank.
#[derive(Debug, Clone)]
struct Entry {
    /// Monotonic insertion sequence, kept across replacement of the same id.
    seq: u64,
    vector: Vec<f32>,
    metadata: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<VectorId, Entry>,
    next_seq: u64,
}

/// An in-memory vector index with a fixed dimensionality.
///
/// # Thread Safety
///
/// `VectorIndex` is `Send + Sync`. Searches take a shared read lock, so any
/// number of queries run concurrently; `upsert` and `delete` take the write
/// lock only while mutating the underlying map.
///
/// # Determinism
///
/// Search results are sorted by descending score, and equal scores by
/// ascending insertion order. Replacing a vector via upsert does not change
/// its insertion rank, so repeated ingestion of identical content leaves
/// search output byte-for-byte stable.
#[derive(Debug)]
pub struct VectorIndex {
    dimensions: usize,
    inner: RwLock<Inner>,
}

impl VectorIndex {
    /// Create an empty index for vectors of the given dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Dimensionality this index accepts.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Insert or replace a batch of records.
    ///
    /// All records are validated before the write lock is taken; a batch
    /// with any invalid record inserts nothing. Replacing an existing id
    /// keeps its original insertion sequence.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] if any vector has the wrong length,
    /// [`Error::InvalidVector`] if any vector contains NaN or infinity.
    pub fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
        for record in &records {
            self.validate_vector(&record.vector)?;
        }

        let count = records.len();
        let mut inner = self.inner.write();
        for record in records {
            let seq = match inner.entries.get(&record.id) {
                Some(existing) => existing.seq,
                None => {
                    let seq = inner.next_seq;
                    inner.next_seq += 1;
                    seq
                }
            };
            inner.entries.insert(
                record.id,
                Entry {
                    seq,
                    vector: record.vector,
                    metadata: record.metadata,
                },
            );
        }
        drop(inner);

        debug!(count, "Upserted records");
        Ok(count)
    }

    /// Search for the `top_k` most similar vectors.
    ///
    /// Returns up to `top_k` hits sorted by descending cosine score (clamped
    /// to [0, 1]); ties break by insertion order. An empty index yields an
    /// empty result, not an error.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidQuery`] if `top_k` is zero, [`Error::DimensionMismatch`]
    /// or [`Error::InvalidVector`] for a malformed query vector.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        if top_k == 0 {
            return Err(Error::InvalidQuery("top_k must be at least 1".to_string()));
        }
        self.validate_vector(query)?;

        let inner = self.inner.read();
        let mut scored: Vec<(f32, u64, &VectorId, &Entry)> = inner
            .entries
            .iter()
            .map(|(id, entry)| (cosine_score(query, &entry.vector), entry.seq, id, entry))
            .collect();

        // Descending score; equal scores resolved by insertion order.
        scored.sort_unstable_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        let hits = scored
            .into_iter()
            .take(top_k)
            .map(|(score, _, id, entry)| SearchHit {
                id: id.clone(),
                score,
                metadata: entry.metadata.clone(),
            })
            .collect::<Vec<_>>();

        debug!(count = hits.len(), "Search completed");
        Ok(hits)
    }

    /// Delete a vector by id.
    ///
    /// Returns `true` if the vector existed. Deleted ids never appear in
    /// later searches.
    pub fn delete(&self, id: &str) -> bool {
        self.inner.write().entries.remove(id).is_some()
    }

    /// Check if a vector exists.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().entries.contains_key(id)
    }

    /// Get a vector and its metadata by id.
    pub fn get(&self, id: &str) -> Option<(Vec<f32>, HashMap<String, String>)> {
        self.inner
            .read()
            .entries
            .get(id)
            .map(|entry| (entry.vector.clone(), entry.metadata.clone()))
    }

    /// Ids of all vectors whose metadata has `value` under `key`.
    ///
    /// Supports document-level replacement: callers collect the ids stored
    /// under a document path before upserting its new chunks.
    pub fn ids_where(&self, key: &str, value: &str) -> Vec<VectorId> {
        self.inner
            .read()
            .entries
            .iter()
            .filter(|(_, entry)| entry.metadata.get(key).map(String::as_str) == Some(value))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of vectors in the index.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    fn validate_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidVector(
                "vector contains NaN or infinite values".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, vector: Vec<f32>) -> VectorRecord {
        VectorRecord::new(id, vector)
    }

    #[test]
    fn test_upsert_and_search() {
        let index = VectorIndex::new(3);
        index
            .upsert(vec![
                record("vec1", vec![1.0, 0.0, 0.0]),
                record("vec2", vec![0.0, 1.0, 0.0]),
                record("vec3", vec![0.9, 0.1, 0.0]),
            ])
            .unwrap();

        let hits = index.search(&[1.0, 0.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, "vec1");
        assert!((hits[0].score - 1.0).abs() < 0.0001);
        assert_eq!(hits[1].id, "vec3");
    }

    #[test]
    fn test_search_limits_results() {
        let index = VectorIndex::new(2);
        index
            .upsert(vec![
                record("a", vec![1.0, 0.0]),
                record("b", vec![0.8, 0.2]),
                record("c", vec![0.5, 0.5]),
            ])
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_empty_index_returns_empty() {
        let index = VectorIndex::new(4);
        let hits = index.search(&[0.0, 0.0, 1.0, 0.0], 5).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_zero_top_k_is_invalid() {
        let index = VectorIndex::new(2);
        let result = index.search(&[1.0, 0.0], 0);
        assert!(matches!(result, Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn test_dimension_mismatch() {
        let index = VectorIndex::new(3);
        let result = index.upsert(vec![record("bad", vec![1.0, 0.0])]);
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_rejects_nan() {
        let index = VectorIndex::new(2);
        let result = index.upsert(vec![record("bad", vec![f32::NAN, 0.0])]);
        assert!(matches!(result, Err(Error::InvalidVector(_))));
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        let index = VectorIndex::new(2);
        // Parallel vectors all score 1.0 against the query.
        index.upsert(vec![record("first", vec![2.0, 0.0])]).unwrap();
        index.upsert(vec![record("second", vec![1.0, 0.0])]).unwrap();
        index.upsert(vec![record("third", vec![3.0, 0.0])]).unwrap();

        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_upsert_replaces_and_keeps_rank() {
        let index = VectorIndex::new(2);
        index.upsert(vec![record("a", vec![1.0, 0.0])]).unwrap();
        index.upsert(vec![record("b", vec![1.0, 0.0])]).unwrap();

        // Replace "a" with an equally-scoring vector; it must stay first.
        index.upsert(vec![record("a", vec![2.0, 0.0])]).unwrap();
        assert_eq!(index.len(), 2);

        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].id, "b");
    }

    #[test]
    fn test_delete() {
        let index = VectorIndex::new(2);
        index.upsert(vec![record("a", vec![1.0, 0.0])]).unwrap();

        assert!(index.delete("a"));
        assert!(!index.delete("a"));
        assert!(index.search(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_ids_where() {
        let index = VectorIndex::new(2);
        index
            .upsert(vec![
                VectorRecord::with_metadata("a", vec![1.0, 0.0], [("document_path", "ch1.md")]),
                VectorRecord::with_metadata("b", vec![0.0, 1.0], [("document_path", "ch1.md")]),
                VectorRecord::with_metadata("c", vec![0.5, 0.5], [("document_path", "ch2.md")]),
            ])
            .unwrap();

        let mut ids = index.ids_where("document_path", "ch1.md");
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_scores_clamped_to_unit_interval() {
        let index = VectorIndex::new(2);
        index.upsert(vec![record("neg", vec![-1.0, 0.0])]).unwrap();

        let hits = index.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].score, 0.0);
    }

    #[test]
    fn test_concurrent_readers() {
        use std::sync::Arc;

        let index = Arc::new(VectorIndex::new(2));
        index.upsert(vec![record("a", vec![1.0, 0.0])]).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let hits = index.search(&[1.0, 0.0], 1).unwrap();
                        assert_eq!(hits[0].id, "a");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
