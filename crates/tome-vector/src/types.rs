//! Common types for tome-vector.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a vector in the index.
pub type VectorId = String;

/// A vector with its id and metadata, ready for insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// External string ID. Re-inserting the same ID replaces the record.
    pub id: VectorId,
    /// The embedding vector.
    pub vector: Vec<f32>,
    /// String key-value pairs stored alongside the vector.
    pub metadata: HashMap<String, String>,
}

impl VectorRecord {
    /// Create a record with empty metadata.
    pub fn new(id: impl Into<VectorId>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            metadata: HashMap::new(),
        }
    }

    /// Create a record from a list of metadata key-value pairs.
    pub fn with_metadata<I, K, V>(id: impl Into<VectorId>, vector: Vec<f32>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            id: id.into(),
            vector,
            metadata: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Result of a vector search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// ID of the matched vector.
    pub id: VectorId,
    /// Cosine score clamped to [0, 1]. Higher is more similar.
    pub score: f32,
    /// Metadata stored with the vector.
    pub metadata: HashMap<String, String>,
}
