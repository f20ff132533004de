//! Chunk storage over the embedded vector index.
//!
//! `ChunkIndex` maps [`Chunk`]s to `tome-vector` records: the chunk fields
//! travel as record metadata, so search hits reconstruct full chunks
//! without a second store. Re-ingesting a document first deletes chunks
//! whose ids are no longer produced, then upserts the new set, so stale
//! text never lingers under a superseded path.

use tome_vector::{VectorIndex, VectorRecord};

use crate::types::{AppError, Chunk, Result, ScoredChunk};

const META_TEXT: &str = "text";
const META_SOURCE_LABEL: &str = "source_label";
const META_DOCUMENT_PATH: &str = "document_path";
const META_POSITION: &str = "position";

pub struct ChunkIndex {
    index: VectorIndex,
}

impl ChunkIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            index: VectorIndex::new(dimensions),
        }
    }

    /// Store chunks with their embeddings, superseding the documents they
    /// belong to: ids previously stored under the same `document_path` but
    /// absent from `chunks` are deleted.
    ///
    /// Returns the number of chunks stored.
    pub fn ingest(&self, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<usize> {
        if chunks.len() != embeddings.len() {
            return Err(AppError::Internal(format!(
                "{} chunks paired with {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        // Collect stale ids per affected document before the new upsert.
        let mut stale: Vec<String> = Vec::new();
        let mut paths: Vec<&str> = chunks
            .iter()
            .map(|c| c.document_path.as_str())
            .collect();
        paths.sort_unstable();
        paths.dedup();
        for path in paths {
            for id in self.index.ids_where(META_DOCUMENT_PATH, path) {
                if !chunks.iter().any(|c| c.id == id) {
                    stale.push(id);
                }
            }
        }

        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                VectorRecord::with_metadata(
                    chunk.id,
                    embedding,
                    [
                        (META_TEXT, chunk.text),
                        (META_SOURCE_LABEL, chunk.source_label),
                        (META_DOCUMENT_PATH, chunk.document_path),
                        (META_POSITION, chunk.position.to_string()),
                    ],
                )
            })
            .collect();

        let count = self.index.upsert(records)?;
        for id in &stale {
            self.index.delete(id);
        }
        if !stale.is_empty() {
            tracing::info!(superseded = stale.len(), "Removed stale chunks");
        }

        Ok(count)
    }

    /// Search for the chunks most similar to a query embedding.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let hits = self.index.search(query, top_k)?;
        hits.into_iter()
            .map(|hit| {
                let text = hit
                    .metadata
                    .get(META_TEXT)
                    .cloned()
                    .ok_or_else(|| missing_field(&hit.id, META_TEXT))?;
                let source_label = hit
                    .metadata
                    .get(META_SOURCE_LABEL)
                    .cloned()
                    .ok_or_else(|| missing_field(&hit.id, META_SOURCE_LABEL))?;
                let document_path = hit
                    .metadata
                    .get(META_DOCUMENT_PATH)
                    .cloned()
                    .ok_or_else(|| missing_field(&hit.id, META_DOCUMENT_PATH))?;
                let position = hit
                    .metadata
                    .get(META_POSITION)
                    .and_then(|p| p.parse().ok())
                    .ok_or_else(|| missing_field(&hit.id, META_POSITION))?;

                Ok(ScoredChunk {
                    chunk: Chunk {
                        id: hit.id,
                        text,
                        source_label,
                        document_path,
                        position,
                    },
                    score: hit.score,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn missing_field(id: &str, field: &str) -> AppError {
    AppError::IndexCorruption(format!("chunk '{}' is missing metadata field '{}'", id, field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::chunker::chunk_id;

    fn chunk(path: &str, position: usize, text: &str) -> Chunk {
        Chunk {
            id: chunk_id(path, position, text),
            text: text.to_string(),
            source_label: "Chapter 1".to_string(),
            document_path: path.to_string(),
            position,
        }
    }

    #[test]
    fn test_ingest_and_search_round_trip() {
        let index = ChunkIndex::new(2);
        index
            .ingest(
                vec![chunk("ch1.md", 0, "robots"), chunk("ch1.md", 1, "sensors")],
                vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            )
            .unwrap();

        let results = index.search(&[1.0, 0.0], 5).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.text, "robots");
        assert_eq!(results[0].chunk.source_label, "Chapter 1");
        assert_eq!(results[0].chunk.position, 0);
        assert!((results[0].score - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_reingest_is_idempotent() {
        let index = ChunkIndex::new(2);
        let chunks = vec![chunk("ch1.md", 0, "robots"), chunk("ch1.md", 1, "sensors")];
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];

        index.ingest(chunks.clone(), vectors.clone()).unwrap();
        index.ingest(chunks, vectors).unwrap();

        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_reingest_supersedes_removed_chunks() {
        let index = ChunkIndex::new(2);
        index
            .ingest(
                vec![chunk("ch1.md", 0, "old text"), chunk("ch1.md", 1, "kept text")],
                vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            )
            .unwrap();
        assert_eq!(index.len(), 2);

        // New revision keeps only one chunk; the old one must go.
        index
            .ingest(vec![chunk("ch1.md", 0, "new text")], vec![vec![0.5, 0.5]])
            .unwrap();

        assert_eq!(index.len(), 1);
        let results = index.search(&[1.0, 0.0], 5).unwrap();
        assert!(results.iter().all(|r| r.chunk.text != "old text"));
        assert!(results.iter().all(|r| r.chunk.text != "kept text"));
    }

    #[test]
    fn test_supersede_leaves_other_documents_alone() {
        let index = ChunkIndex::new(2);
        index
            .ingest(vec![chunk("ch1.md", 0, "chapter one")], vec![vec![1.0, 0.0]])
            .unwrap();
        index
            .ingest(vec![chunk("ch2.md", 0, "chapter two")], vec![vec![0.0, 1.0]])
            .unwrap();

        // Re-ingest ch1 with different content; ch2 must survive.
        index
            .ingest(vec![chunk("ch1.md", 0, "chapter one revised")], vec![vec![1.0, 0.0]])
            .unwrap();

        assert_eq!(index.len(), 2);
        let results = index.search(&[0.0, 1.0], 5).unwrap();
        assert!(results.iter().any(|r| r.chunk.text == "chapter two"));
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let index = ChunkIndex::new(2);
        let result = index.ingest(vec![chunk("ch1.md", 0, "text")], vec![]);
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_empty_index_search_is_empty() {
        let index = ChunkIndex::new(2);
        assert!(index.search(&[1.0, 0.0], 5).unwrap().is_empty());
    }
}
