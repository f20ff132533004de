//! Query-side retrieval: embed, search, filter by relevance.

use std::sync::Arc;

use crate::index::ChunkIndex;
use crate::rag::embedding::EmbeddingClient;
use crate::types::{Result, ScoredChunk};

pub struct Retriever {
    embeddings: Arc<EmbeddingClient>,
    index: Arc<ChunkIndex>,
    min_score: f32,
}

impl Retriever {
    pub fn new(embeddings: Arc<EmbeddingClient>, index: Arc<ChunkIndex>, min_score: f32) -> Self {
        Self {
            embeddings,
            index,
            min_score,
        }
    }

    /// Retrieve up to `top_k` chunks relevant to the query.
    ///
    /// Chunks scoring below `min_score` (or the configured default when
    /// `None`) are dropped. An empty result is a valid outcome: it means
    /// the corpus has nothing relevant, not that retrieval failed.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredChunk>> {
        let threshold = min_score.unwrap_or(self.min_score);

        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embeddings.embed(query).await?;
        let mut results = self.index.search(&query_embedding, top_k)?;
        results.retain(|r| r.score >= threshold);

        tracing::debug!(
            top_k,
            threshold,
            results = results.len(),
            "Retrieval completed"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::provider::EmbeddingProvider;
    use crate::rag::chunker::chunk_id;
    use crate::types::{AppError, Chunk};
    use async_trait::async_trait;

    /// Maps known texts to fixed unit vectors; unknown texts fail loudly.
    struct ScriptedProvider;

    #[async_trait]
    impl EmbeddingProvider for ScriptedProvider {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            texts
                .iter()
                .map(|t| match t.as_str() {
                    "about robots" => Ok(vec![1.0, 0.0]),
                    "robot question" => Ok(vec![0.95, 0.05]),
                    "about cooking" => Ok(vec![0.0, 1.0]),
                    other => Err(AppError::Internal(format!("unscripted text: {}", other))),
                })
                .collect()
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn setup(min_score: f32) -> (Retriever, Arc<ChunkIndex>) {
        let index = Arc::new(ChunkIndex::new(2));
        let embeddings = Arc::new(EmbeddingClient::new(
            Arc::new(ScriptedProvider),
            &Config::default(),
        ));
        (
            Retriever::new(embeddings, Arc::clone(&index), min_score),
            index,
        )
    }

    fn chunk(text: &str) -> Chunk {
        Chunk {
            id: chunk_id("doc.md", 0, text),
            text: text.to_string(),
            source_label: "Doc".to_string(),
            document_path: "doc.md".to_string(),
            position: 0,
        }
    }

    #[tokio::test]
    async fn test_retrieves_relevant_chunks() {
        let (retriever, index) = setup(0.5);
        index
            .ingest(
                vec![chunk("about robots"), chunk("about cooking")],
                vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            )
            .unwrap();

        let results = retriever.retrieve("robot question", 5, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.text, "about robots");
        assert!(results[0].score >= 0.5);
    }

    #[tokio::test]
    async fn test_low_scores_filtered_out() {
        let (retriever, index) = setup(0.99);
        index
            .ingest(vec![chunk("about robots")], vec![vec![0.7, 0.7]])
            .unwrap();

        let results = retriever.retrieve("robot question", 5, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty_without_embedding() {
        // The scripted provider would error on this text; an empty index
        // must short-circuit before any provider call.
        let (retriever, _index) = setup(0.5);
        let results = retriever.retrieve("unscripted query", 5, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_threshold_overrides_default() {
        let (retriever, index) = setup(0.5);
        index
            .ingest(vec![chunk("about cooking")], vec![vec![0.0, 1.0]])
            .unwrap();

        // Orthogonal content scores 0; a zero threshold keeps it.
        let results = retriever
            .retrieve("robot question", 5, Some(0.0))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }
}
