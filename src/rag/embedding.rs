//! Cache-aware, batching embedding client.
//!
//! Sits between the pipeline and the [`EmbeddingProvider`]: cache lookups
//! first, then provider calls for the misses in bounded batches, with
//! exponential backoff on transient failures. Oversized inputs are
//! rejected, never truncated; silent truncation would index text the
//! embedding doesn't actually represent.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::provider::{retry_transient, EmbeddingProvider};
use crate::rag::cache::{CacheStats, EmbeddingCache};
use crate::types::{AppError, Result};

pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
    max_input_chars: usize,
    max_batch_size: usize,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: &Config) -> Self {
        Self {
            provider,
            cache: EmbeddingCache::new(config.rag.cache_capacity),
            max_input_chars: config.rag.max_input_chars,
            max_batch_size: config.rag.max_batch_size.max(1),
            max_retries: config.provider.max_retries,
            retry_base_delay: Duration::from_millis(config.provider.retry_base_delay_ms),
        }
    }

    /// Embed a batch of texts, one vector per input, in order.
    ///
    /// Cached texts are served without a provider call; identical texts
    /// within the batch are embedded once. All inputs are validated before
    /// any provider call, so an invalid batch costs nothing.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        for text in texts {
            if text.chars().count() > self.max_input_chars {
                return Err(AppError::InputTooLarge(format!(
                    "text of {} characters exceeds the {}-character limit",
                    text.chars().count(),
                    self.max_input_chars
                )));
            }
        }

        let model = self.provider.model_name().to_string();
        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];

        // Cache pass; misses are deduplicated by key.
        let mut miss_keys: Vec<String> = Vec::new();
        let mut miss_texts: Vec<String> = Vec::new();
        let mut miss_positions: HashMap<String, Vec<usize>> = HashMap::new();

        for (i, text) in texts.iter().enumerate() {
            let key = self.cache.compute_key(text, &model);
            if let Some(embedding) = self.cache.get(&key) {
                results[i] = Some(embedding);
            } else {
                let positions = miss_positions.entry(key.clone()).or_default();
                if positions.is_empty() {
                    miss_keys.push(key);
                    miss_texts.push(text.clone());
                }
                positions.push(i);
            }
        }

        if !miss_texts.is_empty() {
            tracing::debug!(
                total = texts.len(),
                misses = miss_texts.len(),
                "Embedding cache misses"
            );
        }

        // Provider pass over the misses, in bounded batches.
        for (batch_texts, batch_keys) in miss_texts
            .chunks(self.max_batch_size)
            .zip(miss_keys.chunks(self.max_batch_size))
        {
            let embeddings = retry_transient(self.max_retries, self.retry_base_delay, || {
                self.provider.embed(batch_texts)
            })
            .await?;

            if embeddings.len() != batch_texts.len() {
                return Err(AppError::Internal(format!(
                    "provider returned {} embeddings for {} inputs",
                    embeddings.len(),
                    batch_texts.len()
                )));
            }

            for (key, embedding) in batch_keys.iter().zip(embeddings) {
                if embedding.len() != self.provider.dimensions() {
                    return Err(AppError::Internal(format!(
                        "provider returned a {}-dimensional embedding, expected {}",
                        embedding.len(),
                        self.provider.dimensions()
                    )));
                }
                self.cache.set(key, embedding.clone());
                for &i in &miss_positions[key] {
                    results[i] = Some(embedding.clone());
                }
            }
        }

        Ok(results
            .into_iter()
            .map(|r| r.expect("every position filled by cache or provider"))
            .collect())
    }

    /// Embed a single text. Same caching and retry behavior as the batch path.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let mut embeddings = self.embed_batch(&texts).await?;
        Ok(embeddings.remove(0))
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Deterministic provider: each text maps to a fixed 3-dim vector.
    struct CountingProvider {
        calls: AtomicU32,
        texts_embedded: AtomicU32,
        fail_first: u32,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
                texts_embedded: AtomicU32::new(0),
                fail_first: 0,
            }
        }

        fn flaky(fail_first: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                texts_embedded: AtomicU32::new(0),
                fail_first,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(AppError::ProviderUnavailable("flaky".to_string()));
            }
            self.texts_embedded
                .fetch_add(texts.len() as u32, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, 1.0, 0.0])
                .collect())
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.provider.retry_base_delay_ms = 1;
        config.rag.max_batch_size = 2;
        config.rag.max_input_chars = 50;
        config
    }

    #[tokio::test]
    async fn test_cache_avoids_repeat_provider_calls() {
        let provider = Arc::new(CountingProvider::new());
        let client = EmbeddingClient::new(provider.clone(), &test_config());

        let first = client.embed("hello").await.unwrap();
        let second = client.embed("hello").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn test_duplicates_in_batch_embedded_once() {
        let provider = Arc::new(CountingProvider::new());
        let client = EmbeddingClient::new(provider.clone(), &test_config());

        let texts = vec!["same".to_string(), "same".to_string(), "other".to_string()];
        let embeddings = client.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 3);
        assert_eq!(embeddings[0], embeddings[1]);
        assert_eq!(provider.texts_embedded.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_batching_respects_max_batch_size() {
        let provider = Arc::new(CountingProvider::new());
        let client = EmbeddingClient::new(provider.clone(), &test_config());

        let texts: Vec<String> = (0..5).map(|i| format!("text {}", i)).collect();
        client.embed_batch(&texts).await.unwrap();

        // 5 misses with batch size 2 means 3 provider calls.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_oversized_input_rejected_without_provider_call() {
        let provider = Arc::new(CountingProvider::new());
        let client = EmbeddingClient::new(provider.clone(), &test_config());

        let long = "x".repeat(51);
        let result = client.embed_batch(&["short".to_string(), long]).await;

        assert!(matches!(result, Err(AppError::InputTooLarge(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    /// Provider that answers every batch with a single embedding.
    struct ShortchangingProvider;

    #[async_trait]
    impl EmbeddingProvider for ShortchangingProvider {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0, 0.0, 0.0]])
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "shortchanging"
        }
    }

    #[tokio::test]
    async fn test_embedding_count_mismatch_is_an_error() {
        let client = EmbeddingClient::new(Arc::new(ShortchangingProvider), &test_config());

        let texts = vec!["one".to_string(), "two".to_string()];
        let result = client.embed_batch(&texts).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_transient_failures_retried() {
        let provider = Arc::new(CountingProvider::flaky(2));
        let client = EmbeddingClient::new(provider.clone(), &test_config());

        let embedding = client.embed("resilient").await.unwrap();
        assert_eq!(embedding.len(), 3);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_persistent_failure_surfaces() {
        let provider = Arc::new(CountingProvider::flaky(10));
        let client = EmbeddingClient::new(provider.clone(), &test_config());

        let result = client.embed("doomed").await;
        assert!(matches!(result, Err(AppError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_repeat_embeddings_bit_stable() {
        let provider = Arc::new(CountingProvider::new());
        let client = EmbeddingClient::new(provider, &test_config());

        let first = client.embed("stable").await.unwrap();
        let second = client.embed("stable").await.unwrap();
        assert_eq!(first.to_bits_vec(), second.to_bits_vec());
    }

    trait ToBits {
        fn to_bits_vec(&self) -> Vec<u32>;
    }

    impl ToBits for Vec<f32> {
        fn to_bits_vec(&self) -> Vec<u32> {
            self.iter().map(|f| f.to_bits()).collect()
        }
    }
}
