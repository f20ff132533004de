//! Model provider abstractions
//!
//! The pipeline treats embedding and generation models as opaque
//! capabilities behind two traits. Production wiring uses the
//! [`http`] implementations against an Ollama-compatible REST API;
//! tests substitute deterministic in-process doubles.

pub mod http;

use std::time::Duration;

use async_trait::async_trait;

use crate::types::{AppError, Result};

/// A provider that maps texts to fixed-dimension embedding vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Dimensionality of the vectors this provider produces.
    fn dimensions(&self) -> usize;

    /// Model identifier, used in cache keys.
    fn model_name(&self) -> &str;
}

/// A provider that generates a text completion for a prompt.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

/// Retry an async operation on transient failures with exponential backoff.
///
/// `max_attempts` counts the initial call; delays start at `base_delay` and
/// double per retry. Non-transient errors (validation, oversized input)
/// fail immediately.
pub async fn retry_transient<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut delay = base_delay;
    let mut last_err: Option<AppError> = None;

    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Provider call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                last_err = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    // Unreachable: the loop always returns. Kept for totality.
    Err(last_err.unwrap_or_else(|| AppError::Internal("retry loop exhausted".to_string())))
}
