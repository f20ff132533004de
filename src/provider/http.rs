//! HTTP-backed providers speaking the Ollama REST API.
//!
//! Both clients share the error mapping: request timeouts become
//! `ProviderTimeout`, connection failures and 5xx responses become
//! `ProviderUnavailable`, and malformed payloads become `Internal`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;
use crate::provider::{EmbeddingProvider, GenerationProvider};
use crate::types::{AppError, Result};

// ============= Wire Types =============

#[derive(Debug, Serialize)]
struct EmbedApiRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedApiResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateApiRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateApiResponse {
    response: String,
}

// ============= Shared Plumbing =============

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
}

fn map_request_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::ProviderTimeout(format!("Provider did not respond in time: {}", err))
    } else {
        AppError::ProviderUnavailable(format!("Provider request failed: {}", err))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        Err(AppError::ProviderUnavailable(format!(
            "Provider returned {}: {}",
            status, body
        )))
    } else {
        Err(AppError::Internal(format!(
            "Unexpected provider response {}: {}",
            status, body
        )))
    }
}

// ============= Embedding Provider =============

/// Embedding client for `POST {base_url}/api/embed`.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl HttpEmbeddingProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_millis(config.timeout_ms))?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.embedding_model.clone(),
            dimensions: config.embedding_dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&EmbedApiRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(map_request_error)?;

        let parsed: EmbedApiResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Malformed embedding response: {}", e)))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(AppError::Internal(format!(
                "Provider returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }

        Ok(parsed.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============= Generation Provider =============

/// Completion client for `POST {base_url}/api/generate`.
pub struct HttpGenerationProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl HttpGenerationProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_millis(config.timeout_ms))?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.generation_model.clone(),
        })
    }
}

#[async_trait]
impl GenerationProvider for HttpGenerationProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&GenerateApiRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(map_request_error)?;

        let parsed: GenerateApiResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Malformed generation response: {}", e)))?;

        Ok(parsed.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
