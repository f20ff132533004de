//! # Tome - Textbook Retrieval Server
//!
//! A retrieval-augmented question answering server for a fixed textbook
//! corpus. Documents are chunked, embedded, and stored in an embedded
//! vector index; questions are answered by a generation model grounded in
//! the retrieved excerpts, with citations back to the source material.
//!
//! ## Overview
//!
//! Tome can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `tome-server` binary
//! 2. **As a library** - Wire [`AppState`] with your own providers and
//!    mount [`app`] inside a larger router
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tome::{app, AppState, Config};
//! use tome::provider::http::{HttpEmbeddingProvider, HttpGenerationProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let embedder = Arc::new(HttpEmbeddingProvider::new(&config.provider)?);
//!     let generator = Arc::new(HttpGenerationProvider::new(&config.provider)?);
//!
//!     let state = AppState::new(config, embedder, generator);
//!     let router = app(state);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`provider`] - Embedding and generation provider abstractions
//! - [`rag`] - Chunking, embedding, retrieval, and generation pipeline
//! - [`index`] - Chunk storage over the embedded vector index
//! - [`types`] - Request/response contracts and error handling
//!
//! ## Determinism
//!
//! Given the same indexed content and the same providers, queries return
//! identical results: scores are clamped cosine similarity, ranking ties
//! break by insertion order, chunk ids are content-addressed, and repeated
//! ingestion of unchanged text is served from the embedding cache.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Environment-driven configuration.
pub mod config;
/// Chunk storage over the embedded vector index.
pub mod index;
/// Embedding and generation provider abstractions.
pub mod provider;
/// Retrieval Augmented Generation (RAG) pipeline components.
pub mod rag;
/// Core types (requests, responses, errors).
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use index::ChunkIndex;
pub use provider::{EmbeddingProvider, GenerationProvider};
pub use rag::embedding::EmbeddingClient;
pub use rag::generator::AnswerGenerator;
pub use rag::retriever::Retriever;
pub use types::{AppError, Result};

use std::sync::Arc;

use axum::http::HeaderValue;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use rag::chunker::TextChunker;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Arc<Config>,
    /// Document chunker.
    pub chunker: Arc<TextChunker>,
    /// Cache-aware embedding client.
    pub embeddings: Arc<EmbeddingClient>,
    /// The chunk index; the only shared mutable resource.
    pub index: Arc<ChunkIndex>,
    /// Query-side retrieval.
    pub retriever: Arc<Retriever>,
    /// Grounded answer generation.
    pub generator: Arc<AnswerGenerator>,
}

impl AppState {
    /// Wire the pipeline from a configuration and a pair of providers.
    ///
    /// Providers are injected so tests can substitute deterministic
    /// doubles for the HTTP-backed implementations.
    pub fn new(
        config: Config,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        generation_provider: Arc<dyn GenerationProvider>,
    ) -> Self {
        let chunker = Arc::new(TextChunker::new(
            config.rag.chunk_size,
            config.rag.chunk_overlap,
        ));
        let embeddings = Arc::new(EmbeddingClient::new(Arc::clone(&embedding_provider), &config));
        let index = Arc::new(ChunkIndex::new(embedding_provider.dimensions()));
        let retriever = Arc::new(Retriever::new(
            Arc::clone(&embeddings),
            Arc::clone(&index),
            config.rag.min_score,
        ));
        let generator = Arc::new(AnswerGenerator::new(
            generation_provider,
            config.rag.context_char_budget,
            config.rag.max_history_turns,
        ));

        Self {
            config: Arc::new(config),
            chunker,
            embeddings,
            index,
            retriever,
            generator,
        }
    }
}

/// Hard ceiling on request body size, above the per-field character limits.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the service router with CORS, request tracing, and a body size
/// limit applied.
pub fn app(state: AppState) -> axum::Router {
    let cors = match state.config.server.cors_origin.as_str() {
        "*" => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        origin => match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new()
                .allow_origin(value)
                .allow_methods(Any)
                .allow_headers(Any),
            Err(_) => {
                tracing::warn!(origin, "Invalid CORS origin, falling back to permissive");
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        },
    };

    api::routes::create_router()
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
