//! Request handlers for the RAG endpoints.
//!
//! Each handler is a single pass: validate, run the pipeline, respond.
//! Failures surface as typed [`AppError`]s; nothing at this layer retries
//! (the embedding client owns retry policy for transient provider faults).
//! Every request runs under a span carrying a fresh request id.

use axum::{extract::State, Json};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::types::{
    AppError, ChatRequest, ChatResponse, EmbedRequest, EmbedResponse, HealthResponse,
    QueryRequest, QueryResponse, Result, SourceCitation,
};
use crate::AppState;

/// Maximum characters of a chunk shown in query results.
const EXCERPT_CHARS: usize = 200;

// ============================================================================
// Embed Endpoint
// ============================================================================

/// Ingest a document into the index.
///
/// Chunks the text, embeds each chunk (cache-aware), and stores the result.
/// Re-sending identical content is a no-op at the index level; re-sending a
/// changed document replaces its previous chunks.
#[utoipa::path(
    post,
    path = "/embed",
    request_body = EmbedRequest,
    responses(
        (status = 200, description = "Document ingested", body = EmbedResponse),
        (status = 400, description = "Invalid request"),
        (status = 502, description = "Embedding provider unavailable"),
        (status = 504, description = "Embedding provider timed out")
    ),
    tag = "rag"
)]
pub async fn embed(
    State(state): State<AppState>,
    Json(payload): Json<EmbedRequest>,
) -> Result<Json<EmbedResponse>> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("embed", %request_id);

    async move {
        let start = Instant::now();

        if payload.text.trim().is_empty() {
            return Err(AppError::validation("text", "must not be empty"));
        }
        let text_chars = payload.text.chars().count();
        let max_chars = state.config.rag.max_document_chars;
        if text_chars > max_chars {
            return Err(AppError::validation(
                "text",
                format!(
                    "{} characters exceeds the {}-character limit",
                    text_chars, max_chars
                ),
            ));
        }
        if payload.source_label.trim().is_empty() {
            return Err(AppError::validation("source_label", "must not be empty"));
        }

        // Documents without an explicit path are keyed by their label.
        let document_path = payload
            .document_path
            .clone()
            .unwrap_or_else(|| payload.source_label.clone());

        let chunks: Vec<_> = state
            .chunker
            .chunk(&payload.text, &document_path, &payload.source_label)?
            .collect();

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = state.embeddings.embed_batch(&texts).await?;

        let ingested = state.index.ingest(chunks, embeddings)?;

        tracing::info!(
            source_label = %payload.source_label,
            document_path = %document_path,
            chunks = ingested,
            index_size = state.index.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Document ingested"
        );

        Ok(Json(EmbedResponse { ingested }))
    }
    .instrument(span)
    .await
}

// ============================================================================
// Query Endpoint
// ============================================================================

/// Semantic search over the index.
///
/// Returns up to `top_k` passages scoring at or above the relevance
/// threshold; an empty list means nothing relevant is indexed.
#[utoipa::path(
    post,
    path = "/query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Search completed", body = QueryResponse),
        (status = 400, description = "Invalid request"),
        (status = 502, description = "Embedding provider unavailable"),
        (status = 504, description = "Embedding provider timed out")
    ),
    tag = "rag"
)]
pub async fn query(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("query", %request_id);

    async move {
        let start = Instant::now();

        if payload.query.trim().is_empty() {
            return Err(AppError::validation("query", "must not be empty"));
        }
        let top_k = validate_top_k(&state, payload.top_k)?;

        let results = state.retriever.retrieve(&payload.query, top_k, None).await?;
        let results: Vec<SourceCitation> = results.iter().map(to_citation).collect();

        tracing::info!(
            top_k,
            results = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Query completed"
        );

        Ok(Json(QueryResponse { results }))
    }
    .instrument(span)
    .await
}

// ============================================================================
// Chat Endpoint
// ============================================================================

/// Answer a question grounded in the indexed textbook.
///
/// Retrieval runs first; when nothing relevant is found the canned
/// out-of-scope answer is returned with empty sources and no generation
/// call. History is request-scoped context and is never stored.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Answer generated", body = ChatResponse),
        (status = 400, description = "Invalid request"),
        (status = 502, description = "Model provider unavailable"),
        (status = 504, description = "Model provider timed out")
    ),
    tag = "rag"
)]
pub async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("chat", %request_id);

    async move {
        let start = Instant::now();

        if payload.message.trim().is_empty() {
            return Err(AppError::validation("message", "must not be empty"));
        }
        let message_chars = payload.message.chars().count();
        let max_chars = state.config.rag.max_message_chars;
        if message_chars > max_chars {
            return Err(AppError::validation(
                "message",
                format!(
                    "{} characters exceeds the {}-character limit",
                    message_chars, max_chars
                ),
            ));
        }

        let retrieved = state
            .retriever
            .retrieve(&payload.message, state.config.rag.default_top_k, None)
            .await?;

        let answer = state
            .generator
            .generate(&payload.message, &payload.history, &retrieved)
            .await?;

        tracing::info!(
            retrieved = retrieved.len(),
            sources = answer.sources.len(),
            history_turns = payload.history.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Chat completed"
        );

        Ok(Json(ChatResponse {
            response: answer.response,
            sources: answer.sources,
        }))
    }
    .instrument(span)
    .await
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// Liveness probe reporting the current index size.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "ops"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        index_size: state.index.len(),
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn validate_top_k(state: &AppState, top_k: Option<usize>) -> Result<usize> {
    let max = state.config.rag.max_top_k;
    match top_k {
        None => Ok(state.config.rag.default_top_k),
        Some(0) => Err(AppError::validation("top_k", "must be at least 1")),
        Some(k) if k > max => Err(AppError::validation(
            "top_k",
            format!("must be at most {}", max),
        )),
        Some(k) => Ok(k),
    }
}

fn to_citation(scored: &crate::types::ScoredChunk) -> SourceCitation {
    let text = if scored.chunk.text.chars().count() <= EXCERPT_CHARS {
        scored.chunk.text.clone()
    } else {
        let truncated: String = scored.chunk.text.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", truncated.trim_end())
    };
    SourceCitation {
        source: scored.chunk.source_label.clone(),
        text,
        score: scored.score,
    }
}
