//! HTTP API Handlers and Routes
//!
//! The REST API layer, built on the Axum web framework.
//!
//! # API Endpoints
//!
//! - `POST /embed` - Ingest a document into the index
//! - `POST /query` - Semantic search over the index
//! - `POST /chat` - Grounded question answering with citations
//! - `GET /health` - Liveness probe with index size
//!
//! # Error Bodies
//!
//! All failures serialize as `{"error": <message>, "code": <stable code>}`;
//! see [`crate::types::AppError`] for the status mapping.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use utoipa::OpenApi;

use crate::types::{
    ChatRequest, ChatResponse, ChatTurn, EmbedRequest, EmbedResponse, HealthResponse,
    QueryRequest, QueryResponse, SourceCitation, TurnRole,
};

/// OpenAPI document for the service.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::embed,
        handlers::query,
        handlers::chat,
        handlers::health
    ),
    components(schemas(
        EmbedRequest,
        EmbedResponse,
        QueryRequest,
        QueryResponse,
        ChatRequest,
        ChatResponse,
        ChatTurn,
        TurnRole,
        SourceCitation,
        HealthResponse
    )),
    tags(
        (name = "rag", description = "Retrieval and generation endpoints"),
        (name = "ops", description = "Operational endpoints")
    )
)]
pub struct ApiDoc;
