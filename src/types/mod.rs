use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EmbedRequest {
    pub text: String,
    pub source_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EmbedResponse {
    pub ingested: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryResponse {
    pub results: Vec<SourceCitation>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub response: String,
    pub sources: Vec<SourceCitation>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub index_size: usize,
}

/// A retrieved passage projected for API responses.
///
/// `text` is an excerpt truncated for display; scores are cosine similarity
/// clamped to [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SourceCitation {
    pub source: String,
    pub text: String,
    pub score: f32,
}

// ============= Conversation Types =============

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

// ============= RAG Types =============

/// An immutable unit of indexed text.
///
/// `id` is content-addressed over `(document_path, position, text)`, so
/// re-ingesting identical content produces identical ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub source_label: String,
    pub document_path: String,
    pub position: usize,
}

/// A chunk paired with its relevance score for a query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Input too large: {0}")]
    InputTooLarge(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Provider timeout: {0}")]
    ProviderTimeout(String),

    #[error("Index corruption: {0}")]
    IndexCorruption(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convenience constructor for request validation failures.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code included in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. }
            | AppError::InvalidDocument(_)
            | AppError::InputTooLarge(_) => "validation_error",
            AppError::ProviderUnavailable(_) => "provider_unavailable",
            AppError::ProviderTimeout(_) => "provider_timeout",
            AppError::IndexCorruption(_) => "index_corruption",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Whether a retry could plausibly succeed. Used by the embedding
    /// client's backoff loop; validation errors are never retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::ProviderUnavailable(_) | AppError::ProviderTimeout(_)
        )
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match self {
            AppError::Validation { .. }
            | AppError::InvalidDocument(_)
            | AppError::InputTooLarge(_) => StatusCode::BAD_REQUEST,
            AppError::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::ProviderTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::IndexCorruption(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<tome_vector::Error> for AppError {
    fn from(err: tome_vector::Error) -> Self {
        match err {
            // A query-shape problem is the caller's fault; anything the
            // index rejects about stored data is an integrity bug.
            tome_vector::Error::InvalidQuery(msg) => AppError::validation("top_k", msg),
            other => AppError::IndexCorruption(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
