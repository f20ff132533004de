use axum::{
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::api::ApiDoc;
use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/embed", post(crate::api::handlers::embed))
        .route("/query", post(crate::api::handlers::query))
        .route("/chat", post(crate::api::handlers::chat))
        .route("/health", get(crate::api::handlers::health))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}
