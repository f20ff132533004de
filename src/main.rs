use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tome::provider::http::{HttpEmbeddingProvider, HttpGenerationProvider};
use tome::{app, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tome=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    let embedder = Arc::new(HttpEmbeddingProvider::new(&config.provider)?);
    let generator = Arc::new(HttpGenerationProvider::new(&config.provider)?);

    tracing::info!(
        provider_url = %config.provider.base_url,
        embedding_model = %config.provider.embedding_model,
        generation_model = %config.provider.generation_model,
        "Providers configured"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, embedder, generator);
    let router = app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
