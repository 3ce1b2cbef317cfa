mod config;
mod db;
mod errors;
mod feedback;
mod matching;
mod models;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::matching::embedding::{EmbeddingCache, EmbeddingProvider, HashEmbedder, RemoteEmbedder};
use crate::matching::engine::MatchEngine;
use crate::matching::similarity::SimilarityEngine;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting MatchForge API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (feedback event log)
    let db = create_pool(&config.database_url).await?;

    // Initialize embedding provider (HashEmbedder unless EMBEDDING_API_URL is set)
    let provider = build_embedding_provider(&config)?;
    info!("Embedding provider initialized ({})", provider.name());

    let cache = EmbeddingCache::new(config.embedding_cache_capacity);
    let matcher = MatchEngine::new(SimilarityEngine::new(provider, cache));

    // Build app state
    let state = AppState {
        db,
        matcher: Arc::new(matcher),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS origins once the web client domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_embedding_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    match &config.embedding_api_url {
        Some(url) => {
            let remote = RemoteEmbedder::new(
                url.clone(),
                config.embedding_api_key.clone(),
                config.embedding_model.clone(),
            )
            .context("Failed to build embedding HTTP client")?;
            info!("Using remote embeddings at {url} (model: {})", config.embedding_model);
            Ok(Arc::new(remote))
        }
        None => Ok(Arc::new(HashEmbedder::new(config.embedding_dimension))),
    }
}
