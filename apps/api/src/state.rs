use std::sync::Arc;

use sqlx::PgPool;

use crate::matching::engine::MatchEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Match engine with its embedding provider and process-wide phrase cache.
    pub matcher: Arc<MatchEngine>,
}
