pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::feedback::handlers as feedback;
use crate::matching::handlers as matching;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Matching API
        .route("/api/v1/matches/score", post(matching::handle_score))
        .route("/api/v1/matches/rank", post(matching::handle_rank))
        .route("/api/v1/matches/gaps", post(matching::handle_skill_gaps))
        // Feedback API
        .route(
            "/api/v1/feedback/events",
            post(feedback::handle_record_event).get(feedback::handle_list_events),
        )
        .route("/api/v1/feedback/metrics", get(feedback::handle_metrics))
        .with_state(state)
}
