use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::feedback::metrics::{aggregate_metrics, FeedbackMetrics};
use crate::feedback::store::{append_event, list_user_events, load_events};
use crate::models::feedback::{FeedbackEvent, FeedbackEventRow, FeedbackEventType, OutcomeType};
use crate::state::AppState;

const DEFAULT_EVENT_LIMIT: i64 = 100;
const MAX_EVENT_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct RecordEventRequest {
    pub user_id: Uuid,
    pub job_id: String,
    pub event_type: FeedbackEventType,
    pub outcome_type: Option<OutcomeType>,
    pub match_score: Option<u8>,
    pub occurred_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct EventListQuery {
    pub user_id: Uuid,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct MetricsQuery {
    pub user_id: Option<Uuid>,
}

/// POST /api/v1/feedback/events
pub async fn handle_record_event(
    State(state): State<AppState>,
    Json(req): Json<RecordEventRequest>,
) -> Result<(StatusCode, Json<FeedbackEventRow>), AppError> {
    let event = FeedbackEvent {
        job_id: req.job_id,
        user_id: req.user_id,
        event_type: req.event_type,
        outcome_type: req.outcome_type,
        match_score: req.match_score,
        occurred_at: req.occurred_at.unwrap_or_else(Utc::now),
    };
    event.validate()?;

    let row = append_event(&state.db, &event).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/feedback/events
pub async fn handle_list_events(
    State(state): State<AppState>,
    Query(params): Query<EventListQuery>,
) -> Result<Json<Vec<FeedbackEventRow>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    if !(1..=MAX_EVENT_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be within 1..={MAX_EVENT_LIMIT}"
        )));
    }
    let rows = list_user_events(&state.db, params.user_id, limit).await?;
    Ok(Json(rows))
}

/// GET /api/v1/feedback/metrics
///
/// Recomputed from the event log on every request; nothing is cached.
pub async fn handle_metrics(
    State(state): State<AppState>,
    Query(params): Query<MetricsQuery>,
) -> Result<Json<FeedbackMetrics>, AppError> {
    let events = load_events(&state.db, params.user_id).await?;
    Ok(Json(aggregate_metrics(&events)))
}
