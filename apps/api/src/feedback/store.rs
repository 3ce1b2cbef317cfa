use anyhow::Result;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::feedback::{FeedbackEvent, FeedbackEventRow};

/// Appends one event. CRITICAL: the log is append-only; never UPDATE or DELETE rows.
pub async fn append_event(pool: &PgPool, event: &FeedbackEvent) -> Result<FeedbackEventRow> {
    let row = sqlx::query_as::<_, FeedbackEventRow>(
        r#"
        INSERT INTO feedback_events
            (id, user_id, job_id, event_type, outcome_type, match_score, occurred_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(event.user_id)
    .bind(&event.job_id)
    .bind(event.event_type.as_str())
    .bind(event.outcome_type.map(|o| o.as_str()))
    .bind(event.match_score.map(i16::from))
    .bind(event.occurred_at)
    .fetch_one(pool)
    .await?;

    info!(
        "Recorded {} event for job {} (user {})",
        row.event_type, row.job_id, row.user_id
    );
    Ok(row)
}

/// Returns a user's most recent events, newest first.
pub async fn list_user_events(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<FeedbackEventRow>> {
    Ok(sqlx::query_as::<_, FeedbackEventRow>(
        r#"
        SELECT * FROM feedback_events
        WHERE user_id = $1
        ORDER BY occurred_at DESC, created_at DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

/// Loads a snapshot of events for metrics, optionally for one user.
pub async fn load_events(pool: &PgPool, user_id: Option<Uuid>) -> Result<Vec<FeedbackEvent>> {
    let rows = sqlx::query_as::<_, FeedbackEventRow>(
        "SELECT * FROM feedback_events WHERE ($1::uuid IS NULL OR user_id = $1)",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let events = rows
        .into_iter()
        .map(FeedbackEvent::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}
