use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackEventType {
    View,
    Save,
    Unsave,
    Apply,
    Outcome,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeType {
    Response,
    Interview,
    Offer,
    Reject,
}

impl FeedbackEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackEventType::View => "view",
            FeedbackEventType::Save => "save",
            FeedbackEventType::Unsave => "unsave",
            FeedbackEventType::Apply => "apply",
            FeedbackEventType::Outcome => "outcome",
        }
    }
}

impl FromStr for FeedbackEventType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(FeedbackEventType::View),
            "save" => Ok(FeedbackEventType::Save),
            "unsave" => Ok(FeedbackEventType::Unsave),
            "apply" => Ok(FeedbackEventType::Apply),
            "outcome" => Ok(FeedbackEventType::Outcome),
            other => Err(AppError::Validation(format!("unknown event_type '{other}'"))),
        }
    }
}

impl OutcomeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeType::Response => "response",
            OutcomeType::Interview => "interview",
            OutcomeType::Offer => "offer",
            OutcomeType::Reject => "reject",
        }
    }
}

impl FromStr for OutcomeType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "response" => Ok(OutcomeType::Response),
            "interview" => Ok(OutcomeType::Interview),
            "offer" => Ok(OutcomeType::Offer),
            "reject" => Ok(OutcomeType::Reject),
            other => Err(AppError::Validation(format!("unknown outcome_type '{other}'"))),
        }
    }
}

/// One interaction with a job, as seen by the metrics aggregator.
/// Events are append-only: never mutated or deleted once recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackEvent {
    pub job_id: String,
    pub user_id: Uuid,
    pub event_type: FeedbackEventType,
    pub outcome_type: Option<OutcomeType>,
    /// Match score shown to the user when the event happened.
    pub match_score: Option<u8>,
    pub occurred_at: DateTime<Utc>,
}

impl FeedbackEvent {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.job_id.trim().is_empty() {
            return Err(AppError::Validation("job_id cannot be empty".to_string()));
        }
        if let Some(score) = self.match_score {
            if score > 100 {
                return Err(AppError::Validation(format!(
                    "match_score must be within 0..=100, got {score}"
                )));
            }
        }
        match (self.event_type, self.outcome_type) {
            (FeedbackEventType::Outcome, None) => Err(AppError::Validation(
                "outcome events require an outcome_type".to_string(),
            )),
            (FeedbackEventType::Outcome, Some(_)) => Ok(()),
            (other, Some(_)) => Err(AppError::Validation(format!(
                "outcome_type is only valid on outcome events, not '{}'",
                other.as_str()
            ))),
            (_, None) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedbackEventRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: String,
    pub event_type: String,
    pub outcome_type: Option<String>,
    pub match_score: Option<i16>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<FeedbackEventRow> for FeedbackEvent {
    type Error = AppError;

    fn try_from(row: FeedbackEventRow) -> Result<Self, Self::Error> {
        let match_score = row
            .match_score
            .map(|s| {
                u8::try_from(s)
                    .ok()
                    .filter(|s| *s <= 100)
                    .ok_or_else(|| {
                        AppError::Validation(format!("stored match_score {s} is out of range"))
                    })
            })
            .transpose()?;

        Ok(FeedbackEvent {
            job_id: row.job_id,
            user_id: row.user_id,
            event_type: row.event_type.parse()?,
            outcome_type: row.outcome_type.as_deref().map(str::parse).transpose()?,
            match_score,
            occurred_at: row.occurred_at,
        })
    }
}
