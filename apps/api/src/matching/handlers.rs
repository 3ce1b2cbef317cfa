//! Axum route handlers for the Matching API.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::aggregator::{RankedJob, ScoreBreakdown};
use crate::matching::gaps::{SkillGapReport, DEFAULT_TOP_GAPS};
use crate::models::job::{CandidateProfile, JobPosting};
use crate::state::AppState;

/// Upper bound on jobs per rank request.
const MAX_RANK_BATCH: usize = 500;
const MAX_TOP_GAPS: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub profile: CandidateProfile,
    pub job: JobPosting,
    /// Reference time for recency. Defaults to the server clock.
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RankRequest {
    pub profile: CandidateProfile,
    pub jobs: Vec<JobPosting>,
    pub now: Option<DateTime<Utc>>,
    #[serde(default)]
    pub min_score: u8,
}

#[derive(Debug, Deserialize)]
pub struct SkillGapRequest {
    pub profile: CandidateProfile,
    pub jobs: Vec<JobPosting>,
    pub top_n: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RankResponse {
    pub results: Vec<RankedJob>,
    pub total_considered: usize,
    pub embedding_provider: &'static str,
}

/// POST /api/v1/matches/score
///
/// Scores a single job against a profile and returns the full breakdown.
pub async fn handle_score(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<ScoreBreakdown>, AppError> {
    let now = request.now.unwrap_or_else(Utc::now);
    let breakdown = state
        .matcher
        .score(&request.profile, &request.job, now)
        .await?;
    Ok(Json(breakdown))
}

/// POST /api/v1/matches/rank
///
/// Scores a batch of jobs for one profile, best first, dropping those under `min_score`.
pub async fn handle_rank(
    State(state): State<AppState>,
    Json(request): Json<RankRequest>,
) -> Result<Json<RankResponse>, AppError> {
    if request.min_score > 100 {
        return Err(AppError::Validation(
            "min_score must be within 0..=100".to_string(),
        ));
    }
    if request.jobs.len() > MAX_RANK_BATCH {
        return Err(AppError::Validation(format!(
            "at most {MAX_RANK_BATCH} jobs can be ranked per request"
        )));
    }

    let now = request.now.unwrap_or_else(Utc::now);
    let results = state
        .matcher
        .rank(&request.profile, &request.jobs, now, request.min_score)
        .await?;

    Ok(Json(RankResponse {
        results,
        total_considered: request.jobs.len(),
        embedding_provider: state.matcher.provider_name(),
    }))
}

/// POST /api/v1/matches/gaps
///
/// Required skills across the given jobs that the profile lacks, by demand.
pub async fn handle_skill_gaps(
    State(state): State<AppState>,
    Json(request): Json<SkillGapRequest>,
) -> Result<Json<SkillGapReport>, AppError> {
    let top_n = request.top_n.unwrap_or(DEFAULT_TOP_GAPS);
    if !(1..=MAX_TOP_GAPS).contains(&top_n) {
        return Err(AppError::Validation(format!(
            "top_n must be within 1..={MAX_TOP_GAPS}"
        )));
    }
    if request.jobs.len() > MAX_RANK_BATCH {
        return Err(AppError::Validation(format!(
            "at most {MAX_RANK_BATCH} jobs can be analysed per request"
        )));
    }

    let report = state
        .matcher
        .skill_gaps(&request.profile, &request.jobs, top_n)
        .await?;
    Ok(Json(report))
}
