//! Match aggregation. Runs every scorer in the factor table and combines the
//! sub-scores into one explainable breakdown.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::matching::scorers::{
    score_experience, score_location, score_recency, score_salary, score_skills, score_title,
    ScoringContext,
};
use crate::models::job::{CandidateProfile, JobPosting};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MatchFactor {
    Skills,
    Experience,
    Salary,
    Location,
    Title,
    Recency,
}

pub type ScorerFn = fn(&CandidateProfile, &JobPosting, &ScoringContext) -> u8;

pub struct FactorEntry {
    pub factor: MatchFactor,
    /// Integer percent. The table sums to 100.
    pub weight_pct: u32,
    pub scorer: ScorerFn,
}

/// The fixed scorer table. Weights and scorers stay side by side.
pub const FACTORS: [FactorEntry; 6] = [
    FactorEntry {
        factor: MatchFactor::Skills,
        weight_pct: 35,
        scorer: score_skills,
    },
    FactorEntry {
        factor: MatchFactor::Experience,
        weight_pct: 20,
        scorer: score_experience,
    },
    FactorEntry {
        factor: MatchFactor::Salary,
        weight_pct: 15,
        scorer: score_salary,
    },
    FactorEntry {
        factor: MatchFactor::Location,
        weight_pct: 15,
        scorer: score_location,
    },
    FactorEntry {
        factor: MatchFactor::Title,
        weight_pct: 10,
        scorer: score_title,
    },
    FactorEntry {
        factor: MatchFactor::Recency,
        weight_pct: 5,
        scorer: score_recency,
    },
];

/// Total plus the six component scores, all in 0..=100.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub total_score: u8,
    pub components: BTreeMap<MatchFactor, u8>,
    /// Phrases of this pair that could not be embedded; they scored as unmatched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding_failures: Vec<String>,
}

#[cfg(test)]
impl ScoreBreakdown {
    pub fn component(&self, factor: MatchFactor) -> u8 {
        self.components.get(&factor).copied().unwrap_or(0)
    }
}

/// Weighted total, rounded half up: `round(Σ weight_pct × component / 100)`.
pub fn weighted_total(components: &BTreeMap<MatchFactor, u8>) -> u8 {
    let sum: u32 = FACTORS
        .iter()
        .map(|entry| {
            entry.weight_pct * components.get(&entry.factor).copied().unwrap_or(0) as u32
        })
        .sum();
    ((sum + 50) / 100).min(100) as u8
}

/// Scores one job for one profile. Never fails: sparse job data is absorbed by
/// each scorer's own default.
pub fn compute_match(
    profile: &CandidateProfile,
    job: &JobPosting,
    ctx: &ScoringContext,
) -> ScoreBreakdown {
    let components: BTreeMap<MatchFactor, u8> = FACTORS
        .iter()
        .map(|entry| (entry.factor, (entry.scorer)(profile, job, ctx).min(100)))
        .collect();

    ScoreBreakdown {
        total_score: weighted_total(&components),
        components,
        embedding_failures: unresolved_phrases(profile, job, ctx),
    }
}

fn unresolved_phrases(
    profile: &CandidateProfile,
    job: &JobPosting,
    ctx: &ScoringContext,
) -> Vec<String> {
    let mut failed: Vec<String> = Vec::new();
    let phrases = profile
        .skills
        .iter()
        .chain(&profile.target_titles)
        .chain(&job.required_skills)
        .chain(std::iter::once(&job.title));

    for phrase in phrases {
        if ctx.vectors.get(phrase).is_none() && !failed.contains(phrase) {
            failed.push(phrase.clone());
        }
    }
    failed
}

/// A scored job as returned by ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedJob {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub breakdown: ScoreBreakdown,
}

/// Scores every job, drops those under `min_score`, and sorts best first.
/// Jobs with equal totals keep their input order.
pub fn rank_jobs(
    profile: &CandidateProfile,
    jobs: &[JobPosting],
    ctx: &ScoringContext,
    min_score: u8,
) -> Vec<RankedJob> {
    let mut ranked: Vec<RankedJob> = jobs
        .iter()
        .map(|job| RankedJob {
            job_id: job.id.clone(),
            title: job.title.clone(),
            company: job.company.clone(),
            breakdown: compute_match(profile, job, ctx),
        })
        .filter(|r| r.breakdown.total_score >= min_score)
        .collect();

    ranked.sort_by(|a, b| b.breakdown.total_score.cmp(&a.breakdown.total_score));
    ranked
}
