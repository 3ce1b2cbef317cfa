use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::matching::aggregator::{compute_match, rank_jobs, RankedJob, ScoreBreakdown};
use crate::matching::gaps::{analyze_skill_gaps, SkillGapReport};
use crate::matching::scorers::ScoringContext;
use crate::matching::similarity::{PhraseVectors, SimilarityEngine};
use crate::models::job::{CandidateProfile, JobPosting};

/// Entry point for the search layer: validates inputs, resolves every phrase of a
/// batch in one embedding pass, then scores jobs synchronously.
pub struct MatchEngine {
    similarity: SimilarityEngine,
}

impl MatchEngine {
    pub fn new(similarity: SimilarityEngine) -> Self {
        Self { similarity }
    }

    pub fn provider_name(&self) -> &'static str {
        self.similarity.provider_name()
    }

    pub async fn score(
        &self,
        profile: &CandidateProfile,
        job: &JobPosting,
        now: DateTime<Utc>,
    ) -> Result<ScoreBreakdown, AppError> {
        profile.validate()?;
        job.validate()?;

        let vectors = self.resolve_batch(profile, std::slice::from_ref(job)).await;
        let breakdown = compute_match(profile, job, &ScoringContext::new(now, &vectors));
        log_failures(&breakdown.embedding_failures, &job.id);
        Ok(breakdown)
    }

    pub async fn rank(
        &self,
        profile: &CandidateProfile,
        jobs: &[JobPosting],
        now: DateTime<Utc>,
        min_score: u8,
    ) -> Result<Vec<RankedJob>, AppError> {
        profile.validate()?;
        for job in jobs {
            job.validate()?;
        }

        let vectors = self.resolve_batch(profile, jobs).await;
        let ranked = rank_jobs(profile, jobs, &ScoringContext::new(now, &vectors), min_score);
        for r in &ranked {
            log_failures(&r.breakdown.embedding_failures, &r.job_id);
        }

        debug!(
            "Ranked {} of {} jobs (min_score={})",
            ranked.len(),
            jobs.len(),
            min_score
        );
        Ok(ranked)
    }

    /// Required skills across `jobs` that the profile lacks, most demanded first.
    pub async fn skill_gaps(
        &self,
        profile: &CandidateProfile,
        jobs: &[JobPosting],
        top_n: usize,
    ) -> Result<SkillGapReport, AppError> {
        profile.validate()?;
        for job in jobs {
            job.validate()?;
        }

        let vectors = self.resolve_batch(profile, jobs).await;
        let report = analyze_skill_gaps(profile, jobs, &vectors, top_n);
        debug!(
            "Found {} skill gaps across {} jobs",
            report.total_gaps, report.jobs_analyzed
        );
        Ok(report)
    }

    async fn resolve_batch(&self, profile: &CandidateProfile, jobs: &[JobPosting]) -> PhraseVectors {
        let phrases = profile
            .skills
            .iter()
            .chain(&profile.target_titles)
            .chain(jobs.iter().flat_map(|j| j.required_skills.iter()))
            .chain(jobs.iter().map(|j| &j.title))
            .map(String::as_str);
        self.similarity.resolve(phrases).await
    }
}

fn log_failures(failures: &[String], job_id: &str) {
    if !failures.is_empty() {
        warn!(
            job_id,
            failed = failures.len(),
            "scored with unembeddable phrases counted as unmatched"
        );
    }
}
