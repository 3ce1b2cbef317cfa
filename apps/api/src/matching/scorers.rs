//! Component scorers: six independent functions of (profile, job, context) → 0..=100.
//!
//! Every scorer clamps and rounds its own output. Missing job data never errors:
//! each scorer falls back to its own explicit default.

use std::slice;

use chrono::{DateTime, Duration, Utc};

use crate::matching::similarity::PhraseVectors;
use crate::models::job::{CandidateProfile, JobPosting, RemotePreference};

/// Score used when the input a factor needs is absent.
pub const NEUTRAL_SCORE: u8 = 50;
/// Location credit for a mismatch the candidate could still live with.
pub const LOCATION_PARTIAL_SCORE: u8 = 50;
/// Points lost per year outside the job's experience range (5 years → 0).
pub const EXPERIENCE_FALLOFF_PER_YEAR: f64 = 20.0;
pub const RECENCY_FRESH_HOURS: i64 = 24;
pub const RECENCY_HORIZON_DAYS: i64 = 30;

/// Read-only inputs shared by all scorers for one scoring pass.
pub struct ScoringContext<'a> {
    pub now: DateTime<Utc>,
    pub vectors: &'a PhraseVectors,
}

impl<'a> ScoringContext<'a> {
    pub fn new(now: DateTime<Utc>, vectors: &'a PhraseVectors) -> Self {
        Self { now, vectors }
    }
}

/// Clamps to [0, 100] and rounds half away from zero.
pub(crate) fn to_component(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 100.0).round() as u8
}

/// Profile skills (held) against required skills (target).
pub fn score_skills(profile: &CandidateProfile, job: &JobPosting, ctx: &ScoringContext) -> u8 {
    let similarity = ctx
        .vectors
        .set_similarity(&profile.skills, &job.required_skills);
    to_component(similarity.score * 100.0)
}

pub fn score_experience(profile: &CandidateProfile, job: &JobPosting, _ctx: &ScoringContext) -> u8 {
    let min = job.min_experience.unwrap_or(0.0);
    let max = job.max_experience.unwrap_or(f64::INFINITY);
    let years = profile.years_experience;

    let gap = if years < min {
        min - years
    } else if years > max {
        years - max
    } else {
        0.0
    };

    to_component(100.0 - EXPERIENCE_FALLOFF_PER_YEAR * gap)
}

/// Full credit when the job's band sits inside the candidate's. Otherwise scores
/// how far the job's ceiling reaches into the candidate's band: 0 at or below
/// the floor, 100 from the midpoint up. Raising a job's pay never lowers its score.
pub fn score_salary(profile: &CandidateProfile, job: &JobPosting, _ctx: &ScoringContext) -> u8 {
    let (job_min, job_max) = match (job.salary_min, job.salary_max) {
        (None, None) => return NEUTRAL_SCORE,
        (Some(v), None) | (None, Some(v)) => (v, v),
        (Some(lo), Some(hi)) => (lo.min(hi), lo.max(hi)),
    };
    if profile.salary_min <= job_min && job_max <= profile.salary_max {
        return 100;
    }

    let floor = profile.salary_min;
    let midpoint = (profile.salary_min + profile.salary_max) / 2.0;

    if midpoint <= floor {
        return if job_max >= floor { 100 } else { 0 };
    }
    to_component(100.0 * (job_max - floor) / (midpoint - floor))
}

pub fn score_location(profile: &CandidateProfile, job: &JobPosting, _ctx: &ScoringContext) -> u8 {
    let commutable = is_commutable(&profile.preferred_locations, &job.location);
    let partial_or_zero = if commutable { LOCATION_PARTIAL_SCORE } else { 0 };

    match (profile.remote_preference, job.is_remote) {
        (RemotePreference::Any, _) => 100,
        (RemotePreference::Remote, true) => 100,
        (RemotePreference::Remote, false) => partial_or_zero,
        (RemotePreference::Hybrid, true) => LOCATION_PARTIAL_SCORE,
        (RemotePreference::Onsite, true) => partial_or_zero,
        (RemotePreference::Hybrid | RemotePreference::Onsite, false) => {
            if commutable {
                100
            } else {
                0
            }
        }
    }
}

/// No stated preference means any location is reachable.
fn is_commutable(preferred: &[String], job_location: &str) -> bool {
    let wanted: Vec<String> = preferred
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect();
    if wanted.is_empty() {
        return true;
    }
    let job_location = job_location.to_lowercase();
    wanted.iter().any(|p| job_location.contains(p.as_str()))
}

/// Best single-title similarity across the candidate's target titles.
pub fn score_title(profile: &CandidateProfile, job: &JobPosting, ctx: &ScoringContext) -> u8 {
    if profile.target_titles.is_empty() {
        return NEUTRAL_SCORE;
    }
    if job.title.trim().is_empty() {
        return 0;
    }

    let job_title = slice::from_ref(&job.title);
    let best = profile
        .target_titles
        .iter()
        .map(|t| {
            ctx.vectors
                .set_similarity(slice::from_ref(t), job_title)
                .score
        })
        .fold(0.0, f64::max);

    to_component(best * 100.0)
}

/// 100 inside the fresh window, then linear decay to 0 at the horizon.
pub fn score_recency(_profile: &CandidateProfile, job: &JobPosting, ctx: &ScoringContext) -> u8 {
    let Some(posted_at) = job.posted_at else {
        return NEUTRAL_SCORE;
    };

    let age = ctx.now - posted_at;
    let fresh = Duration::hours(RECENCY_FRESH_HOURS);
    let horizon = Duration::days(RECENCY_HORIZON_DAYS);

    if age <= fresh {
        return 100;
    }
    if age >= horizon {
        return 0;
    }

    let remaining = (horizon - age).num_seconds() as f64;
    let window = (horizon - fresh).num_seconds() as f64;
    to_component(100.0 * remaining / window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::fixtures::{job, profile};

    fn ctx(vectors: &PhraseVectors) -> ScoringContext<'_> {
        ScoringContext::new(Utc::now(), vectors)
    }

    fn with_salary(min: Option<f64>, max: Option<f64>) -> JobPosting {
        let mut j = job(Utc::now());
        j.salary_min = min;
        j.salary_max = max;
        j
    }

    #[test]
    fn test_to_component_clamps_and_rounds() {
        assert_eq!(to_component(-3.0), 0);
        assert_eq!(to_component(140.0), 100);
        assert_eq!(to_component(49.5), 50);
        assert_eq!(to_component(49.49), 49);
        assert_eq!(to_component(f64::NAN), 0);
    }

    #[test]
    fn test_experience_boundaries_score_full() {
        let vectors = PhraseVectors::default();
        let j = job(Utc::now());
        let mut p = profile();
        for years in [3.0, 7.0, 5.0] {
            p.years_experience = years;
            assert_eq!(score_experience(&p, &j, &ctx(&vectors)), 100, "years={years}");
        }
    }

    #[test]
    fn test_experience_ten_years_outside_scores_zero() {
        let vectors = PhraseVectors::default();
        let mut j = job(Utc::now());
        j.min_experience = Some(12.0);
        j.max_experience = Some(15.0);
        let mut p = profile();
        p.years_experience = 2.0;
        assert_eq!(score_experience(&p, &j, &ctx(&vectors)), 0);
        p.years_experience = 25.0;
        assert_eq!(score_experience(&p, &j, &ctx(&vectors)), 0);
    }

    #[test]
    fn test_experience_linear_falloff() {
        let vectors = PhraseVectors::default();
        let j = job(Utc::now());
        let mut p = profile();
        p.years_experience = 1.0;
        assert_eq!(score_experience(&p, &j, &ctx(&vectors)), 60);
        p.years_experience = 8.5;
        assert_eq!(score_experience(&p, &j, &ctx(&vectors)), 70);
        p.years_experience = 12.0;
        assert_eq!(score_experience(&p, &j, &ctx(&vectors)), 0);
    }

    #[test]
    fn test_experience_unbounded_range_is_full() {
        let vectors = PhraseVectors::default();
        let mut j = job(Utc::now());
        j.min_experience = None;
        j.max_experience = None;
        let mut p = profile();
        p.years_experience = 40.0;
        assert_eq!(score_experience(&p, &j, &ctx(&vectors)), 100);
    }

    #[test]
    fn test_salary_identical_ranges_score_full() {
        let vectors = PhraseVectors::default();
        let mut p = profile();
        p.salary_min = 100_000.0;
        p.salary_max = 120_000.0;
        let j = with_salary(Some(100_000.0), Some(120_000.0));
        assert_eq!(score_salary(&p, &j, &ctx(&vectors)), 100);
    }

    #[test]
    fn test_salary_job_below_range_scores_zero() {
        let vectors = PhraseVectors::default();
        let mut p = profile();
        p.salary_min = 150_000.0;
        p.salary_max = 160_000.0;
        let j = with_salary(Some(50_000.0), Some(60_000.0));
        assert_eq!(score_salary(&p, &j, &ctx(&vectors)), 0);
    }

    #[test]
    fn test_salary_job_above_range_scores_full() {
        let vectors = PhraseVectors::default();
        let mut p = profile();
        p.salary_min = 50_000.0;
        p.salary_max = 60_000.0;
        let j = with_salary(Some(150_000.0), Some(160_000.0));
        assert_eq!(score_salary(&p, &j, &ctx(&vectors)), 100);
    }

    #[test]
    fn test_salary_unspecified_is_neutral_regardless_of_profile() {
        let vectors = PhraseVectors::default();
        let j = with_salary(None, None);
        let mut p = profile();
        assert_eq!(score_salary(&p, &j, &ctx(&vectors)), 50);
        p.salary_min = 10.0;
        p.salary_max = 20.0;
        assert_eq!(score_salary(&p, &j, &ctx(&vectors)), 50);
    }

    #[test]
    fn test_salary_profile_containing_job_scores_full() {
        let vectors = PhraseVectors::default();
        let mut p = profile();
        p.salary_min = 100_000.0;
        p.salary_max = 200_000.0;
        let j = with_salary(Some(120_000.0), Some(130_000.0));
        assert_eq!(score_salary(&p, &j, &ctx(&vectors)), 100);
    }

    #[test]
    fn test_salary_band_reaching_into_range_is_partial() {
        let vectors = PhraseVectors::default();
        let mut p = profile();
        p.salary_min = 100_000.0;
        p.salary_max = 200_000.0;
        // ceiling 130k is 30k into a 50k floor-to-midpoint span
        let j = with_salary(Some(80_000.0), Some(130_000.0));
        assert_eq!(score_salary(&p, &j, &ctx(&vectors)), 60);
    }

    #[test]
    fn test_salary_job_covering_floor_scores_full() {
        let vectors = PhraseVectors::default();
        let p = profile(); // 120k–140k
        let j = with_salary(Some(110_000.0), Some(135_000.0));
        assert_eq!(score_salary(&p, &j, &ctx(&vectors)), 100);
    }

    #[test]
    fn test_salary_ceiling_just_above_floor_scores_low() {
        let vectors = PhraseVectors::default();
        let mut p = profile();
        p.salary_min = 100_000.0;
        p.salary_max = 200_000.0;
        let j = with_salary(Some(50_000.0), Some(101_000.0));
        assert_eq!(score_salary(&p, &j, &ctx(&vectors)), 2);
    }

    #[test]
    fn test_salary_never_drops_as_pay_rises() {
        let vectors = PhraseVectors::default();
        let mut p = profile();
        p.salary_min = 100_000.0;
        p.salary_max = 200_000.0;

        let c = ctx(&vectors);
        let low = score_salary(&p, &with_salary(Some(50_000.0), Some(101_000.0)), &c);
        let high = score_salary(&p, &with_salary(Some(120_000.0), Some(250_000.0)), &c);
        assert!(high >= low, "low={low} high={high}");

        let mut previous = 0;
        for step in 0..60 {
            let lo = 5_000.0 * step as f64;
            let score = score_salary(&p, &with_salary(Some(lo), Some(lo + 40_000.0)), &c);
            assert!(score >= previous, "score fell at {lo}: {previous} -> {score}");
            previous = score;
        }
        assert_eq!(previous, 100);
    }

    #[test]
    fn test_salary_fixed_candidate_figure() {
        let vectors = PhraseVectors::default();
        let mut p = profile();
        p.salary_min = 90_000.0;
        p.salary_max = 90_000.0;
        let c = ctx(&vectors);
        assert_eq!(score_salary(&p, &with_salary(Some(80_000.0), Some(90_000.0)), &c), 100);
        assert_eq!(score_salary(&p, &with_salary(Some(70_000.0), Some(89_000.0)), &c), 0);
    }

    #[test]
    fn test_salary_one_sided_job_range_is_a_point() {
        let vectors = PhraseVectors::default();
        let p = profile(); // 120k–140k
        assert_eq!(
            score_salary(&p, &with_salary(Some(130_000.0), None), &ctx(&vectors)),
            100
        );
        assert_eq!(
            score_salary(&p, &with_salary(None, Some(90_000.0)), &ctx(&vectors)),
            0
        );
    }

    #[test]
    fn test_location_any_always_full() {
        let vectors = PhraseVectors::default();
        let mut p = profile();
        p.remote_preference = RemotePreference::Any;
        p.preferred_locations = vec!["Tokyo".into()];
        let mut j = job(Utc::now());
        j.is_remote = false;
        assert_eq!(score_location(&p, &j, &ctx(&vectors)), 100);
    }

    #[test]
    fn test_location_remote_matches_remote_job() {
        let vectors = PhraseVectors::default();
        assert_eq!(
            score_location(&profile(), &job(Utc::now()), &ctx(&vectors)),
            100
        );
    }

    #[test]
    fn test_location_onsite_vs_remote_elsewhere_is_hard_mismatch() {
        let vectors = PhraseVectors::default();
        let mut p = profile();
        p.remote_preference = RemotePreference::Onsite;
        p.preferred_locations = vec!["Lisbon".into()];
        let j = job(Utc::now()); // remote, Berlin
        assert_eq!(score_location(&p, &j, &ctx(&vectors)), 0);
    }

    #[test]
    fn test_location_partial_credit_for_commutable_mismatch() {
        let vectors = PhraseVectors::default();
        let mut p = profile();
        p.preferred_locations = vec!["berlin".into()];
        let mut j = job(Utc::now());
        j.is_remote = false;
        j.location = "Berlin, Germany".into();
        assert_eq!(score_location(&p, &j, &ctx(&vectors)), 50);

        p.remote_preference = RemotePreference::Hybrid;
        assert_eq!(score_location(&p, &j, &ctx(&vectors)), 100);
        j.is_remote = true;
        assert_eq!(score_location(&p, &j, &ctx(&vectors)), 50);
    }

    #[test]
    fn test_location_onsite_far_away_scores_zero() {
        let vectors = PhraseVectors::default();
        let mut p = profile();
        p.remote_preference = RemotePreference::Onsite;
        p.preferred_locations = vec!["Lisbon".into()];
        let mut j = job(Utc::now());
        j.is_remote = false;
        assert_eq!(score_location(&p, &j, &ctx(&vectors)), 0);
        j.location = "Lisbon".into();
        assert_eq!(score_location(&p, &j, &ctx(&vectors)), 100);
    }

    #[test]
    fn test_title_without_targets_is_neutral() {
        let vectors = PhraseVectors::default();
        let mut p = profile();
        p.target_titles.clear();
        assert_eq!(
            score_title(&p, &job(Utc::now()), &ctx(&vectors)),
            NEUTRAL_SCORE
        );
    }

    #[test]
    fn test_title_with_unresolved_vectors_scores_zero() {
        let vectors = PhraseVectors::default();
        assert_eq!(score_title(&profile(), &job(Utc::now()), &ctx(&vectors)), 0);
    }

    #[test]
    fn test_recency_posted_now_scores_full() {
        let vectors = PhraseVectors::default();
        let now = Utc::now();
        let c = ScoringContext::new(now, &vectors);
        assert_eq!(score_recency(&profile(), &job(now), &c), 100);
    }

    #[test]
    fn test_recency_past_horizon_scores_zero() {
        let vectors = PhraseVectors::default();
        let now = Utc::now();
        let c = ScoringContext::new(now, &vectors);
        for days in [30, 31, 365] {
            assert_eq!(
                score_recency(&profile(), &job(now - Duration::days(days)), &c),
                0
            );
        }
    }

    #[test]
    fn test_recency_is_monotonic_non_increasing() {
        let vectors = PhraseVectors::default();
        let now = Utc::now();
        let c = ScoringContext::new(now, &vectors);
        let mut previous = 100;
        for hours in (0..=31 * 24).step_by(6) {
            let score = score_recency(&profile(), &job(now - Duration::hours(hours)), &c);
            assert!(score <= previous, "score rose at {hours}h: {previous} → {score}");
            previous = score;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn test_recency_missing_date_is_neutral() {
        let vectors = PhraseVectors::default();
        let mut j = job(Utc::now());
        j.posted_at = None;
        assert_eq!(score_recency(&profile(), &j, &ctx(&vectors)), NEUTRAL_SCORE);
    }

    #[test]
    fn test_recency_future_posting_counts_as_fresh() {
        let vectors = PhraseVectors::default();
        let now = Utc::now();
        let c = ScoringContext::new(now, &vectors);
        assert_eq!(
            score_recency(&profile(), &job(now + Duration::hours(5)), &c),
            100
        );
    }

    #[test]
    fn test_recency_midpoint() {
        let vectors = PhraseVectors::default();
        let now = Utc::now();
        let c = ScoringContext::new(now, &vectors);
        // 15.5 days: (30 - 15.5) / (30 - 1) = 0.5
        let posted = now - Duration::hours(15 * 24 + 12);
        assert_eq!(score_recency(&profile(), &job(posted), &c), 50);
    }
}
