use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemotePreference {
    #[default]
    Any,
    Remote,
    Onsite,
    Hybrid,
}

/// The candidate side of a match. Immutable for the duration of a scoring call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub skills: Vec<String>,
    pub years_experience: f64,
    pub target_titles: Vec<String>,
    pub salary_min: f64,
    pub salary_max: f64,
    #[serde(default)]
    pub remote_preference: RemotePreference,
    /// Cities or regions the candidate can commute to. Empty means "anywhere".
    #[serde(default)]
    pub preferred_locations: Vec<String>,
}

/// A posting as fetched from a third-party job API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub min_experience: Option<f64>,
    pub max_experience: Option<f64>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub is_remote: bool,
    pub posted_at: Option<DateTime<Utc>>,
}

impl CandidateProfile {
    /// Rejects profiles that break the data-model invariants instead of coercing them.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.years_experience.is_finite() || self.years_experience < 0.0 {
            return Err(AppError::Validation(format!(
                "years_experience must be a non-negative number, got {}",
                self.years_experience
            )));
        }
        if !self.salary_min.is_finite() || !self.salary_max.is_finite() || self.salary_min < 0.0 {
            return Err(AppError::Validation(
                "salary range must be non-negative finite numbers".to_string(),
            ));
        }
        if self.salary_min > self.salary_max {
            return Err(AppError::Validation(format!(
                "salary_min ({}) exceeds salary_max ({})",
                self.salary_min, self.salary_max
            )));
        }
        Ok(())
    }
}

impl JobPosting {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.id.trim().is_empty() {
            return Err(AppError::Validation("job id cannot be empty".to_string()));
        }
        check_optional_range(
            &self.id,
            "experience",
            self.min_experience,
            self.max_experience,
        )?;
        check_optional_range(&self.id, "salary", self.salary_min, self.salary_max)
    }
}

fn check_optional_range(
    job_id: &str,
    field: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<(), AppError> {
    for value in [min, max].into_iter().flatten() {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::Validation(format!(
                "job {job_id}: {field} bounds must be non-negative numbers"
            )));
        }
    }
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(AppError::Validation(format!(
                "job {job_id}: min {field} ({lo}) exceeds max {field} ({hi})"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn profile() -> CandidateProfile {
        CandidateProfile {
            skills: vec!["Python".into(), "AWS".into(), "Docker".into()],
            years_experience: 5.0,
            target_titles: vec!["Senior Developer".into()],
            salary_min: 120_000.0,
            salary_max: 140_000.0,
            remote_preference: RemotePreference::Remote,
            preferred_locations: vec![],
        }
    }

    pub fn job(posted_at: DateTime<Utc>) -> JobPosting {
        JobPosting {
            id: "job-1".into(),
            title: "Senior Developer".into(),
            company: "Acme".into(),
            required_skills: vec!["Python".into(), "ML".into(), "AWS".into()],
            min_experience: Some(3.0),
            max_experience: Some(7.0),
            salary_min: Some(110_000.0),
            salary_max: Some(135_000.0),
            location: "Berlin".into(),
            is_remote: true,
            posted_at: Some(posted_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{job, profile};
    use super::*;

    #[test]
    fn test_valid_profile_passes() {
        assert!(profile().validate().is_ok());
    }

    #[test]
    fn test_negative_experience_rejected() {
        let mut p = profile();
        p.years_experience = -1.0;
        assert!(matches!(p.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_inverted_salary_rejected() {
        let mut p = profile();
        p.salary_min = 150_000.0;
        assert!(matches!(p.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_job_with_inverted_experience_rejected() {
        let mut j = job(Utc::now());
        j.min_experience = Some(8.0);
        j.max_experience = Some(2.0);
        let err = j.validate().unwrap_err();
        assert!(err.to_string().contains("experience"));
    }

    #[test]
    fn test_job_with_missing_salary_is_valid() {
        let mut j = job(Utc::now());
        j.salary_min = None;
        j.salary_max = None;
        j.posted_at = None;
        assert!(j.validate().is_ok());
    }

    #[test]
    fn test_remote_preference_defaults_to_any() {
        let p: CandidateProfile = serde_json::from_value(serde_json::json!({
            "skills": ["rust"],
            "years_experience": 2,
            "target_titles": [],
            "salary_min": 1,
            "salary_max": 2
        }))
        .unwrap();
        assert_eq!(p.remote_preference, RemotePreference::Any);
        assert!(p.preferred_locations.is_empty());
    }
}
