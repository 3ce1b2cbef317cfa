//! Skill gap analysis: required skills across a set of target jobs that the
//! candidate does not hold, ranked by how many of those jobs ask for them.
//!
//! The set similarity runs in reverse here. Each required skill is the held side
//! and the profile's skills are the targets.

use std::collections::{HashMap, HashSet};
use std::slice;

use serde::{Deserialize, Serialize};

use crate::matching::embedding::tokenize;
use crate::matching::similarity::PhraseVectors;
use crate::models::job::{CandidateProfile, JobPosting};

pub const DEFAULT_TOP_GAPS: usize = 5;
/// Best cosine at or above which one of the candidate's skills covers a required skill.
pub const HELD_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Canonical name → common shorthands.
const SKILL_ALIASES: &[(&str, &[&str])] = &[
    ("javascript", &["js", "node.js", "nodejs"]),
    ("typescript", &["ts"]),
    ("python", &["py"]),
    ("kubernetes", &["k8s"]),
    ("postgresql", &["postgres", "psql"]),
    ("amazon web services", &["aws"]),
    ("google cloud", &["gcp"]),
    ("microsoft azure", &["azure"]),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillGap {
    /// Spelling from the first job that listed it.
    pub skill: String,
    pub jobs_requiring: usize,
    /// Share of analysed jobs requiring the skill, 0..=100.
    pub demand_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillGapReport {
    pub skill_gaps: Vec<SkillGap>,
    /// Gaps found before truncating to the requested count.
    pub total_gaps: usize,
    pub jobs_analyzed: usize,
}

struct Demand {
    key: String,
    skill: String,
    jobs: usize,
}

/// Ranks the required skills the candidate lacks, most demanded first.
/// A skill listed twice by one job counts once for that job; ties keep the
/// order in which skills first appear.
pub fn analyze_skill_gaps(
    profile: &CandidateProfile,
    jobs: &[JobPosting],
    vectors: &PhraseVectors,
    top_n: usize,
) -> SkillGapReport {
    let mut demand: Vec<Demand> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for job in jobs {
        let mut listed: HashSet<String> = HashSet::new();
        for skill in &job.required_skills {
            let key = normalize(skill);
            if key.is_empty() || !listed.insert(key.clone()) {
                continue;
            }
            match positions.get(&key) {
                Some(&i) => demand[i].jobs += 1,
                None => {
                    positions.insert(key.clone(), demand.len());
                    demand.push(Demand {
                        key,
                        skill: skill.trim().to_string(),
                        jobs: 1,
                    });
                }
            }
        }
    }

    let held: Vec<String> = profile
        .skills
        .iter()
        .map(|s| normalize(s))
        .filter(|s| !s.is_empty())
        .collect();

    let mut gaps: Vec<SkillGap> = demand
        .into_iter()
        .filter(|d| !is_held(d, &held, &profile.skills, vectors))
        .map(|d| SkillGap {
            demand_score: demand_score(d.jobs, jobs.len()),
            skill: d.skill,
            jobs_requiring: d.jobs,
        })
        .collect();

    gaps.sort_by(|a, b| b.jobs_requiring.cmp(&a.jobs_requiring));
    let total_gaps = gaps.len();
    gaps.truncate(top_n);

    SkillGapReport {
        skill_gaps: gaps,
        total_gaps,
        jobs_analyzed: jobs.len(),
    }
}

fn normalize(skill: &str) -> String {
    skill.trim().to_lowercase()
}

fn demand_score(jobs_requiring: usize, jobs_analyzed: usize) -> u8 {
    if jobs_analyzed == 0 {
        return 0;
    }
    ((jobs_requiring * 100 + jobs_analyzed / 2) / jobs_analyzed).min(100) as u8
}

fn is_held(
    required: &Demand,
    held: &[String],
    profile_skills: &[String],
    vectors: &PhraseVectors,
) -> bool {
    if held.iter().any(|h| lexical_match(&required.key, h)) {
        return true;
    }
    let similarity = vectors.set_similarity(slice::from_ref(&required.skill), profile_skills);
    similarity.score >= HELD_SIMILARITY_THRESHOLD
}

/// Equal, one skill's words contained in the other's ("AWS" / "AWS Lambda"),
/// or two names for the same thing ("Postgres" / "PostgreSQL").
fn lexical_match(a: &str, b: &str) -> bool {
    if a == b || canonical(a) == canonical(b) {
        return true;
    }
    let a_words: HashSet<String> = tokenize(a).into_iter().collect();
    let b_words: HashSet<String> = tokenize(b).into_iter().collect();
    if a_words.is_empty() || b_words.is_empty() {
        return false;
    }
    a_words.is_subset(&b_words) || b_words.is_subset(&a_words)
}

fn canonical(skill: &str) -> &str {
    SKILL_ALIASES
        .iter()
        .find(|(name, aliases)| *name == skill || aliases.contains(&skill))
        .map(|(name, _)| *name)
        .unwrap_or(skill)
}
