//! Feedback metrics: buckets historical (score, outcome) events to check that
//! higher match scores really lead to more engagement.
//!
//! Pure and read-only over the event snapshot: no mutation, reordering or dedup.
//! All sums are integer, so the output does not depend on event order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::feedback::{FeedbackEvent, FeedbackEventType, OutcomeType};

const BUCKET_WIDTH: u8 = 10;
const BUCKET_COUNT: u8 = 10;

/// A fixed 10-point score range. The top bucket is 90–100 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScoreBucket(u8);

impl ScoreBucket {
    pub fn for_score(score: u8) -> Self {
        ScoreBucket((score / BUCKET_WIDTH).min(BUCKET_COUNT - 1))
    }

    pub fn all() -> impl Iterator<Item = ScoreBucket> {
        (0..BUCKET_COUNT).map(ScoreBucket)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn range(&self) -> (u8, u8) {
        let lo = self.0 * BUCKET_WIDTH;
        let hi = if self.0 == BUCKET_COUNT - 1 {
            100
        } else {
            lo + BUCKET_WIDTH - 1
        };
        (lo, hi)
    }

    pub fn label(&self) -> String {
        let (lo, hi) = self.range();
        format!("{lo}-{hi}")
    }
}

/// Raw event counts, kept so callers can recompute or re-weight rates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCounts {
    pub views: u64,
    pub saves: u64,
    pub unsaves: u64,
    pub applies: u64,
    pub outcomes: u64,
    pub offers: u64,
}

impl EventCounts {
    fn record(&mut self, event: &FeedbackEvent) {
        match event.event_type {
            FeedbackEventType::View => self.views += 1,
            FeedbackEventType::Save => self.saves += 1,
            FeedbackEventType::Unsave => self.unsaves += 1,
            FeedbackEventType::Apply => self.applies += 1,
            FeedbackEventType::Outcome => {
                self.outcomes += 1;
                if event.outcome_type == Some(OutcomeType::Offer) {
                    self.offers += 1;
                }
            }
        }
    }
}

/// Distinct (user, job) applications in a bucket and how far they got.
/// Repeated outcome events for one application count once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationCounts {
    pub applications: u64,
    pub reached_outcome: u64,
    pub offers: u64,
}

/// Per-bucket stats. A rate is `None` when its denominator is zero ("no data"),
/// which is different from a defined `Some(0.0)` ("no success").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsBucket {
    pub label: String,
    pub score_range: [u8; 2],
    pub event_count: u64,
    pub counts: EventCounts,
    pub applications: ApplicationCounts,
    pub view_to_save_rate: Option<f64>,
    pub save_to_apply_rate: Option<f64>,
    /// Fraction of applications that reached any terminal outcome.
    pub apply_to_outcome_rate: Option<f64>,
    /// Fraction of those applications that ended in an offer.
    pub outcome_quality_rate: Option<f64>,
}

impl MetricsBucket {
    fn new(
        bucket: ScoreBucket,
        event_count: u64,
        counts: EventCounts,
        applications: ApplicationCounts,
    ) -> Self {
        let (lo, hi) = bucket.range();
        Self {
            label: bucket.label(),
            score_range: [lo, hi],
            event_count,
            view_to_save_rate: ratio(counts.saves, counts.views),
            save_to_apply_rate: ratio(counts.applies, counts.saves),
            apply_to_outcome_rate: ratio(
                applications.reached_outcome,
                applications.applications,
            ),
            outcome_quality_rate: ratio(applications.offers, applications.reached_outcome),
            counts,
            applications,
        }
    }
}

/// A higher bucket converting views to saves worse than the bucket just below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateInversion {
    pub lower_bucket: String,
    pub higher_bucket: String,
    pub lower_rate: f64,
    pub higher_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackMetrics {
    /// All ten buckets, lowest first, including empty ones.
    pub buckets: Vec<MetricsBucket>,
    pub total_events: u64,
    /// Events with no recorded match score; excluded from the buckets.
    pub unscored_events: u64,
    /// Pearson correlation between match score and engagement over scored events.
    pub engagement_correlation: Option<f64>,
    pub rate_inversions: Vec<RateInversion>,
}

#[cfg(test)]
impl FeedbackMetrics {
    pub fn bucket(&self, bucket: ScoreBucket) -> &MetricsBucket {
        &self.buckets[bucket.index()]
    }

    pub fn bucket_for_score(&self, score: u8) -> &MetricsBucket {
        self.bucket(ScoreBucket::for_score(score))
    }
}

fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

/// Saves, applications and any outcome other than a rejection count as engagement.
fn is_engaged(event: &FeedbackEvent) -> bool {
    match event.event_type {
        FeedbackEventType::Save | FeedbackEventType::Apply => true,
        FeedbackEventType::Outcome => event.outcome_type != Some(OutcomeType::Reject),
        FeedbackEventType::View | FeedbackEventType::Unsave => false,
    }
}

type ApplicationKey<'a> = (Uuid, &'a str);

/// Tracks applications per bucket (by the score on their apply event) and which
/// applications reached an outcome anywhere in the log.
struct ApplicationFunnel<'a> {
    applied: Vec<HashSet<ApplicationKey<'a>>>,
    with_outcome: HashSet<ApplicationKey<'a>>,
    with_offer: HashSet<ApplicationKey<'a>>,
}

impl<'a> ApplicationFunnel<'a> {
    fn new() -> Self {
        Self {
            applied: vec![HashSet::new(); BUCKET_COUNT as usize],
            with_outcome: HashSet::new(),
            with_offer: HashSet::new(),
        }
    }

    fn record(&mut self, event: &'a FeedbackEvent) {
        let key = (event.user_id, event.job_id.as_str());
        match (event.event_type, event.match_score) {
            (FeedbackEventType::Apply, Some(score)) => {
                self.applied[ScoreBucket::for_score(score).index()].insert(key);
            }
            (FeedbackEventType::Outcome, _) => {
                self.with_outcome.insert(key);
                if event.outcome_type == Some(OutcomeType::Offer) {
                    self.with_offer.insert(key);
                }
            }
            _ => {}
        }
    }

    fn counts(&self, bucket: ScoreBucket) -> ApplicationCounts {
        let applied = &self.applied[bucket.index()];
        let reached: Vec<&ApplicationKey> = applied
            .iter()
            .filter(|key| self.with_outcome.contains(*key))
            .collect();
        let offers = reached
            .iter()
            .filter(|key| self.with_offer.contains(**key))
            .count();
        ApplicationCounts {
            applications: applied.len() as u64,
            reached_outcome: reached.len() as u64,
            offers: offers as u64,
        }
    }
}

/// Integer running sums for the score/engagement correlation.
#[derive(Default)]
struct CorrelationSums {
    n: i128,
    sum_x: i128,
    sum_y: i128,
    sum_xx: i128,
    sum_yy: i128,
    sum_xy: i128,
}

impl CorrelationSums {
    fn add(&mut self, score: u8, engaged: bool) {
        let x = score as i128;
        let y = engaged as i128;
        self.n += 1;
        self.sum_x += x;
        self.sum_y += y;
        self.sum_xx += x * x;
        self.sum_yy += y * y;
        self.sum_xy += x * y;
    }

    fn pearson(&self) -> Option<f64> {
        if self.n < 2 {
            return None;
        }
        let cov = self.n * self.sum_xy - self.sum_x * self.sum_y;
        let var_x = self.n * self.sum_xx - self.sum_x * self.sum_x;
        let var_y = self.n * self.sum_yy - self.sum_y * self.sum_y;
        if var_x == 0 || var_y == 0 {
            return None;
        }
        let r = cov as f64 / ((var_x as f64).sqrt() * (var_y as f64).sqrt());
        Some(r.clamp(-1.0, 1.0))
    }
}

fn find_inversions(buckets: &[MetricsBucket]) -> Vec<RateInversion> {
    buckets
        .windows(2)
        .filter_map(|pair| {
            let (lower, higher) = (&pair[0], &pair[1]);
            match (lower.view_to_save_rate, higher.view_to_save_rate) {
                (Some(lower_rate), Some(higher_rate)) if higher_rate < lower_rate => {
                    Some(RateInversion {
                        lower_bucket: lower.label.clone(),
                        higher_bucket: higher.label.clone(),
                        lower_rate,
                        higher_rate,
                    })
                }
                _ => None,
            }
        })
        .collect()
}

/// Buckets events by their recorded match score and computes per-bucket rates.
pub fn aggregate_metrics(events: &[FeedbackEvent]) -> FeedbackMetrics {
    let mut counts: Vec<EventCounts> = vec![EventCounts::default(); BUCKET_COUNT as usize];
    let mut event_counts = vec![0u64; BUCKET_COUNT as usize];
    let mut unscored_events = 0u64;
    let mut correlation = CorrelationSums::default();
    let mut funnel = ApplicationFunnel::new();

    for event in events {
        funnel.record(event);
        let Some(score) = event.match_score else {
            unscored_events += 1;
            continue;
        };
        let idx = ScoreBucket::for_score(score).index();
        event_counts[idx] += 1;
        counts[idx].record(event);
        correlation.add(score, is_engaged(event));
    }

    let buckets: Vec<MetricsBucket> = ScoreBucket::all()
        .zip(counts)
        .zip(event_counts)
        .map(|((bucket, counts), event_count)| {
            MetricsBucket::new(bucket, event_count, counts, funnel.counts(bucket))
        })
        .collect();

    FeedbackMetrics {
        rate_inversions: find_inversions(&buckets),
        buckets,
        total_events: events.len() as u64,
        unscored_events,
        engagement_correlation: correlation.pearson(),
    }
}
