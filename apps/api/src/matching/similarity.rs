//! Set-to-set phrase similarity.
//!
//! Phrases are resolved to vectors in one batch (`SimilarityEngine::resolve`), after
//! which every similarity lookup is synchronous against the returned `PhraseVectors`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::matching::embedding::{EmbeddingCache, EmbeddingProvider};

/// Cosine similarity clamped to [0, 1].
/// Zero-norm vectors and mismatched dimensions give 0 rather than an error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        warn!(
            a_len = a.len(),
            b_len = b.len(),
            "embedding dimension mismatch; returning zero similarity"
        );
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Result of comparing a held set against a required set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimilarityScore {
    /// Mean over held phrases of their best match in the required set, in [0, 1].
    pub score: f64,
    /// Phrases that could not be embedded. They counted as unmatched.
    pub failed_phrases: Vec<String>,
}

/// Resolved vectors for a batch of phrases. `None` marks an embedding failure.
#[derive(Debug, Clone, Default)]
pub struct PhraseVectors {
    vectors: HashMap<String, Option<Arc<[f32]>>>,
}

impl PhraseVectors {
    pub fn insert(&mut self, phrase: String, vector: Option<Arc<[f32]>>) {
        self.vectors.insert(phrase, vector);
    }

    /// The vector for a phrase, or `None` if it failed or was never resolved.
    pub fn get(&self, phrase: &str) -> Option<&[f32]> {
        self.vectors.get(phrase).and_then(|v| v.as_deref())
    }

    /// Asymmetric set similarity: for each phrase in `held`, its best cosine against
    /// any phrase in `required`, averaged over `held`. Duplicate phrases count once.
    ///
    /// Either set empty → 0.
    pub fn set_similarity(&self, held: &[String], required: &[String]) -> SimilarityScore {
        let held = dedup(held);
        let required = dedup(required);

        let mut failed_phrases: Vec<String> = Vec::new();
        let mut note_failure = |phrase: &str| {
            if !failed_phrases.iter().any(|p| p == phrase) {
                failed_phrases.push(phrase.to_string());
            }
        };

        let required_vectors: Vec<&[f32]> = required
            .iter()
            .filter_map(|phrase| {
                let vector = self.get(phrase);
                if vector.is_none() {
                    note_failure(phrase);
                }
                vector
            })
            .collect();

        if held.is_empty() || required.is_empty() {
            return SimilarityScore {
                score: 0.0,
                failed_phrases,
            };
        }

        let mut total = 0.0;
        for phrase in &held {
            let Some(vector) = self.get(phrase) else {
                note_failure(phrase);
                continue;
            };
            let best = required_vectors
                .iter()
                .map(|r| cosine_similarity(vector, r))
                .fold(0.0, f64::max);
            total += best;
        }

        SimilarityScore {
            score: (total / held.len() as f64).clamp(0.0, 1.0),
            failed_phrases,
        }
    }
}

fn dedup(phrases: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    phrases
        .iter()
        .map(String::as_str)
        .filter(|p| seen.insert(*p))
        .collect()
}

/// Embeds phrases through the configured provider, caching vectors by exact text.
pub struct SimilarityEngine {
    provider: Arc<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
}

impl SimilarityEngine {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, cache: EmbeddingCache) -> Self {
        Self { provider, cache }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// De-duplicates `phrases`, serves what it can from the cache, and embeds the
    /// rest in one provider call. If the batch call fails, each phrase is retried
    /// alone so one bad phrase cannot fail its neighbours.
    pub async fn resolve<'a, I>(&self, phrases: I) -> PhraseVectors
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut resolved = PhraseVectors::default();
        let mut misses: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for phrase in phrases {
            if !seen.insert(phrase) {
                continue;
            }
            match self.cache.get(phrase) {
                Some(vector) => resolved.insert(phrase.to_string(), Some(vector)),
                None => misses.push(phrase.to_string()),
            }
        }

        if misses.is_empty() {
            return resolved;
        }

        debug!(
            "Embedding {} uncached phrases via {} provider",
            misses.len(),
            self.provider.name()
        );

        match self.provider.embed_batch(&misses).await {
            Ok(vectors) => {
                for (phrase, vector) in misses.into_iter().zip(vectors) {
                    self.store(&mut resolved, phrase, vector);
                }
            }
            Err(e) if misses.len() > 1 => {
                warn!(
                    "Batch embedding of {} phrases failed ({e}); retrying individually",
                    misses.len()
                );
                for phrase in misses {
                    self.resolve_single(&mut resolved, phrase).await;
                }
            }
            Err(e) => {
                warn!("Embedding failed for 1 phrase: {e}");
                for phrase in misses {
                    resolved.insert(phrase, None);
                }
            }
        }

        resolved
    }

    async fn resolve_single(&self, resolved: &mut PhraseVectors, phrase: String) {
        let batch = std::slice::from_ref(&phrase);
        match self.provider.embed_batch(batch).await {
            Ok(mut vectors) if vectors.len() == 1 => {
                let vector = vectors.remove(0);
                self.store(resolved, phrase, vector);
            }
            Ok(_) => {
                warn!("Embedding provider returned no vector for a phrase");
                resolved.insert(phrase, None);
            }
            Err(e) => {
                warn!("Embedding failed for 1 phrase: {e}");
                resolved.insert(phrase, None);
            }
        }
    }

    fn store(&self, resolved: &mut PhraseVectors, phrase: String, vector: Vec<f32>) {
        let vector: Arc<[f32]> = Arc::from(vector);
        self.cache.insert(phrase.clone(), vector.clone());
        resolved.insert(phrase, Some(vector));
    }
}
