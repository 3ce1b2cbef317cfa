//! Embedding providers. They map skill and title phrases to fixed-length vectors.
//!
//! Default: `HashEmbedder` (feature hashing, local, deterministic, no model download).
//! Optional: `RemoteEmbedder` (any OpenAI-compatible `/embeddings` endpoint).
//!
//! `SimilarityEngine` holds an `Arc<dyn EmbeddingProvider>`, chosen at startup via config.

use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;
use thiserror::Error;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;

/// Fixed seeds: changing them changes every embedding, which invalidates cached vectors.
const HASH_SEED_K0: u64 = 0x6d61_7463_6866_6f72;
const HASH_SEED_K1: u64 = 0x6765_7363_6f72_6573;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Provider returned {got} vectors for {expected} inputs")]
    MissingVector { expected: usize, got: usize },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },
}

/// The embedding provider trait. Must be deterministic for identical input text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Embeds a batch of phrases. The returned vectors are in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

// ────────────────────────────────────────────────────────────────────────────
// HashEmbedder
// ────────────────────────────────────────────────────────────────────────────

/// Signed feature hashing over word tokens and character trigrams.
///
/// Word tokens carry most of the weight, so exact phrase matches score 1.0.
/// Trigrams give partial credit to spelling variants ("Postgres" / "PostgreSQL").
/// Text with no alphanumeric content embeds to the zero vector.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn hash(&self, token: &str) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        token.hash(&mut hasher);
        hasher.finish()
    }

    fn add_feature(&self, vector: &mut [f32], token: &str, weight: f32) {
        let h = self.hash(token);
        let idx = (h % self.dimension as u64) as usize;
        // top bit picks the sign so collisions tend to cancel instead of pile up
        let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
        vector[idx] += sign * weight;
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for word in tokenize(text) {
            self.add_feature(&mut vector, &format!("w:{word}"), 1.0);

            let padded: Vec<char> = format!("^{word}$").chars().collect();
            for tri in padded.windows(3) {
                let tri: String = tri.iter().collect();
                self.add_feature(&mut vector, &format!("g:{tri}"), 0.35);
            }
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

/// Lowercased word tokens. Keeps `+`, `#` and `.` inside words so "C++", "C#" and
/// "Node.js" stay distinct from "C" and "Node".
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '.')))
        .map(|w| w.trim_matches('.').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn name(&self) -> &'static str {
        "hash"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RemoteEmbedder
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible embeddings endpoint.
/// Retries on 429 and 5xx with exponential backoff.
#[derive(Clone)]
pub struct RemoteEmbedder {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl RemoteEmbedder {
    pub fn new(url: String, api_key: Option<String>, model: String) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            url,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedder {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let mut last_error: Option<EmbeddingError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Embedding call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(&self.url).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(EmbeddingError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let message = response.text().await.unwrap_or_default();
                warn!("Embedding API returned {}: {}", status, message);
                last_error = Some(EmbeddingError::Api {
                    status: status.as_u16(),
                    message,
                });
                continue;
            }
            if !status.is_success() {
                return Err(EmbeddingError::Api {
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
            }

            let text = response.text().await?;
            let vectors = parse_embedding_response(&text, texts.len())?;
            debug!("Embedded {} phrases via {}", texts.len(), self.model);
            return Ok(vectors);
        }

        Err(last_error.unwrap_or(EmbeddingError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

/// Orders the returned vectors by `index`; providers are not required to keep input order.
fn parse_embedding_response(body: &str, expected: usize) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut parsed: EmbeddingResponse = serde_json::from_str(body)?;
    parsed.data.sort_by_key(|d| d.index);

    let in_range = parsed
        .data
        .iter()
        .enumerate()
        .all(|(i, d)| d.index == i);
    if parsed.data.len() != expected || !in_range {
        return Err(EmbeddingError::MissingVector {
            expected,
            got: parsed.data.len(),
        });
    }
    Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
}

// ────────────────────────────────────────────────────────────────────────────
// EmbeddingCache
// ────────────────────────────────────────────────────────────────────────────

/// Process-wide phrase → vector cache, keyed by exact phrase text.
///
/// Unbounded unless a capacity is given, in which case the oldest insertion is
/// evicted first. Two writers racing on the same key store the same vector, so
/// last-write-wins is harmless.
pub struct EmbeddingCache {
    capacity: Option<usize>,
    inner: RwLock<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    vectors: HashMap<String, Arc<[f32]>>,
    order: VecDeque<String>,
}

impl EmbeddingCache {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity: capacity.filter(|c| *c > 0),
            inner: RwLock::new(CacheInner::default()),
        }
    }

    pub fn get(&self, phrase: &str) -> Option<Arc<[f32]>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.vectors.get(phrase).cloned()
    }

    pub fn insert(&self, phrase: String, vector: Arc<[f32]>) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = inner.vectors.get_mut(&phrase) {
            *existing = vector;
            return;
        }
        if let Some(capacity) = self.capacity {
            while inner.vectors.len() >= capacity {
                let Some(oldest) = inner.order.pop_front() else {
                    break;
                };
                inner.vectors.remove(&oldest);
            }
        }
        inner.order.push_back(phrase.clone());
        inner.vectors.insert(phrase, vector);
    }
}
