// Match scoring: embeddings → set similarity → six component scorers → weighted breakdown.
// Scoring itself is synchronous and pure; only phrase resolution touches the embedding provider.

pub mod aggregator;
pub mod embedding;
pub mod engine;
pub mod gaps;
pub mod handlers;
pub mod scorers;
pub mod similarity;
