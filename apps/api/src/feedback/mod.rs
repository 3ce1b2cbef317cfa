// Feedback: append-only interaction events and the bucketed metrics that validate match scores.

pub mod handlers;
pub mod metrics;
pub mod store;
