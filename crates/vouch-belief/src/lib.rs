//! # vouch-belief: Beta-distribution reputation math.
//!
//! Ratings are weighted partial observations of a binary success signal,
//! accumulated into Beta(α, β) parameters whose mean is the score.
//!
//! - **Adaptive decay**: evidence regresses toward the prior over time, faster
//!   while the belief is still uncertain.
//! - **Wilson interval**: bounded uncertainty estimate that behaves for small n.
//! - **Rater weight**: a rater's influence follows their own meta reputation.

pub mod beta;
pub mod engine;
pub mod weight;
pub mod wilson;

pub use engine::BetaBelief;
pub use wilson::{wilson_interval, ConfidenceLevel};
