//! Belief engine implementing the [`BeliefModel`] trait.

use vouch_core::constants::POSITIVE_THRESHOLD;
use vouch_core::error::EngineError;
use vouch_core::traits::BeliefModel;
use vouch_core::types::{Reputation, SystemConfig};

use crate::beta::{adaptive_rate, decay_factor, scale_to_floor};
use crate::weight::weight_from_meta;
use crate::wilson::{wilson_interval, ConfidenceLevel};

/// The production Beta-distribution belief model.
///
/// Stateless; every call is a pure function of its arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct BetaBelief;

impl BetaBelief {
    pub fn new() -> Self {
        Self
    }
}

impl BeliefModel for BetaBelief {
    fn decayed(&self, rep: &Reputation, config: &SystemConfig, now: i64) -> Reputation {
        let rate = adaptive_rate(config.decay_rate, rep.alpha, rep.beta);
        let factor = decay_factor(rate, now.saturating_sub(rep.last_ts), config.decay_period_secs);
        let (alpha, beta) =
            scale_to_floor(rep.alpha, rep.beta, factor, config.alpha0, config.beta0);
        Reputation { alpha, beta, ..rep.clone() }
    }

    fn observe(
        &self,
        rep: &Reputation,
        config: &SystemConfig,
        value: f64,
        weight: f64,
        now: i64,
    ) -> Reputation {
        let mut next = self.decayed(rep, config, now);
        if value >= POSITIVE_THRESHOLD {
            next.alpha += weight * value;
        } else {
            next.beta += weight * (1.0 - value);
        }
        next.total_events = next.total_events.saturating_add(1);
        next.last_ts = now.max(rep.last_ts);
        tracing::trace!(
            actor = %next.actor, dimension = %next.dimension,
            alpha = next.alpha, beta = next.beta, "belief: observed"
        );
        next
    }

    fn retract(&self, rep: &Reputation, config: &SystemConfig, value: f64, weight: f64) -> Reputation {
        let mut next = rep.clone();
        if value >= POSITIVE_THRESHOLD {
            next.alpha = (next.alpha - weight * value).max(config.alpha0);
        } else {
            next.beta = (next.beta - weight * (1.0 - value)).max(config.beta0);
        }
        next.total_events = next.total_events.saturating_sub(1);
        next
    }

    fn interval(&self, alpha: f64, beta: f64, level: f64) -> Result<(f64, f64), EngineError> {
        let level = ConfidenceLevel::from_level(level)?;
        Ok(wilson_interval(alpha, beta, level))
    }

    fn rater_weight(&self, meta: Option<&Reputation>, config: &SystemConfig, now: i64) -> f64 {
        let Some(meta) = meta else {
            return config.min_rater_weight;
        };
        let effective = self.decayed(meta, config, now);
        weight_from_meta(
            effective.score(),
            effective.alpha + effective.beta,
            config.min_rater_weight,
            config.max_rater_weight,
        )
    }
}
