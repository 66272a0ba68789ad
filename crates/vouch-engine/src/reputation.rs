//! Reputation Store: per-(actor, dimension) Beta state.
//!
//! Decay is a view-time projection. Stored parameters only change inside
//! [`update`] (which decays to the transaction time before adding evidence)
//! and [`reverse`].

use tracing::debug;

use vouch_core::error::EngineError;
use vouch_core::keys::reputation_key;
use vouch_core::traits::{BeliefModel, StateTxn, StateTxnExt};
use vouch_core::types::{Reputation, SystemConfig};

use crate::events;

pub fn stored(txn: &mut dyn StateTxn, actor: &str, dimension: &str) -> Result<Option<Reputation>, EngineError> {
    Ok(txn.get_record(&reputation_key(actor, dimension))?)
}

/// Stored reputation, or the prior. The prior is not persisted.
pub fn get_or_init(
    txn: &mut dyn StateTxn,
    config: &SystemConfig,
    actor: &str,
    dimension: &str,
) -> Result<Reputation, EngineError> {
    let now = events::now(txn);
    Ok(stored(txn, actor, dimension)?
        .unwrap_or_else(|| Reputation::prior(actor, dimension, config, now)))
}

/// Decay-adjusted view at the transaction time.
pub fn effective(
    txn: &mut dyn StateTxn,
    model: &dyn BeliefModel,
    config: &SystemConfig,
    actor: &str,
    dimension: &str,
) -> Result<Reputation, EngineError> {
    let rep = get_or_init(txn, config, actor, dimension)?;
    Ok(model.decayed(&rep, config, events::now(txn)))
}

fn check_observation(value: f64, weight: f64) -> Result<(), EngineError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(EngineError::InvalidValue(value));
    }
    if !weight.is_finite() || weight <= 0.0 {
        return Err(EngineError::InvalidInput(format!("weight must be positive, got {weight}")));
    }
    Ok(())
}

/// Decay to now, fold in one weighted observation, persist.
pub fn update(
    txn: &mut dyn StateTxn,
    model: &dyn BeliefModel,
    config: &SystemConfig,
    actor: &str,
    dimension: &str,
    value: f64,
    weight: f64,
) -> Result<Reputation, EngineError> {
    check_observation(value, weight)?;
    let current = get_or_init(txn, config, actor, dimension)?;
    let next = model.observe(&current, config, value, weight, events::now(txn));
    txn.put_record(&reputation_key(actor, dimension), &next)?;
    debug!(
        %actor, %dimension, value, weight,
        alpha = next.alpha, beta = next.beta, events = next.total_events,
        "reputation: updated"
    );
    Ok(next)
}

/// Subtract a previously applied observation, clamped at the prior.
/// Does not decay and does not move the last-update time.
pub fn reverse(
    txn: &mut dyn StateTxn,
    model: &dyn BeliefModel,
    config: &SystemConfig,
    actor: &str,
    dimension: &str,
    value: f64,
    weight: f64,
) -> Result<Reputation, EngineError> {
    check_observation(value, weight)?;
    let current = get_or_init(txn, config, actor, dimension)?;
    let next = model.retract(&current, config, value, weight);
    txn.put_record(&reputation_key(actor, dimension), &next)?;
    debug!(
        %actor, %dimension, value, weight,
        alpha = next.alpha, beta = next.beta, events = next.total_events,
        "reputation: reversed"
    );
    Ok(next)
}
