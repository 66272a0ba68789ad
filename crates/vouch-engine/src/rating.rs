//! Rating Submission Pipeline.
//!
//! Two-phase read: the rater's meta reputation is loaded to derive a weight,
//! then the target's reputation is loaded and updated. Both are plain key
//! lookups inside the same transaction.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use vouch_core::constants::MAX_FUTURE_SKEW_SECS;
use vouch_core::error::EngineError;
use vouch_core::identity::normalize;
use vouch_core::keys::{rating_id, rating_key};
use vouch_core::traits::{BeliefModel, StateTxn, StateTxnExt};
use vouch_core::types::{Rating, SystemConfig};

use crate::events::{self, TOPIC_RATING_SUBMITTED};
use crate::{anomaly, config_store, reputation, stake};

/// Weight a rater carries in `dimension`, plus how many times their own
/// rating accuracy has been assessed.
pub fn rater_weight(
    txn: &mut dyn StateTxn,
    model: &dyn BeliefModel,
    config: &SystemConfig,
    rater: &str,
    dimension: &str,
) -> Result<(f64, u64), EngineError> {
    let meta_dimension = config
        .meta_dimension_for(dimension)
        .ok_or_else(|| EngineError::NoMetaDimension(dimension.to_string()))?;
    let meta = reputation::stored(txn, rater, meta_dimension)?;
    let weight = model.rater_weight(meta.as_ref(), config, events::now(txn));
    Ok((weight, meta.map_or(0, |m| m.total_events)))
}

fn check_value(value: f64) -> Result<(), EngineError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EngineError::InvalidValue(value))
    }
}

fn check_dimension(config: &SystemConfig, dimension: &str) -> Result<(), EngineError> {
    if config.is_valid_dimension(dimension) {
        Ok(())
    } else {
        Err(EngineError::InvalidDimension(dimension.to_string()))
    }
}

/// Resolve the caller and the target into distinct actor keys.
fn parties(txn: &dyn StateTxn, target: &str) -> Result<(String, String), EngineError> {
    let rater = events::caller(txn);
    let target = normalize(target);
    if rater.is_empty() {
        return Err(EngineError::Unauthorized("anonymous caller".into()));
    }
    if target.is_empty() {
        return Err(EngineError::InvalidInput("target actor is required".into()));
    }
    if rater == target {
        return Err(EngineError::SelfRatingForbidden);
    }
    Ok((rater, target))
}

/// Submit a rating by the caller about `target`. Returns the rating id.
///
/// Replaying an identical call returns the same id without applying the
/// rating twice.
pub fn submit_rating(
    txn: &mut dyn StateTxn,
    model: &dyn BeliefModel,
    target: &str,
    dimension: &str,
    value: f64,
    evidence: &str,
    timestamp: i64,
) -> Result<String, EngineError> {
    let config = config_store::load(txn)?;
    check_value(value)?;
    check_dimension(&config, dimension)?;
    let now = events::now(txn);
    if timestamp <= 0 || timestamp > now.saturating_add(MAX_FUTURE_SKEW_SECS) {
        return Err(EngineError::InvalidTimestamp { got: timestamp, now });
    }
    let (rater, target) = parties(txn, target)?;

    let id = rating_id(&rater, &target, dimension, timestamp);
    if let Some(existing) = txn.get_record::<Rating>(&rating_key(&id))? {
        if existing.value == value && existing.evidence == evidence {
            debug!(rating = %id, "rating: replay of committed rating");
            return Ok(id);
        }
        return Err(EngineError::RatingIdCollision(id));
    }

    let available = stake::load(txn, &rater)?.available;
    if available < config.min_stake {
        return Err(EngineError::InsufficientStake { have: available, need: config.min_stake });
    }

    let (weight, meta_events) = rater_weight(txn, model, &config, &rater, dimension)?;
    let rating = Rating {
        rating_id: id.clone(),
        rater,
        target,
        dimension: dimension.to_string(),
        value,
        weight,
        evidence: evidence.to_string(),
        timestamp,
        tx_id: txn.context().tx_id.clone(),
    };
    txn.put_record(&rating_key(&id), &rating)?;

    let updated = reputation::update(
        txn, model, &config, &rating.target, dimension, value, weight,
    )?;
    anomaly::inspect(txn, &rating, meta_events);

    info!(
        rating = %id, rater = %rating.rater, target = %rating.target, %dimension,
        value, weight, score = updated.score(), "rating: submitted"
    );
    events::emit(
        txn,
        TOPIC_RATING_SUBMITTED,
        json!({
            "rating_id": id,
            "rater": rating.rater,
            "target": rating.target,
            "dimension": dimension,
            "value": value,
            "weight": weight,
            "score": updated.score(),
            "total_events": updated.total_events,
        }),
    );
    Ok(id)
}

/// Predicted effect of a rating the caller has not submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingImpact {
    pub current_score: f64,
    pub predicted_score: f64,
    pub score_delta: f64,
    pub rater_weight: f64,
}

/// Preview what the caller's rating of `target` would do. Writes nothing.
pub fn simulate_rating_impact(
    txn: &mut dyn StateTxn,
    model: &dyn BeliefModel,
    target: &str,
    dimension: &str,
    value: f64,
) -> Result<RatingImpact, EngineError> {
    let config = config_store::load(txn)?;
    check_value(value)?;
    check_dimension(&config, dimension)?;
    let (rater, target) = parties(txn, target)?;

    let (weight, _) = rater_weight(txn, model, &config, &rater, dimension)?;
    let now = events::now(txn);
    let current = reputation::get_or_init(txn, &config, &target, dimension)?;
    let before = model.decayed(&current, &config, now).score();
    let after = model.observe(&current, &config, value, weight, now).score();

    Ok(RatingImpact {
        current_score: before,
        predicted_score: after,
        score_delta: after - before,
        rater_weight: weight,
    })
}
