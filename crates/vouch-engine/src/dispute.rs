//! Dispute State Machine.
//!
//! `Pending` → `Upheld` | `Overturned`, exactly once. Resolution touches the
//! dispute, both parties' stake, the rater's meta reputation and (when
//! overturned) the target's reputation in a single transaction.

use serde_json::json;
use tracing::info;

use vouch_core::constants::default_meta_dimension;
use vouch_core::error::EngineError;
use vouch_core::keys::{dispute_id, dispute_key, rating_key};
use vouch_core::traits::{BeliefModel, StateTxn, StateTxnExt};
use vouch_core::types::{Dispute, DisputeStatus, Rating, Role, Verdict};

use crate::events::{self, TOPIC_DISPUTE_INITIATED, TOPIC_DISPUTE_RESOLVED};
use crate::{config_store, reputation, stake};

/// Meta-observation value recorded for the rater under each verdict.
fn meta_value(verdict: Verdict) -> f64 {
    match verdict {
        Verdict::Upheld => 1.0,
        Verdict::Overturned => 0.0,
    }
}

pub fn load_rating(txn: &mut dyn StateTxn, rating_id: &str) -> Result<Rating, EngineError> {
    txn.get_record(&rating_key(rating_id))?
        .ok_or_else(|| EngineError::RatingNotFound(rating_id.to_string()))
}

pub fn load_dispute(txn: &mut dyn StateTxn, dispute_id: &str) -> Result<Dispute, EngineError> {
    txn.get_record(&dispute_key(dispute_id))?
        .ok_or_else(|| EngineError::DisputeNotFound(dispute_id.to_string()))
}

/// Challenge a rating. Only the rated actor may do so; the configured
/// dispute cost is locked from their stake until resolution.
///
/// Re-initiating a pending dispute returns its id.
pub fn initiate_dispute(txn: &mut dyn StateTxn, rating_id: &str, reason: &str) -> Result<String, EngineError> {
    let config = config_store::load(txn)?;
    let rating = load_rating(txn, rating_id)?;
    let initiator = events::caller(txn);
    if initiator != rating.target {
        return Err(EngineError::Unauthorized(format!(
            "only {} may dispute rating {rating_id}",
            rating.target
        )));
    }

    let id = dispute_id(rating_id, &initiator);
    if let Some(existing) = txn.get_record::<Dispute>(&dispute_key(&id))? {
        if existing.status.is_terminal() {
            return Err(EngineError::AlreadyResolved(id));
        }
        return Ok(id);
    }

    stake::lock_for_dispute(txn, &initiator, config.dispute_cost)?;
    let now = events::now(txn);
    let dispute = Dispute {
        dispute_id: id.clone(),
        rating_id: rating_id.to_string(),
        initiator,
        rater: rating.rater,
        target: rating.target,
        dimension: rating.dimension,
        reason: reason.trim().to_string(),
        status: DisputeStatus::Pending,
        arbitrator: None,
        notes: String::new(),
        cost_locked: config.dispute_cost,
        slashed_amount: 0.0,
        created_at: now,
        resolved_at: None,
    };
    txn.put_record(&dispute_key(&id), &dispute)?;

    info!(dispute = %id, rating = %rating_id, initiator = %dispute.initiator, "dispute: initiated");
    events::emit(
        txn,
        TOPIC_DISPUTE_INITIATED,
        json!({
            "dispute_id": id,
            "rating_id": rating_id,
            "initiator": dispute.initiator,
            "rater": dispute.rater,
            "cost_locked": dispute.cost_locked,
        }),
    );
    Ok(id)
}

/// Resolve a pending dispute with `verdict` (`upheld` or `overturned`).
pub fn resolve_dispute(
    txn: &mut dyn StateTxn,
    model: &dyn BeliefModel,
    dispute_id: &str,
    verdict: &str,
    notes: &str,
) -> Result<Dispute, EngineError> {
    let verdict: Verdict = verdict.parse()?;
    let config = config_store::load(txn)?;
    let arbitrator = events::caller(txn);
    if !config.has_role(Role::Arbitrator, &arbitrator) {
        return Err(EngineError::Unauthorized(format!("{arbitrator} is not an arbitrator")));
    }

    let mut dispute = load_dispute(txn, dispute_id)?;
    if dispute.status.is_terminal() {
        return Err(EngineError::AlreadyResolved(dispute_id.to_string()));
    }
    let rating = load_rating(txn, &dispute.rating_id)?;
    if arbitrator == rating.rater || arbitrator == rating.target {
        return Err(EngineError::Unauthorized(format!(
            "{arbitrator} is a party to rating {}",
            rating.rating_id
        )));
    }
    // A mapping removed after the rating was submitted must not strand the
    // dispute (and the initiator's locked cost) in Pending.
    let meta_dimension = config
        .meta_dimension_for(&rating.dimension)
        .map_or_else(|| default_meta_dimension(&rating.dimension), str::to_string);

    reputation::update(
        txn, model, &config, &rating.rater, &meta_dimension, meta_value(verdict), 1.0,
    )?;

    let slashed = match verdict {
        Verdict::Upheld => 0.0,
        Verdict::Overturned => {
            reputation::reverse(
                txn, model, &config, &rating.target, &rating.dimension, rating.value, rating.weight,
            )?;
            stake::slash(txn, &rating.rater, config.slash_fraction)?
        }
    };
    stake::release_lock(txn, &dispute.initiator, dispute.cost_locked)?;

    dispute.status = verdict.into();
    dispute.arbitrator = Some(arbitrator);
    dispute.notes = notes.trim().to_string();
    dispute.slashed_amount = slashed;
    dispute.resolved_at = Some(events::now(txn));
    txn.put_record(&dispute_key(dispute_id), &dispute)?;

    info!(dispute = %dispute_id, %verdict, slashed, rater = %rating.rater, "dispute: resolved");
    events::emit(
        txn,
        TOPIC_DISPUTE_RESOLVED,
        json!({
            "dispute_id": dispute_id,
            "verdict": verdict.to_string(),
            "arbitrator": dispute.arbitrator,
            "slashed": slashed,
        }),
    );
    Ok(dispute)
}
