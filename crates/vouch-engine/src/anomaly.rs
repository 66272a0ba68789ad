//! Best-effort anomaly flags recorded alongside rating submission.
//!
//! Telemetry only: a failure here is logged and never fails the rating.

use tracing::{info, warn};

use vouch_core::constants::{
    ANOMALY_EXTREME_HIGH, ANOMALY_EXTREME_LOW, ANOMALY_NEW_RATER_EVENTS, ANOMALY_SYBIL_CONFIDENCE,
};
use vouch_core::error::EngineError;
use vouch_core::keys::{anomaly_id, anomaly_key};
use vouch_core::traits::{StateTxn, StateTxnExt};
use vouch_core::types::{AnomalyEvent, AnomalyKind, Rating};

/// Whether a rater with `meta_events` assessed ratings submitting `value`
/// looks like a fresh identity pushing an extreme score.
pub fn is_potential_sybil(meta_events: u64, value: f64) -> bool {
    meta_events < ANOMALY_NEW_RATER_EVENTS
        && (value < ANOMALY_EXTREME_LOW || value > ANOMALY_EXTREME_HIGH)
}

/// Record a `PotentialSybil` event for `rating` when it matches.
pub fn inspect(txn: &mut dyn StateTxn, rating: &Rating, meta_events: u64) {
    if !is_potential_sybil(meta_events, rating.value) {
        return;
    }
    if let Err(e) = record(txn, rating) {
        warn!(rating = %rating.rating_id, error = %e, "anomaly: failed to record flag");
    }
}

fn record(txn: &mut dyn StateTxn, rating: &Rating) -> Result<(), EngineError> {
    let event = AnomalyEvent {
        event_id: anomaly_id(&rating.rating_id),
        kind: AnomalyKind::PotentialSybil,
        actors: vec![rating.rater.clone(), rating.target.clone()],
        confidence: ANOMALY_SYBIL_CONFIDENCE,
        description: "new rater giving extreme rating".to_string(),
        rating_id: rating.rating_id.clone(),
        timestamp: txn.context().timestamp,
    };
    txn.put_record(&anomaly_key(&event.event_id), &event)?;
    info!(
        event = %event.event_id, rater = %rating.rater, target = %rating.target,
        value = rating.value, "anomaly: potential sybil"
    );
    Ok(())
}
