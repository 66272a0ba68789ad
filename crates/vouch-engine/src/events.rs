//! Notification topics and transaction helpers shared by the operations.

use vouch_core::identity::normalize;
use vouch_core::traits::StateTxn;
use vouch_core::types::Notification;

pub const TOPIC_CONFIG: &str = "config";
pub const TOPIC_STAKE: &str = "stake";
pub const TOPIC_RATING_SUBMITTED: &str = "rating.submitted";
pub const TOPIC_DISPUTE_INITIATED: &str = "dispute.initiated";
pub const TOPIC_DISPUTE_RESOLVED: &str = "dispute.resolved";

/// Queue a JSON notification. Notifications are fire-and-forget.
pub(crate) fn emit(txn: &mut dyn StateTxn, topic: &str, body: serde_json::Value) {
    match Notification::json(topic, &body) {
        Ok(n) => txn.emit(n),
        Err(e) => tracing::warn!(topic, error = %e, "events: dropped notification"),
    }
}

/// Normalized identity of the transaction's caller.
pub(crate) fn caller(txn: &dyn StateTxn) -> String {
    normalize(&txn.context().caller)
}

/// Transaction timestamp.
pub(crate) fn now(txn: &dyn StateTxn) -> i64 {
    txn.context().timestamp
}
