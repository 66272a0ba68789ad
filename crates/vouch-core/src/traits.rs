//! Trait interfaces for the Vouch engine.
//!
//! These traits define the contracts between crates:
//! - [`StateTxn`] / [`Ledger`]: transactional key-value store (in-memory here,
//!   RocksDB in vouch-node)
//! - [`Notifier`]: post-commit event sink
//! - [`BeliefModel`]: reputation math (vouch-belief implements)

use crate::codec;
use crate::error::{EngineError, LedgerError};
use crate::types::{Notification, Reputation, SystemConfig, TxContext};

/// One open transaction against the state store.
///
/// Reads observe the transaction's own pending writes. Nothing becomes
/// visible to other transactions until [`Ledger::commit`] succeeds.
pub trait StateTxn {
    /// Caller identity and clock of this transaction.
    fn context(&self) -> &TxContext;

    /// Read a value. Point reads join the read set that commit validates.
    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Buffer a write.
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError>;

    /// All `(key, value)` pairs whose key starts with `prefix`, in key order.
    ///
    /// Range reads are not validated at commit; use them for queries only.
    fn scan_prefix(&mut self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, LedgerError>;

    /// Queue a notification for delivery after a successful commit.
    fn emit(&mut self, notification: Notification);
}

/// Typed record access on top of [`StateTxn`].
pub trait StateTxnExt: StateTxn {
    fn get_record<T: bincode::Decode<()>>(&mut self, key: &str) -> Result<Option<T>, LedgerError> {
        match self.get_state(key)? {
            Some(bytes) => codec::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn put_record<T: bincode::Encode>(&mut self, key: &str, value: &T) -> Result<(), LedgerError> {
        let bytes = codec::encode(value)?;
        self.put_state(key, bytes)
    }

    fn scan_records<T: bincode::Decode<()>>(&mut self, prefix: &str) -> Result<Vec<T>, LedgerError> {
        self.scan_prefix(prefix)?
            .into_iter()
            .map(|(_, bytes)| codec::decode(&bytes))
            .collect()
    }
}

impl<S: StateTxn + ?Sized> StateTxnExt for S {}

/// Transactional key-value store with optimistic conflict detection.
pub trait Ledger: Send + Sync {
    type Txn<'a>: StateTxn
    where
        Self: 'a;

    /// Open a transaction. Dropping it without committing discards it.
    fn begin(&self, ctx: TxContext) -> Result<Self::Txn<'_>, LedgerError>;

    /// Atomically apply the transaction's writes.
    ///
    /// Fails with [`LedgerError::Conflict`] when a key it read was changed by
    /// another commit in the meantime; nothing is applied in that case.
    /// Returns the notifications the transaction emitted.
    fn commit(&self, txn: Self::Txn<'_>) -> Result<Vec<Notification>, LedgerError>;
}

/// Sink for notifications of committed transactions. Fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Notifier that writes every event to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        tracing::info!(
            topic = %notification.topic,
            payload = %String::from_utf8_lossy(&notification.payload),
            "event"
        );
    }
}

/// Beta-distribution reputation math.
///
/// Pure functions over records; implementations hold no state.
pub trait BeliefModel: Send + Sync {
    /// Decay-adjusted projection of `rep` at time `now`. Never below the prior.
    fn decayed(&self, rep: &Reputation, config: &SystemConfig, now: i64) -> Reputation;

    /// Decay to `now`, then fold in one weighted observation.
    fn observe(
        &self,
        rep: &Reputation,
        config: &SystemConfig,
        value: f64,
        weight: f64,
        now: i64,
    ) -> Reputation;

    /// Remove a previously folded observation without decaying.
    fn retract(&self, rep: &Reputation, config: &SystemConfig, value: f64, weight: f64) -> Reputation;

    /// Wilson score interval for `(alpha, beta)` at `level` (0.95 or 0.99).
    fn interval(&self, alpha: f64, beta: f64, level: f64) -> Result<(f64, f64), EngineError>;

    /// Influence of a rater whose meta reputation is `meta` (`None` if never rated).
    fn rater_weight(&self, meta: Option<&Reputation>, config: &SystemConfig, now: i64) -> f64;
}
