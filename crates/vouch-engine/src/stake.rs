//! Stake Ledger: available and locked balances per actor.
//!
//! Every operation is a read-modify-write of one `STK` key, so two
//! concurrent operations on the same actor conflict at commit.

use serde_json::json;
use tracing::{debug, info};

use vouch_core::error::EngineError;
use vouch_core::keys::stake_key;
use vouch_core::traits::{StateTxn, StateTxnExt};
use vouch_core::types::Stake;

use crate::events::{self, TOPIC_STAKE};

/// Stored stake of `actor`, or an empty record.
pub fn load(txn: &mut dyn StateTxn, actor: &str) -> Result<Stake, EngineError> {
    let now = events::now(txn);
    Ok(txn
        .get_record(&stake_key(actor))?
        .unwrap_or_else(|| Stake::empty(actor, now)))
}

fn save(txn: &mut dyn StateTxn, mut stake: Stake) -> Result<Stake, EngineError> {
    stake.updated_at = events::now(txn);
    txn.put_record(&stake_key(&stake.actor), &stake)?;
    Ok(stake)
}

fn check_amount(amount: f64) -> Result<(), EngineError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidAmount(amount))
    }
}

/// Credit `amount` to the caller's available balance.
pub fn deposit(txn: &mut dyn StateTxn, amount: f64) -> Result<Stake, EngineError> {
    check_amount(amount)?;
    let actor = events::caller(txn);
    if actor.is_empty() {
        return Err(EngineError::Unauthorized("anonymous caller".into()));
    }
    let mut stake = load(txn, &actor)?;
    let available = stake.available + amount;
    if !available.is_finite() {
        return Err(EngineError::InvalidAmount(amount));
    }
    stake.available = available;
    let stake = save(txn, stake)?;

    info!(%actor, amount, available = stake.available, "stake: deposit");
    events::emit(
        txn,
        TOPIC_STAKE,
        json!({ "actor": actor, "op": "deposit", "amount": amount, "available": stake.available }),
    );
    Ok(stake)
}

/// Move `cost` from available to locked.
pub fn lock_for_dispute(txn: &mut dyn StateTxn, actor: &str, cost: f64) -> Result<Stake, EngineError> {
    if !cost.is_finite() || cost < 0.0 {
        return Err(EngineError::InvalidAmount(cost));
    }
    let mut stake = load(txn, actor)?;
    if stake.available < cost {
        return Err(EngineError::InsufficientStake { have: stake.available, need: cost });
    }
    stake.available -= cost;
    stake.locked += cost;
    debug!(%actor, cost, locked = stake.locked, "stake: locked");
    save(txn, stake)
}

/// Move up to `amount` back from locked to available.
pub fn release_lock(txn: &mut dyn StateTxn, actor: &str, amount: f64) -> Result<Stake, EngineError> {
    let mut stake = load(txn, actor)?;
    let amount = amount.clamp(0.0, stake.locked);
    stake.locked -= amount;
    stake.available += amount;
    debug!(%actor, amount, available = stake.available, "stake: released");
    save(txn, stake)
}

/// Forfeit `available * fraction`, flooring the balance at zero.
/// Returns the amount removed.
pub fn slash(txn: &mut dyn StateTxn, actor: &str, fraction: f64) -> Result<f64, EngineError> {
    let mut stake = load(txn, actor)?;
    let slashed = (stake.available * fraction.clamp(0.0, 1.0)).max(0.0);
    stake.available = (stake.available - slashed).max(0.0);
    info!(%actor, slashed, available = stake.available, "stake: slashed");
    save(txn, stake)?;
    Ok(slashed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use vouch_core::ledger::MemoryLedger;
    use vouch_core::traits::Ledger;
    use vouch_core::types::TxContext;

    fn run<T>(
        ledger: &MemoryLedger,
        caller: &str,
        op: impl FnOnce(&mut dyn StateTxn) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut txn = ledger.begin(TxContext::new(caller, "tx", 500))?;
        let out = op(&mut txn)?;
        ledger.commit(txn)?;
        Ok(out)
    }

    #[test]
    fn deposit_credits_normalized_caller() {
        let ledger = MemoryLedger::new();
        run(&ledger, "x509::CN=Alice::CN=ca", |t| deposit(t, 250.0)).unwrap();
        let stake = run(&ledger, "bob", |t| load(t, "alice")).unwrap();
        assert_eq!(stake.available, 250.0);
        assert_eq!(stake.updated_at, 500);
    }

    #[test]
    fn deposit_rejects_bad_amounts() {
        let ledger = MemoryLedger::new();
        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = run(&ledger, "alice", |t| deposit(t, amount)).unwrap_err();
            assert!(matches!(err, EngineError::InvalidAmount(_)));
        }
        assert!(ledger.is_empty());
    }

    #[test]
    fn deposit_rejects_overflowing_balance() {
        let ledger = MemoryLedger::new();
        run(&ledger, "alice", |t| deposit(t, f64::MAX)).unwrap();
        let err = run(&ledger, "alice", |t| deposit(t, f64::MAX)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(a) if a == f64::MAX));
        let stake = run(&ledger, "bob", |t| load(t, "alice")).unwrap();
        assert_eq!(stake.available, f64::MAX);
    }

    #[test]
    fn lock_and_release() {
        let ledger = MemoryLedger::new();
        run(&ledger, "acme", |t| deposit(t, 150.0)).unwrap();
        let s = run(&ledger, "acme", |t| lock_for_dispute(t, "acme", 100.0)).unwrap();
        assert_eq!((s.available, s.locked), (50.0, 100.0));
        assert_eq!(s.total(), 150.0);

        let err = run(&ledger, "acme", |t| lock_for_dispute(t, "acme", 100.0)).unwrap_err();
        assert_eq!(err, EngineError::InsufficientStake { have: 50.0, need: 100.0 });

        let s = run(&ledger, "acme", |t| release_lock(t, "acme", 100.0)).unwrap();
        assert_eq!((s.available, s.locked), (150.0, 0.0));
    }

    #[test]
    fn release_never_exceeds_locked() {
        let ledger = MemoryLedger::new();
        run(&ledger, "acme", |t| deposit(t, 10.0)).unwrap();
        let s = run(&ledger, "acme", |t| release_lock(t, "acme", 99.0)).unwrap();
        assert_eq!((s.available, s.locked), (10.0, 0.0));
    }

    #[test]
    fn slash_takes_fraction_of_available() {
        let ledger = MemoryLedger::new();
        run(&ledger, "alice", |t| deposit(t, 1_000.0)).unwrap();
        run(&ledger, "alice", |t| lock_for_dispute(t, "alice", 200.0)).unwrap();
        let slashed = run(&ledger, "judge", |t| slash(t, "alice", 0.30)).unwrap();
        assert!((slashed - 240.0).abs() < 1e-9);
        let s = run(&ledger, "judge", |t| load(t, "alice")).unwrap();
        assert!((s.available - 560.0).abs() < 1e-9);
        assert_eq!(s.locked, 200.0, "locked balance is not slashed");
    }

    #[test]
    fn slash_of_empty_stake_is_zero() {
        let ledger = MemoryLedger::new();
        assert_eq!(run(&ledger, "judge", |t| slash(t, "ghost", 0.5)).unwrap(), 0.0);
    }

    proptest! {
        #[test]
        fn sequential_deposits_accumulate(amounts in prop::collection::vec(0.01f64..1e6, 1..20)) {
            let ledger = MemoryLedger::new();
            for amount in &amounts {
                run(&ledger, "alice", |t| deposit(t, *amount)).unwrap();
            }
            let s = run(&ledger, "alice", |t| load(t, "alice")).unwrap();
            let expected: f64 = amounts.iter().sum();
            prop_assert!((s.available - expected).abs() <= expected * 1e-12);
            prop_assert_eq!(s.locked, 0.0);
        }
    }
}
