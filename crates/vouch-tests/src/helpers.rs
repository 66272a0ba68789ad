//! Shared helpers for scenario and adversarial tests.

use vouch_core::ledger::MemoryLedger;
use vouch_core::types::{SystemConfig, TxContext};
use vouch_engine::Engine;

/// Transaction clock used by every helper context.
pub const NOW: i64 = 1_700_000_000;

pub const ADMIN: &str = "admin";
pub const ARBITRATOR: &str = "judge";

/// Context for `caller` at [`NOW`].
pub fn ctx(caller: &str) -> TxContext {
    ctx_at(caller, NOW)
}

/// Context for `caller` at `timestamp`, with a transaction id unique to both.
pub fn ctx_at(caller: &str, timestamp: i64) -> TxContext {
    TxContext::new(caller, format!("tx-{caller}-{timestamp}"), timestamp)
}

/// Engine on a fresh in-memory ledger with [`ADMIN`] and [`ARBITRATOR`]
/// registered and the default parameters.
pub fn engine() -> Engine<MemoryLedger> {
    engine_with(|_| {})
}

/// Like [`engine`], with `tune` applied to the default configuration first.
pub fn engine_with(tune: impl FnOnce(&mut SystemConfig)) -> Engine<MemoryLedger> {
    let engine = Engine::new(MemoryLedger::new());
    let mut config = SystemConfig::default();
    tune(&mut config);
    config.arbitrators.insert(ARBITRATOR.to_string());
    engine
        .init_config(ctx(ADMIN), config)
        .expect("bootstrap configuration");
    engine
}

/// Engine whose raters all carry weight exactly 1.0, with prior
/// `(alpha0, beta0)`.
pub fn unit_weight_engine(alpha0: f64, beta0: f64) -> Engine<MemoryLedger> {
    engine_with(|c| {
        c.alpha0 = alpha0;
        c.beta0 = beta0;
        c.min_rater_weight = 1.0;
        c.max_rater_weight = 1.0;
    })
}

/// Deposit `amount` for each of `actors`.
pub fn fund(engine: &Engine<MemoryLedger>, actors: &[&str], amount: f64) {
    for actor in actors {
        engine
            .deposit(ctx(actor), amount)
            .unwrap_or_else(|e| panic!("deposit for {actor}: {e}"));
    }
}
