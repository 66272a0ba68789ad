//! The engine facade: each public operation runs as one ledger transaction.
//!
//! The engine holds no state between calls. A failed operation drops its
//! transaction, so nothing it wrote or emitted survives. Conflicts surface
//! as [`EngineError::Ledger`] with kind `StorageConflict`; retrying is the
//! caller's job.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use vouch_belief::BetaBelief;
use vouch_core::error::EngineError;
use vouch_core::traits::{BeliefModel, Ledger, Notifier, StateTxn, TracingNotifier};
use vouch_core::types::{AnomalyEvent, Dispute, Rating, Role, Stake, SystemConfig, SystemMetrics, TxContext};

use crate::query::{self, ActorProfile, DisputeStats, ReputationView, StakeView};
use crate::rating::{self, RatingImpact};
use crate::{config_store, dispute, stake};

pub struct Engine<L: Ledger> {
    ledger: L,
    model: Arc<dyn BeliefModel>,
    notifier: Arc<dyn Notifier>,
}

impl<L: Ledger> fmt::Debug for Engine<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

impl<L: Ledger> Engine<L> {
    /// Engine with the Beta belief model and notifications logged via `tracing`.
    pub fn new(ledger: L) -> Self {
        Self::with_parts(ledger, Arc::new(BetaBelief::new()), Arc::new(TracingNotifier))
    }

    pub fn with_parts(ledger: L, model: Arc<dyn BeliefModel>, notifier: Arc<dyn Notifier>) -> Self {
        Self { ledger, model, notifier }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Run `op` in a fresh transaction and commit it. Notifications are
    /// delivered only after a successful commit.
    pub fn execute<T>(
        &self,
        ctx: TxContext,
        op: impl FnOnce(&mut dyn StateTxn, &dyn BeliefModel) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let tx_id = ctx.tx_id.clone();
        let mut txn = self.ledger.begin(ctx)?;
        let out = op(&mut txn, self.model.as_ref()).inspect_err(|e| {
            debug!(tx = %tx_id, error = %e, kind = ?e.kind(), "engine: operation rejected");
        })?;
        let delivered = self.ledger.commit(txn).inspect_err(|e| {
            debug!(tx = %tx_id, error = %e, "engine: commit failed");
        })?;
        for notification in &delivered {
            self.notifier.notify(notification);
        }
        Ok(out)
    }

    /// Run a read-only `op`. The transaction is discarded, never committed.
    pub fn read<T>(
        &self,
        ctx: TxContext,
        op: impl FnOnce(&mut dyn StateTxn, &dyn BeliefModel) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut txn = self.ledger.begin(ctx)?;
        op(&mut txn, self.model.as_ref())
    }

    // --- configuration ---

    pub fn get_config(&self, ctx: TxContext) -> Result<SystemConfig, EngineError> {
        self.read(ctx, |t, _| config_store::load(t))
    }

    pub fn init_config(&self, ctx: TxContext, config: SystemConfig) -> Result<SystemConfig, EngineError> {
        self.execute(ctx, |t, _| config_store::init_config(t, config))
    }

    pub fn update_config(&self, ctx: TxContext, config: SystemConfig) -> Result<SystemConfig, EngineError> {
        self.execute(ctx, |t, _| config_store::update_config(t, config))
    }

    pub fn add_dimension(&self, ctx: TxContext, base: &str, meta: &str) -> Result<SystemConfig, EngineError> {
        self.execute(ctx, |t, _| config_store::add_dimension(t, base, meta))
    }

    pub fn grant_role(&self, ctx: TxContext, role: Role, actor: &str) -> Result<SystemConfig, EngineError> {
        self.execute(ctx, |t, _| config_store::grant_role(t, role, actor))
    }

    pub fn revoke_role(&self, ctx: TxContext, role: Role, actor: &str) -> Result<SystemConfig, EngineError> {
        self.execute(ctx, |t, _| config_store::revoke_role(t, role, actor))
    }

    // --- stake ---

    pub fn deposit(&self, ctx: TxContext, amount: f64) -> Result<Stake, EngineError> {
        self.execute(ctx, |t, _| stake::deposit(t, amount))
    }

    pub fn get_stake(&self, ctx: TxContext, actor: &str) -> Result<StakeView, EngineError> {
        self.read(ctx, |t, _| query::get_stake(t, actor))
    }

    // --- ratings ---

    pub fn submit_rating(
        &self,
        ctx: TxContext,
        target: &str,
        dimension: &str,
        value: f64,
        evidence: &str,
        timestamp: i64,
    ) -> Result<String, EngineError> {
        self.execute(ctx, |t, m| {
            rating::submit_rating(t, m, target, dimension, value, evidence, timestamp)
        })
    }

    pub fn simulate_rating_impact(
        &self,
        ctx: TxContext,
        target: &str,
        dimension: &str,
        value: f64,
    ) -> Result<RatingImpact, EngineError> {
        self.read(ctx, |t, m| rating::simulate_rating_impact(t, m, target, dimension, value))
    }

    // --- disputes ---

    pub fn initiate_dispute(&self, ctx: TxContext, rating_id: &str, reason: &str) -> Result<String, EngineError> {
        self.execute(ctx, |t, _| dispute::initiate_dispute(t, rating_id, reason))
    }

    pub fn resolve_dispute(
        &self,
        ctx: TxContext,
        dispute_id: &str,
        verdict: &str,
        notes: &str,
    ) -> Result<Dispute, EngineError> {
        self.execute(ctx, |t, m| dispute::resolve_dispute(t, m, dispute_id, verdict, notes))
    }

    // --- queries ---

    pub fn get_reputation(
        &self,
        ctx: TxContext,
        actor: &str,
        dimension: &str,
        level: f64,
    ) -> Result<ReputationView, EngineError> {
        self.read(ctx, |t, m| query::get_reputation(t, m, actor, dimension, level))
    }

    pub fn batch_get_reputations(
        &self,
        ctx: TxContext,
        actors: &[&str],
        dimension: &str,
    ) -> Result<Vec<ReputationView>, EngineError> {
        self.read(ctx, |t, m| query::batch_get_reputations(t, m, actors, dimension))
    }

    pub fn get_rating_history(&self, ctx: TxContext, actor: &str, dimension: &str) -> Result<Vec<Rating>, EngineError> {
        self.read(ctx, |t, _| query::get_rating_history(t, actor, dimension))
    }

    pub fn get_rating(&self, ctx: TxContext, rating_id: &str) -> Result<Rating, EngineError> {
        self.read(ctx, |t, _| query::get_rating(t, rating_id))
    }

    pub fn get_dispute(&self, ctx: TxContext, dispute_id: &str) -> Result<Dispute, EngineError> {
        self.read(ctx, |t, _| query::get_dispute(t, dispute_id))
    }

    pub fn get_system_metrics(&self, ctx: TxContext) -> Result<SystemMetrics, EngineError> {
        self.read(ctx, |t, _| query::get_system_metrics(t))
    }

    pub fn get_dispute_stats(&self, ctx: TxContext) -> Result<DisputeStats, EngineError> {
        self.read(ctx, |t, _| query::get_dispute_stats(t))
    }

    pub fn get_actor_profile(&self, ctx: TxContext, actor: &str) -> Result<ActorProfile, EngineError> {
        self.read(ctx, |t, m| query::get_actor_profile(t, m, actor))
    }

    pub fn list_actors(&self, ctx: TxContext) -> Result<Vec<String>, EngineError> {
        self.read(ctx, |t, _| query::list_actors(t))
    }

    pub fn get_anomaly_events(&self, ctx: TxContext) -> Result<Vec<AnomalyEvent>, EngineError> {
        self.read(ctx, |t, _| query::get_anomaly_events(t))
    }
}
