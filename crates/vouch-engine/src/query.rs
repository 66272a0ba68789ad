//! Query/Analytics Layer. Read-only; every view is decay-adjusted at the
//! transaction time and aggregates are rebuilt from stored records.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use vouch_core::error::EngineError;
use vouch_core::identity::normalize;
use vouch_core::keys::{self, kind_prefix, KeyKind};
use vouch_core::traits::{BeliefModel, StateTxn, StateTxnExt};
use vouch_core::types::{AnomalyEvent, Dispute, DisputeStatus, Rating, SystemConfig, SystemMetrics};

use crate::{config_store, dispute, reputation, stake};

/// Default confidence level for views that do not take one.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationView {
    pub actor: String,
    pub dimension: String,
    pub score: f64,
    /// `1 - 1/(1 + events)`: grows with the number of observations.
    pub confidence: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    /// Effective parameters after decay.
    pub alpha: f64,
    pub beta: f64,
    pub total_events: u64,
    pub last_updated: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeView {
    pub actor: String,
    pub available: f64,
    pub locked: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisputeStats {
    pub total_disputes: u64,
    pub resolved: u64,
    pub pending: u64,
    pub upheld: u64,
    pub overturned: u64,
    pub upheld_rate: f64,
    pub overturned_rate: f64,
    pub avg_resolution_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorProfile {
    pub actor: String,
    pub reputations: BTreeMap<String, ReputationView>,
    pub stake: StakeView,
    pub ratings_given: u64,
    pub ratings_received: u64,
    pub disputes_initiated: u64,
    /// Disputes raised against ratings this actor submitted.
    pub disputes_against: u64,
}

fn actor_key(raw: &str) -> Result<String, EngineError> {
    let actor = normalize(raw);
    if actor.is_empty() {
        return Err(EngineError::InvalidInput("actor is required".into()));
    }
    Ok(actor)
}

/// Ratable dimensions and their meta dimensions are both queryable.
fn check_queryable(config: &SystemConfig, dimension: &str) -> Result<(), EngineError> {
    let known = config.is_valid_dimension(dimension)
        || config.meta_dimensions.values().any(|m| m == dimension);
    if known {
        Ok(())
    } else {
        Err(EngineError::InvalidDimension(dimension.to_string()))
    }
}

fn view(
    txn: &mut dyn StateTxn,
    model: &dyn BeliefModel,
    config: &SystemConfig,
    actor: &str,
    dimension: &str,
    level: f64,
) -> Result<ReputationView, EngineError> {
    let rep = reputation::effective(txn, model, config, actor, dimension)?;
    let (ci_lower, ci_upper) = model.interval(rep.alpha, rep.beta, level)?;
    Ok(ReputationView {
        actor: actor.to_string(),
        dimension: dimension.to_string(),
        score: rep.score(),
        confidence: 1.0 - 1.0 / (1.0 + rep.total_events as f64),
        ci_lower,
        ci_upper,
        alpha: rep.alpha,
        beta: rep.beta,
        total_events: rep.total_events,
        last_updated: rep.last_ts,
    })
}

/// Decay-adjusted reputation of `actor` with a Wilson interval at `level`.
pub fn get_reputation(
    txn: &mut dyn StateTxn,
    model: &dyn BeliefModel,
    actor: &str,
    dimension: &str,
    level: f64,
) -> Result<ReputationView, EngineError> {
    let config = config_store::load(txn)?;
    check_queryable(&config, dimension)?;
    let actor = actor_key(actor)?;
    view(txn, model, &config, &actor, dimension, level)
}

/// Reputation of several actors in one dimension. Blank entries are skipped.
pub fn batch_get_reputations<I, S>(
    txn: &mut dyn StateTxn,
    model: &dyn BeliefModel,
    actors: I,
    dimension: &str,
) -> Result<Vec<ReputationView>, EngineError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let config = config_store::load(txn)?;
    check_queryable(&config, dimension)?;
    let mut out = Vec::new();
    for raw in actors {
        let actor = normalize(raw.as_ref());
        if actor.is_empty() {
            continue;
        }
        out.push(view(txn, model, &config, &actor, dimension, DEFAULT_CONFIDENCE_LEVEL)?);
    }
    Ok(out)
}

pub fn get_stake(txn: &mut dyn StateTxn, actor: &str) -> Result<StakeView, EngineError> {
    let actor = actor_key(actor)?;
    let s = stake::load(txn, &actor)?;
    Ok(StakeView { total: s.total(), actor, available: s.available, locked: s.locked })
}

pub fn get_rating(txn: &mut dyn StateTxn, rating_id: &str) -> Result<Rating, EngineError> {
    dispute::load_rating(txn, rating_id)
}

pub fn get_dispute(txn: &mut dyn StateTxn, dispute_id: &str) -> Result<Dispute, EngineError> {
    dispute::load_dispute(txn, dispute_id)
}

fn all_ratings(txn: &mut dyn StateTxn) -> Result<Vec<Rating>, EngineError> {
    Ok(txn.scan_records(&kind_prefix(KeyKind::Rating))?)
}

fn all_disputes(txn: &mut dyn StateTxn) -> Result<Vec<Dispute>, EngineError> {
    Ok(txn.scan_records(&kind_prefix(KeyKind::Dispute))?)
}

/// Ratings received by `actor` in `dimension`, oldest first.
pub fn get_rating_history(
    txn: &mut dyn StateTxn,
    actor: &str,
    dimension: &str,
) -> Result<Vec<Rating>, EngineError> {
    let actor = actor_key(actor)?;
    let mut history: Vec<Rating> = all_ratings(txn)?
        .into_iter()
        .filter(|r| r.target == actor && r.dimension == dimension)
        .collect();
    history.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.rating_id.cmp(&b.rating_id))
    });
    Ok(history)
}

pub fn get_system_metrics(txn: &mut dyn StateTxn) -> Result<SystemMetrics, EngineError> {
    let ratings = all_ratings(txn)?;
    let disputes = all_disputes(txn)?;
    let rated: BTreeSet<&str> = ratings.iter().map(|r| r.target.as_str()).collect();

    let mut metrics = SystemMetrics {
        total_ratings: ratings.len() as u64,
        total_disputes: disputes.len() as u64,
        total_actors: rated.len() as u64,
        ..SystemMetrics::default()
    };
    for d in &disputes {
        match d.status {
            DisputeStatus::Upheld => metrics.disputes_upheld += 1,
            DisputeStatus::Overturned => metrics.disputes_overturned += 1,
            DisputeStatus::Pending => {}
        }
        metrics.total_stake_slashed += d.slashed_amount;
    }
    Ok(metrics)
}

pub fn get_dispute_stats(txn: &mut dyn StateTxn) -> Result<DisputeStats, EngineError> {
    let disputes = all_disputes(txn)?;
    let mut stats = DisputeStats { total_disputes: disputes.len() as u64, ..DisputeStats::default() };
    let mut resolution_secs = 0i64;
    for d in &disputes {
        match d.status {
            DisputeStatus::Pending => stats.pending += 1,
            DisputeStatus::Upheld => stats.upheld += 1,
            DisputeStatus::Overturned => stats.overturned += 1,
        }
        if let Some(resolved_at) = d.resolved_at {
            let elapsed = resolved_at.saturating_sub(d.created_at).max(0);
            resolution_secs = resolution_secs.saturating_add(elapsed);
        }
    }
    stats.resolved = stats.upheld + stats.overturned;
    if stats.resolved > 0 {
        let resolved = stats.resolved as f64;
        stats.upheld_rate = stats.upheld as f64 / resolved;
        stats.overturned_rate = stats.overturned as f64 / resolved;
        stats.avg_resolution_secs = resolution_secs as f64 / resolved;
    }
    Ok(stats)
}

/// Reputation in every ratable dimension plus stake and activity counts.
pub fn get_actor_profile(
    txn: &mut dyn StateTxn,
    model: &dyn BeliefModel,
    actor: &str,
) -> Result<ActorProfile, EngineError> {
    let config = config_store::load(txn)?;
    let actor = actor_key(actor)?;

    let mut reputations = BTreeMap::new();
    for dimension in &config.dimensions {
        let v = view(txn, model, &config, &actor, dimension, DEFAULT_CONFIDENCE_LEVEL)?;
        reputations.insert(dimension.clone(), v);
    }
    let stake = get_stake(txn, &actor)?;

    let ratings = all_ratings(txn)?;
    let disputes = all_disputes(txn)?;
    let count = |n: usize| n as u64;
    Ok(ActorProfile {
        ratings_given: count(ratings.iter().filter(|r| r.rater == actor).count()),
        ratings_received: count(ratings.iter().filter(|r| r.target == actor).count()),
        disputes_initiated: count(disputes.iter().filter(|d| d.initiator == actor).count()),
        disputes_against: count(disputes.iter().filter(|d| d.rater == actor).count()),
        actor,
        reputations,
        stake,
    })
}

/// Distinct actors holding any stored reputation, sorted.
pub fn list_actors(txn: &mut dyn StateTxn) -> Result<Vec<String>, EngineError> {
    let rows = txn.scan_prefix(&kind_prefix(KeyKind::Reputation))?;
    let actors: BTreeSet<String> = rows
        .iter()
        .filter_map(|(key, _)| keys::split(key))
        .filter_map(|(_, parts)| parts.first().map(|a| a.to_string()))
        .collect();
    Ok(actors.into_iter().collect())
}

pub fn get_anomaly_events(txn: &mut dyn StateTxn) -> Result<Vec<AnomalyEvent>, EngineError> {
    let mut events: Vec<AnomalyEvent> = txn.scan_records(&kind_prefix(KeyKind::Anomaly))?;
    events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.event_id.cmp(&b.event_id)));
    Ok(events)
}
