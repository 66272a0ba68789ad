//! Core records: configuration, reputation, ratings, stake, disputes.
//!
//! Every record is owned by its key. Cross references (`Rating::target`,
//! `Dispute::rating_id`) are lookups by key, never embedded records.
//! Numeric evidence and balances are `f64`; timestamps are Unix seconds.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    default_meta_dimension, DEFAULT_ALPHA0, DEFAULT_BETA0, DEFAULT_DECAY_PERIOD_SECS,
    DEFAULT_DECAY_RATE, DEFAULT_DIMENSIONS, DEFAULT_DISPUTE_COST, DEFAULT_MAX_RATER_WEIGHT,
    DEFAULT_MIN_RATER_WEIGHT, DEFAULT_MIN_STAKE, DEFAULT_SLASH_FRACTION,
};
use crate::error::EngineError;

/// Identity and clock of the ledger transaction an operation runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxContext {
    /// Raw caller credential as supplied by the runtime (not normalized).
    pub caller: String,
    /// Ledger-assigned transaction identifier.
    pub tx_id: String,
    /// Transaction timestamp in Unix seconds. The engine's notion of "now".
    pub timestamp: i64,
}

impl TxContext {
    pub fn new(caller: impl Into<String>, tx_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            caller: caller.into(),
            tx_id: tx_id.into(),
            timestamp,
        }
    }

    /// Context stamped with the wall clock and a random transaction id.
    pub fn now(caller: impl Into<String>) -> Self {
        let nonce: [u8; 16] = rand::random();
        Self::new(caller, hex::encode(nonce), chrono::Utc::now().timestamp())
    }
}

/// A role an actor can hold in the registry carried by [`SystemConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Arbitrator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Arbitrator => f.write_str("arbitrator"),
        }
    }
}

impl FromStr for Role {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "arbitrator" => Ok(Self::Arbitrator),
            other => Err(EngineError::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

/// Singleton engine configuration.
///
/// Versioned: `version` is 0 for the built-in defaults that have never been
/// persisted and increases by one on every stored mutation.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct SystemConfig {
    /// Available stake required to submit a rating.
    pub min_stake: f64,
    /// Stake locked from a dispute initiator until resolution.
    pub dispute_cost: f64,
    /// Fraction of available stake slashed on an overturned rating, in `[0, 1]`.
    pub slash_fraction: f64,
    /// Per-period retention factor, in `[0, 1]`.
    pub decay_rate: f64,
    /// Decay period in seconds, strictly positive.
    pub decay_period_secs: i64,
    /// Prior pseudo-count of positive evidence.
    pub alpha0: f64,
    /// Prior pseudo-count of negative evidence.
    pub beta0: f64,
    pub min_rater_weight: f64,
    pub max_rater_weight: f64,
    /// Dimensions that may be rated directly.
    pub dimensions: BTreeSet<String>,
    /// Base dimension → meta-dimension used to score raters of that dimension.
    pub meta_dimensions: BTreeMap<String, String>,
    /// Normalized actor keys allowed to mutate configuration.
    pub admins: BTreeSet<String>,
    /// Normalized actor keys allowed to resolve disputes.
    pub arbitrators: BTreeSet<String>,
    pub version: u64,
    pub updated_at: i64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let dimensions: BTreeSet<String> =
            DEFAULT_DIMENSIONS.iter().map(|d| d.to_string()).collect();
        let meta_dimensions = dimensions
            .iter()
            .map(|d| (d.clone(), default_meta_dimension(d)))
            .collect();
        Self {
            min_stake: DEFAULT_MIN_STAKE,
            dispute_cost: DEFAULT_DISPUTE_COST,
            slash_fraction: DEFAULT_SLASH_FRACTION,
            decay_rate: DEFAULT_DECAY_RATE,
            decay_period_secs: DEFAULT_DECAY_PERIOD_SECS,
            alpha0: DEFAULT_ALPHA0,
            beta0: DEFAULT_BETA0,
            min_rater_weight: DEFAULT_MIN_RATER_WEIGHT,
            max_rater_weight: DEFAULT_MAX_RATER_WEIGHT,
            dimensions,
            meta_dimensions,
            admins: BTreeSet::new(),
            arbitrators: BTreeSet::new(),
            version: 0,
            updated_at: 0,
        }
    }
}

impl SystemConfig {
    pub fn is_valid_dimension(&self, dimension: &str) -> bool {
        self.dimensions.contains(dimension)
    }

    /// Meta-dimension that scores raters of `base`, if one is mapped.
    pub fn meta_dimension_for(&self, base: &str) -> Option<&str> {
        self.meta_dimensions.get(base).map(String::as_str)
    }

    /// Whether `actor` (a normalized key) holds `role`.
    pub fn has_role(&self, role: Role, actor: &str) -> bool {
        match role {
            Role::Admin => self.admins.contains(actor),
            Role::Arbitrator => self.arbitrators.contains(actor),
        }
    }

    pub fn role_members_mut(&mut self, role: Role) -> &mut BTreeSet<String> {
        match role {
            Role::Admin => &mut self.admins,
            Role::Arbitrator => &mut self.arbitrators,
        }
    }

    /// Check every bound on the tunable parameters.
    ///
    /// Role membership is checked separately by the configuration store,
    /// since the unpersisted defaults legitimately have no admin.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: String| Err(EngineError::InvalidConfig(msg));

        let finite = [
            ("min_stake", self.min_stake),
            ("dispute_cost", self.dispute_cost),
            ("slash_fraction", self.slash_fraction),
            ("decay_rate", self.decay_rate),
            ("alpha0", self.alpha0),
            ("beta0", self.beta0),
            ("min_rater_weight", self.min_rater_weight),
            ("max_rater_weight", self.max_rater_weight),
        ];
        if let Some((name, v)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return invalid(format!("{name} must be finite, got {v}"));
        }
        if !(0.0..=1.0).contains(&self.slash_fraction) {
            return invalid(format!("slash_fraction must be in [0, 1], got {}", self.slash_fraction));
        }
        if !(0.0..=1.0).contains(&self.decay_rate) {
            return invalid(format!("decay_rate must be in [0, 1], got {}", self.decay_rate));
        }
        if self.decay_period_secs <= 0 {
            return invalid(format!("decay_period_secs must be > 0, got {}", self.decay_period_secs));
        }
        if self.alpha0 <= 0.0 || self.beta0 <= 0.0 {
            return invalid(format!("priors must be > 0, got ({}, {})", self.alpha0, self.beta0));
        }
        if self.min_stake < 0.0 || self.dispute_cost < 0.0 {
            return invalid("min_stake and dispute_cost must be >= 0".to_string());
        }
        if self.min_rater_weight <= 0.0 || self.min_rater_weight > self.max_rater_weight {
            return invalid(format!(
                "rater weight band must satisfy 0 < min <= max, got [{}, {}]",
                self.min_rater_weight, self.max_rater_weight
            ));
        }
        if self.dimensions.is_empty() {
            return invalid("at least one dimension is required".to_string());
        }
        if let Some(d) = self
            .dimensions
            .iter()
            .find(|d| d.trim().is_empty() || d.chars().any(char::is_control))
        {
            return invalid(format!("malformed dimension name {d:?}"));
        }
        for (base, meta) in &self.meta_dimensions {
            if meta.trim().is_empty() {
                return invalid(format!("blank meta dimension for {base}"));
            }
            if self.dimensions.contains(meta) {
                return invalid(format!("meta dimension {meta} is also ratable"));
            }
        }
        Ok(())
    }
}

/// Beta-distribution belief about one actor in one dimension.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Reputation {
    pub actor: String,
    pub dimension: String,
    /// Accumulated positive evidence (never below the configured prior).
    pub alpha: f64,
    /// Accumulated negative evidence (never below the configured prior).
    pub beta: f64,
    pub total_events: u64,
    pub last_ts: i64,
}

impl Reputation {
    /// Fresh belief at the configured prior.
    pub fn prior(actor: &str, dimension: &str, config: &SystemConfig, now: i64) -> Self {
        Self {
            actor: actor.to_string(),
            dimension: dimension.to_string(),
            alpha: config.alpha0,
            beta: config.beta0,
            total_events: 0,
            last_ts: now,
        }
    }

    /// Point estimate: mean of the Beta distribution.
    pub fn score(&self) -> f64 {
        let n = self.alpha + self.beta;
        if n <= 0.0 { 0.0 } else { self.alpha / n }
    }
}

/// A single weighted rating event. Immutable once stored.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Rating {
    pub rating_id: String,
    pub rater: String,
    pub target: String,
    pub dimension: String,
    /// Observed success in `[0, 1]`.
    pub value: f64,
    /// Rater weight applied at submission time.
    pub weight: f64,
    /// Opaque reference to off-ledger evidence.
    pub evidence: String,
    pub timestamp: i64,
    pub tx_id: String,
}

/// Staked capital held by one actor.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Stake {
    pub actor: String,
    pub available: f64,
    pub locked: f64,
    pub updated_at: i64,
}

impl Stake {
    pub fn empty(actor: &str, now: i64) -> Self {
        Self {
            actor: actor.to_string(),
            available: 0.0,
            locked: 0.0,
            updated_at: now,
        }
    }

    pub fn total(&self) -> f64 {
        self.available + self.locked
    }
}

/// Arbitrator decision on a dispute.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
    bincode::Encode, bincode::Decode,
)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The rating stands; the rater was right.
    Upheld,
    /// The rating is reversed; the rater was wrong.
    Overturned,
}

impl FromStr for Verdict {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upheld" => Ok(Self::Upheld),
            "overturned" => Ok(Self::Overturned),
            _ => Err(EngineError::InvalidVerdict(s.to_string())),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upheld => f.write_str("upheld"),
            Self::Overturned => f.write_str("overturned"),
        }
    }
}

/// Dispute lifecycle: `Pending` transitions exactly once to a terminal state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
    bincode::Encode, bincode::Decode,
)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Pending,
    Upheld,
    Overturned,
}

impl DisputeStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl From<Verdict> for DisputeStatus {
    fn from(v: Verdict) -> Self {
        match v {
            Verdict::Upheld => Self::Upheld,
            Verdict::Overturned => Self::Overturned,
        }
    }
}

/// A challenge against one rating, raised by the rated actor.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Dispute {
    pub dispute_id: String,
    pub rating_id: String,
    pub initiator: String,
    /// Denormalized from the rating for audit.
    pub rater: String,
    pub target: String,
    pub dimension: String,
    pub reason: String,
    pub status: DisputeStatus,
    pub arbitrator: Option<String>,
    pub notes: String,
    /// Cost locked from the initiator at creation; released on resolution.
    pub cost_locked: f64,
    /// Stake slashed from the rater at resolution (0 unless overturned).
    pub slashed_amount: f64,
    pub created_at: i64,
    pub resolved_at: Option<i64>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
    bincode::Encode, bincode::Decode,
)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// A rater with thin history submitting an extreme rating.
    PotentialSybil,
}

/// Suspicious rating pattern recorded for offline analysis.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct AnomalyEvent {
    pub event_id: String,
    pub kind: AnomalyKind,
    pub actors: Vec<String>,
    pub confidence: f64,
    pub description: String,
    pub rating_id: String,
    pub timestamp: i64,
}

/// Aggregate counters rebuilt from rating and dispute records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub total_ratings: u64,
    pub total_disputes: u64,
    pub disputes_upheld: u64,
    pub disputes_overturned: u64,
    pub total_stake_slashed: f64,
    /// Distinct actors that have received at least one rating.
    pub total_actors: u64,
}

/// A change broadcast to external observers after commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub topic: String,
    /// JSON-encoded event body.
    pub payload: Vec<u8>,
}

impl Notification {
    pub fn json<T: Serialize>(topic: &str, body: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            topic: topic.to_string(),
            payload: serde_json::to_vec(body)?,
        })
    }
}
