//! Protocol constants and the documented configuration defaults.

/// Minimum available stake a rater must hold to submit a rating.
pub const DEFAULT_MIN_STAKE: f64 = 1_000.0;

/// Stake locked from the initiator while a dispute is pending.
pub const DEFAULT_DISPUTE_COST: f64 = 100.0;

/// Fraction of the rater's available stake forfeited when a rating is overturned.
pub const DEFAULT_SLASH_FRACTION: f64 = 0.30;

/// Per-period retention factor applied by decay (λ).
pub const DEFAULT_DECAY_RATE: f64 = 0.98;

/// Length of one decay period in seconds (1 day).
pub const DEFAULT_DECAY_PERIOD_SECS: i64 = 86_400;

/// Prior pseudo-counts for a fresh Beta belief (uniform prior).
pub const DEFAULT_ALPHA0: f64 = 1.0;
pub const DEFAULT_BETA0: f64 = 1.0;

/// Rater weight band.
pub const DEFAULT_MIN_RATER_WEIGHT: f64 = 0.1;
pub const DEFAULT_MAX_RATER_WEIGHT: f64 = 5.0;

/// Ratable dimensions registered by default.
pub const DEFAULT_DIMENSIONS: &[&str] = &["quality", "delivery", "compliance", "warranty"];

/// Prefix used to derive the default meta-dimension of a base dimension.
pub const META_DIMENSION_PREFIX: &str = "meta_";

/// Variance of Beta(1, 1), the largest variance reachable once both
/// parameters are at least 1.
pub const MAX_BETA_VARIANCE: f64 = 1.0 / 12.0;

/// Evidence scale in the rater confidence multiplier `1 + sqrt(n / (n + k))`.
pub const CONFIDENCE_EVIDENCE_SCALE: f64 = 10.0;

/// Ratings at or above this value count as positive evidence.
pub const POSITIVE_THRESHOLD: f64 = 0.5;

/// How far ahead of the transaction time a rating timestamp may be.
pub const MAX_FUTURE_SKEW_SECS: i64 = 300;

/// Number of SHA-256 bytes kept in rating and dispute identifiers.
pub const ID_HASH_PREFIX_LEN: usize = 8;

pub const RATING_ID_PREFIX: &str = "RAT-";
pub const DISPUTE_ID_PREFIX: &str = "DIS-";
pub const ANOMALY_ID_PREFIX: &str = "ANM-";

/// Raters with fewer meta events than this are considered new.
pub const ANOMALY_NEW_RATER_EVENTS: u64 = 5;

/// Ratings below the low bound or above the high bound are extreme.
pub const ANOMALY_EXTREME_LOW: f64 = 0.1;
pub const ANOMALY_EXTREME_HIGH: f64 = 0.9;

/// Detection confidence attached to a potential-sybil flag.
pub const ANOMALY_SYBIL_CONFIDENCE: f64 = 0.6;

/// z-scores for the supported Wilson interval confidence levels.
pub const Z_95: f64 = 1.96;
pub const Z_99: f64 = 2.576;

/// Derive the default meta-dimension name for a base dimension.
///
/// # Examples
///
/// ```
/// use vouch_core::constants::default_meta_dimension;
/// assert_eq!(default_meta_dimension("quality"), "meta_quality");
/// ```
pub fn default_meta_dimension(base: &str) -> String {
    format!("{META_DIMENSION_PREFIX}{base}")
}
