//! Error types for the Vouch engine.
use thiserror::Error;

/// Failures raised at the ledger boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("write conflict on key {key}")] Conflict { key: String },
    #[error("ledger backend: {0}")] Backend(String),
    #[error("codec: {0}")] Codec(String),
}

/// Failure classes a caller can act on.
///
/// Only [`ErrorKind::StorageConflict`] is worth retrying with the same
/// inputs; every other kind needs a change of state first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    Unauthorized,
    InsufficientStake,
    NotFound,
    AlreadyResolved,
    SelfRatingForbidden,
    StorageConflict,
    /// Backend or codec failure. Not retryable.
    Storage,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("rating value must be within [0, 1]: {0}")] InvalidValue(f64),
    #[error("unknown dimension: {0}")] InvalidDimension(String),
    #[error("invalid timestamp {got} (transaction time {now})")] InvalidTimestamp { got: i64, now: i64 },
    #[error("amount must be positive and finite: {0}")] InvalidAmount(f64),
    #[error("invalid config: {0}")] InvalidConfig(String),
    #[error("invalid verdict: {0}")] InvalidVerdict(String),
    #[error("unsupported confidence level: {0}")] InvalidConfidence(f64),
    #[error("invalid input: {0}")] InvalidInput(String),
    #[error("no meta dimension mapped for {0}")] NoMetaDimension(String),
    #[error("actors may not rate themselves")] SelfRatingForbidden,
    #[error("insufficient stake: have {have}, need {need}")] InsufficientStake { have: f64, need: f64 },
    #[error("unauthorized: {0}")] Unauthorized(String),
    #[error("rating not found: {0}")] RatingNotFound(String),
    #[error("dispute not found: {0}")] DisputeNotFound(String),
    #[error("dispute already resolved: {0}")] AlreadyResolved(String),
    #[error("rating id {0} already holds a different rating")] RatingIdCollision(String),
    #[error(transparent)] Ledger(#[from] LedgerError),
}

impl EngineError {
    /// Map this error onto the caller-facing failure class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidValue(_)
            | Self::InvalidDimension(_)
            | Self::InvalidTimestamp { .. }
            | Self::InvalidAmount(_)
            | Self::InvalidConfig(_)
            | Self::InvalidVerdict(_)
            | Self::InvalidConfidence(_)
            | Self::InvalidInput(_)
            | Self::NoMetaDimension(_)
            | Self::RatingIdCollision(_) => ErrorKind::InvalidInput,
            Self::SelfRatingForbidden => ErrorKind::SelfRatingForbidden,
            Self::InsufficientStake { .. } => ErrorKind::InsufficientStake,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::RatingNotFound(_) | Self::DisputeNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyResolved(_) => ErrorKind::AlreadyResolved,
            Self::Ledger(LedgerError::Conflict { .. }) => ErrorKind::StorageConflict,
            Self::Ledger(_) => ErrorKind::Storage,
        }
    }

    /// Whether repeating the identical call may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::StorageConflict
    }
}
