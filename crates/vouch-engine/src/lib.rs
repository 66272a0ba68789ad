//! # vouch-engine: stake-backed reputation and dispute engine.
//!
//! Every public operation reads and writes through a [`StateTxn`]
//! (vouch-core) and is pure apart from that; [`Engine`] wraps each one in
//! its own ledger transaction.
//!
//! - [`config_store`]: versioned system configuration and roles
//! - [`stake`]: available/locked balances, locking and slashing
//! - [`reputation`]: Beta state per (actor, dimension)
//! - [`rating`]: the submission pipeline and rater weighting
//! - [`dispute`]: the dispute state machine
//! - [`query`]: decay-adjusted views and aggregates
//!
//! [`StateTxn`]: vouch_core::traits::StateTxn

pub mod anomaly;
pub mod config_store;
pub mod dispute;
pub mod engine;
pub mod events;
pub mod query;
pub mod rating;
pub mod reputation;
pub mod stake;

pub use engine::Engine;
pub use query::{ActorProfile, DisputeStats, ReputationView, StakeView};
pub use rating::RatingImpact;
