//! # vouch-core
//! Foundation records, traits, and the ledger boundary for the Vouch
//! reputation engine.

pub mod codec;
pub mod constants;
pub mod error;
pub mod identity;
pub mod keys;
pub mod ledger;
pub mod traits;
pub mod types;
