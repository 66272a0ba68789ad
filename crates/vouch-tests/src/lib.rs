//! Scenario and adversarial test suite for Vouch.
//!
//! Integration tests drive the public [`Engine`](vouch_engine::Engine)
//! surface against the in-memory ledger, the way a client would, and try
//! to break the rating, stake, and dispute invariants with hostile inputs.

pub mod helpers;
