//! # vouch-node: persistent backend for the Vouch engine.
//!
//! - [`storage::RocksLedger`]: optimistic transactions on RocksDB
//! - [`config::NodeSettings`]: data directory, logging, bootstrap roles
//! - [`logging::init_logging`]: `tracing-subscriber` setup
//! - [`node::Node`]: opens the ledger and bootstraps the role registry

pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod storage;

pub use config::NodeSettings;
pub use error::NodeError;
pub use node::Node;
pub use storage::RocksLedger;
