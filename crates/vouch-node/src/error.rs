use thiserror::Error;

use vouch_core::error::{EngineError, LedgerError};

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("settings: {0}")] Settings(#[from] ::config::ConfigError),
    #[error("storage: {0}")] Storage(#[from] LedgerError),
    #[error("bootstrap: {0}")] Bootstrap(#[from] EngineError),
}
