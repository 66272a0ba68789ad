//! Node composition: ledger, engine, and role bootstrap.

use tracing::info;

use vouch_core::identity::normalize;
use vouch_core::types::TxContext;
use vouch_engine::{Engine, config_store};

use crate::config::NodeSettings;
use crate::error::NodeError;
use crate::storage::RocksLedger;

pub struct Node;

impl Node {
    /// Open the ledger under `settings.db_path()` and return an engine on it.
    ///
    /// When the ledger has no admin yet and `settings.bootstrap_admins` is
    /// non-empty, those admins and the bootstrap arbitrators are registered
    /// in a single transaction on top of the default configuration.
    pub fn open(settings: &NodeSettings) -> Result<Engine<RocksLedger>, NodeError> {
        let ledger = RocksLedger::open(settings.db_path())?;
        let engine = Engine::new(ledger);
        bootstrap(&engine, settings)?;
        Ok(engine)
    }
}

fn bootstrap(engine: &Engine<RocksLedger>, settings: &NodeSettings) -> Result<(), NodeError> {
    let admins: Vec<String> = settings
        .bootstrap_admins
        .iter()
        .map(|a| normalize(a))
        .filter(|a| !a.is_empty())
        .collect();
    let Some(first) = admins.first().cloned() else {
        return Ok(());
    };

    let registered = engine.execute(TxContext::now(first), |t, _| {
        let mut config = config_store::load(t)?;
        if !config.admins.is_empty() {
            return Ok(None);
        }
        config.admins.extend(admins.iter().cloned());
        config.arbitrators.extend(settings.bootstrap_arbitrators.iter().cloned());
        config_store::init_config(t, config).map(Some)
    })?;

    if let Some(config) = registered {
        info!(
            admins = config.admins.len(),
            arbitrators = config.arbitrators.len(),
            version = config.version,
            "node: bootstrapped role registry"
        );
    }
    Ok(())
}
