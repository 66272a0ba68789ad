//! Configuration Store: the versioned `SystemConfig` singleton and its
//! role registry.
//!
//! The built-in defaults are served as an unpersisted view (version 0) until
//! the first successful mutation writes the record.

use std::collections::BTreeSet;

use serde_json::json;
use tracing::info;

use vouch_core::error::EngineError;
use vouch_core::identity::normalize;
use vouch_core::keys::config_key;
use vouch_core::traits::{StateTxn, StateTxnExt};
use vouch_core::types::{Role, SystemConfig};

use crate::events::{self, TOPIC_CONFIG};

/// Current configuration, or the defaults if none has been stored.
pub fn load(txn: &mut dyn StateTxn) -> Result<SystemConfig, EngineError> {
    Ok(txn.get_record(&config_key())?.unwrap_or_default())
}

fn require_admin(config: &SystemConfig, actor: &str) -> Result<(), EngineError> {
    if config.has_role(Role::Admin, actor) {
        Ok(())
    } else {
        Err(EngineError::Unauthorized(format!("{actor} is not an admin")))
    }
}

/// Validate, bump the version past `previous`, persist, and announce.
fn store(
    txn: &mut dyn StateTxn,
    mut config: SystemConfig,
    previous: u64,
    change: serde_json::Value,
) -> Result<SystemConfig, EngineError> {
    config.validate()?;
    if config.admins.is_empty() {
        return Err(EngineError::InvalidConfig("at least one admin is required".into()));
    }
    config.version = previous + 1;
    config.updated_at = events::now(txn);
    txn.put_record(&config_key(), &config)?;

    let by = events::caller(txn);
    info!(version = config.version, %by, %change, "config: updated");
    events::emit(
        txn,
        TOPIC_CONFIG,
        json!({ "version": config.version, "by": by, "change": change }),
    );
    Ok(config)
}

/// Bootstrap the configuration. Allowed only while no admin is registered;
/// the caller becomes the first admin.
pub fn init_config(txn: &mut dyn StateTxn, proposed: SystemConfig) -> Result<SystemConfig, EngineError> {
    let current = load(txn)?;
    if !current.admins.is_empty() {
        return Err(EngineError::Unauthorized("configuration is already initialized".into()));
    }
    let caller = events::caller(txn);
    if caller.is_empty() {
        return Err(EngineError::Unauthorized("anonymous caller".into()));
    }
    let mut config = proposed;
    config.admins.insert(caller);
    config.arbitrators = normalize_all(config.arbitrators);
    store(txn, config, current.version, json!({ "op": "init" }))
}

/// Replace the tunable parameters. The role registry is kept as stored;
/// roles change only through [`grant_role`] and [`revoke_role`].
pub fn update_config(txn: &mut dyn StateTxn, proposed: SystemConfig) -> Result<SystemConfig, EngineError> {
    let current = load(txn)?;
    require_admin(&current, &events::caller(txn))?;
    let config = SystemConfig {
        admins: current.admins.clone(),
        arbitrators: current.arbitrators.clone(),
        ..proposed
    };
    store(txn, config, current.version, json!({ "op": "update" }))
}

/// Register a ratable dimension together with its meta dimension.
pub fn add_dimension(txn: &mut dyn StateTxn, base: &str, meta: &str) -> Result<SystemConfig, EngineError> {
    let (base, meta) = (base.trim(), meta.trim());
    if base.is_empty() || meta.is_empty() {
        return Err(EngineError::InvalidInput("dimension names must not be blank".into()));
    }
    if base == meta {
        return Err(EngineError::InvalidInput(format!("{base} cannot be its own meta dimension")));
    }
    let mut config = load(txn)?;
    require_admin(&config, &events::caller(txn))?;
    let previous = config.version;
    config.dimensions.insert(base.to_string());
    config.meta_dimensions.insert(base.to_string(), meta.to_string());
    store(
        txn,
        config,
        previous,
        json!({ "op": "add_dimension", "dimension": base, "meta": meta }),
    )
}

pub fn grant_role(txn: &mut dyn StateTxn, role: Role, actor: &str) -> Result<SystemConfig, EngineError> {
    let actor = normalize(actor);
    if actor.is_empty() {
        return Err(EngineError::InvalidInput("actor is required".into()));
    }
    let mut config = load(txn)?;
    require_admin(&config, &events::caller(txn))?;
    let previous = config.version;
    config.role_members_mut(role).insert(actor.clone());
    store(
        txn,
        config,
        previous,
        json!({ "op": "grant_role", "role": role.to_string(), "actor": actor }),
    )
}

/// Remove `actor` from `role`. The last admin cannot be removed.
pub fn revoke_role(txn: &mut dyn StateTxn, role: Role, actor: &str) -> Result<SystemConfig, EngineError> {
    let actor = normalize(actor);
    let mut config = load(txn)?;
    require_admin(&config, &events::caller(txn))?;
    let previous = config.version;
    if !config.role_members_mut(role).remove(&actor) {
        return Err(EngineError::InvalidInput(format!("{actor} does not hold role {role}")));
    }
    if config.admins.is_empty() {
        return Err(EngineError::InvalidConfig("cannot revoke the last admin".into()));
    }
    store(
        txn,
        config,
        previous,
        json!({ "op": "revoke_role", "role": role.to_string(), "actor": actor }),
    )
}

fn normalize_all(actors: BTreeSet<String>) -> BTreeSet<String> {
    actors
        .iter()
        .map(String::as_str)
        .map(normalize)
        .filter(|a| !a.is_empty())
        .collect()
}
