//! Node settings.
//!
//! [`NodeSettings`] is assembled from built-in defaults, an optional TOML
//! file, and `VOUCH_`-prefixed environment variables, in that order of
//! precedence (later wins). List settings accept comma-separated values in
//! the environment, e.g. `VOUCH_BOOTSTRAP_ADMINS=alice,bob`; identities that
//! contain commas (distinguished names) belong in the file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ::config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const ENV_PREFIX: &str = "VOUCH";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeSettings {
    /// Root directory for all persistent data.
    pub data_dir: PathBuf,
    /// Log level filter string (e.g. "info", "vouch_engine=debug").
    pub log_level: String,
    /// "text" or "json".
    pub log_format: String,
    /// Identities registered as admins when the ledger has none.
    pub bootstrap_admins: Vec<String>,
    /// Identities registered as arbitrators alongside the bootstrap admins.
    pub bootstrap_arbitrators: Vec<String>,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            bootstrap_admins: Vec::new(),
            bootstrap_arbitrators: Vec::new(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vouch")
}

impl NodeSettings {
    /// Load settings from `file` (if given and present) and the process
    /// environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::build(file, None)
    }

    /// Like [`NodeSettings::load`], reading variables from `env` instead of
    /// the process environment.
    pub fn load_with_env(file: Option<&Path>, env: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::build(file, Some(env))
    }

    fn build(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("data_dir", defaults.data_dir.to_string_lossy().into_owned())?
            .set_default("log_level", defaults.log_level)?
            .set_default("log_format", defaults.log_format)?
            .set_default("bootstrap_admins", Vec::<String>::new())?
            .set_default("bootstrap_arbitrators", Vec::<String>::new())?;
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(false));
        }
        let environment = Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("bootstrap_admins")
            .with_list_parse_key("bootstrap_arbitrators")
            .source(env);
        builder.add_source(environment).build()?.try_deserialize()
    }

    /// Path to the RocksDB ledger directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("ledger")
    }
}
