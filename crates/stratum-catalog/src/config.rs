//! Engine configuration
//!
//! The configuration is an explicit context object handed to each
//! component; there is no process-global state, so tests and embedders can
//! run several engines with distinct settings side by side.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::types::Purpose;

/// Configuration for one engine instance
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Target dialect
    #[serde(default = "default_dialect")]
    pub dialect: Dialect,

    /// Database server host
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port; falls back to the dialect's default when unset
    #[serde(default)]
    pub port: Option<u16>,

    /// Shared database name (PostgreSQL) / database name prefix (MySQL)
    #[serde(default = "default_database")]
    pub database: String,

    /// Prefix for purpose schema names (`<prefix>_<purpose>`)
    #[serde(default = "default_schema_prefix")]
    pub schema_prefix: String,

    /// Encoded credential blob per purpose (base64 of `user:password`)
    #[serde(default)]
    pub credentials: HashMap<Purpose, String>,

    /// Operator identity recorded as `user_id`/`cret_nm` in audit entries
    #[serde(default = "default_actor")]
    pub actor: String,

    /// Engine identity stamped into `cret_nm` audit columns on written rows
    #[serde(default = "default_agent")]
    pub agent: String,
}

fn default_dialect() -> Dialect {
    Dialect::Postgresql
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_database() -> String {
    "stratum".to_string()
}

fn default_schema_prefix() -> String {
    "stratum".to_string()
}

fn default_actor() -> String {
    "unknown_user".to_string()
}

fn default_agent() -> String {
    "stratum".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(default_dialect())
    }
}

impl EngineConfig {
    /// Create a configuration with defaults for the given dialect
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            host: default_host(),
            port: None,
            database: default_database(),
            schema_prefix: default_schema_prefix(),
            credentials: HashMap::new(),
            actor: default_actor(),
            agent: default_agent(),
        }
    }

    /// Load configuration from process environment variables
    ///
    /// Recognised entries:
    /// - `STRATUM_DIALECT` (postgresql | mysql, default postgresql)
    /// - `STRATUM_HOST`, `STRATUM_PORT`, `STRATUM_DATABASE`,
    ///   `STRATUM_SCHEMA_PREFIX`
    /// - `STRATUM_CATALOG_INFO`, `STRATUM_STAGING_INFO`,
    ///   `STRATUM_PRIMARY_INFO` — encoded credential blobs
    /// - `STRATUM_ACTOR` (falls back to `USER`)
    pub fn from_env() -> Result<Self> {
        let dialect = match env_var("STRATUM_DIALECT") {
            Some(name) => Dialect::parse(&name)?,
            None => default_dialect(),
        };

        let mut config = Self::new(dialect);

        if let Some(host) = env_var("STRATUM_HOST") {
            config.host = host;
        }
        if let Some(port) = env_var("STRATUM_PORT") {
            config.port = port.parse().ok();
        }
        if let Some(database) = env_var("STRATUM_DATABASE") {
            config.database = database;
        }
        if let Some(prefix) = env_var("STRATUM_SCHEMA_PREFIX") {
            config.schema_prefix = prefix;
        }

        for purpose in Purpose::ALL {
            let key = format!("STRATUM_{}_INFO", purpose.as_str().to_uppercase());
            if let Some(blob) = env_var(&key) {
                config.credentials.insert(purpose, blob);
            }
        }

        if let Some(actor) = env_var("STRATUM_ACTOR").or_else(|| env_var("USER")) {
            config.actor = actor;
        }

        Ok(config)
    }

    /// Set the server host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the database name / name prefix
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the purpose schema prefix
    pub fn with_schema_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.schema_prefix = prefix.into();
        self
    }

    /// Register an encoded credential blob for a purpose
    pub fn with_credential(mut self, purpose: Purpose, blob: impl Into<String>) -> Self {
        self.credentials.insert(purpose, blob.into());
        self
    }

    /// Set the operator identity
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Physical schema name for a purpose
    pub fn schema_name(&self, purpose: Purpose) -> String {
        purpose.schema_name(&self.schema_prefix)
    }
}

/// Read a non-empty environment variable
fn env_var(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => None,
    }
}
