//! Purpose-scoped connection registry
//!
//! Owns zero-or-one live connection per [`Purpose`]. Re-connecting a
//! purpose always disposes the previous handle before opening the new one,
//! so at most one handle per purpose is ever live. The whole map sits
//! behind one async mutex; `connect` holds it across the dispose/open pair
//! so a concurrent caller can never observe two handles for one purpose.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::EngineConfig;
use crate::connection::{Connection, ConnectionConfig, ConnectionFactory};
use crate::credentials;
use crate::error::{Error, Result};
use crate::types::Purpose;

/// Per-call overrides for [`ConnectionRegistry::connect`]
///
/// Unset fields fall back to the engine configuration; user/password fall
/// back to the purpose's resolved credential blob.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Host override
    pub host: Option<String>,
    /// Port override
    pub port: Option<u16>,
    /// User override
    pub user: Option<String>,
    /// Password override
    pub password: Option<String>,
}

/// Registry holding one optional live connection per purpose
pub struct ConnectionRegistry {
    config: EngineConfig,
    factory: Arc<dyn ConnectionFactory>,
    slots: Mutex<HashMap<Purpose, Arc<dyn Connection>>>,
}

impl ConnectionRegistry {
    /// Create a registry using the compiled-in backend for the configured
    /// dialect
    pub fn new(config: EngineConfig) -> Result<Self> {
        let factory = default_factory(&config)?;
        Ok(Self::with_factory(config, factory))
    }

    /// Create a registry with an explicit connection factory
    pub fn with_factory(config: EngineConfig, factory: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            config,
            factory,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The engine configuration this registry was built with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open (or replace) the connection for a purpose
    ///
    /// Idempotent under repeated calls: the previous handle, if any, is
    /// closed before the new one is opened.
    pub async fn connect(&self, purpose: Purpose, opts: ConnectOptions) -> Result<()> {
        let dialect = self.config.dialect;
        let profile = dialect.profile();

        let (user, password) = match (opts.user, opts.password) {
            (Some(user), Some(password)) => (user, password),
            (user, password) => {
                let resolved = credentials::resolve(&self.config, purpose)?;
                (
                    user.unwrap_or(resolved.user),
                    password.unwrap_or(resolved.password),
                )
            }
        };

        let host = opts.host.unwrap_or_else(|| self.config.host.clone());
        let port = opts
            .port
            .or(self.config.port)
            .unwrap_or(profile.default_port);

        let schema = self.config.schema_name(purpose);
        let database = if profile.shared_database {
            self.config.database.clone()
        } else {
            schema.clone()
        };

        let url = dialect.connection_url(&user, &password, &host, port, &database, &schema);
        let conn_config = ConnectionConfig::new(url);

        // Hold the slot lock across dispose + open so a concurrent connect
        // for the same purpose cannot leave two live handles.
        let mut slots = self.slots.lock().await;

        if let Some(old) = slots.remove(&purpose) {
            debug!(purpose = %purpose, "replacing existing connection");
            if let Err(e) = old.close().await {
                debug!(purpose = %purpose, error = %e, "error closing replaced connection");
            }
        }

        let handle = self.factory.connect(&conn_config).await?;
        slots.insert(purpose, Arc::from(handle));
        debug!(purpose = %purpose, dialect = %dialect, "connected");

        Ok(())
    }

    /// Whether a live connection exists for the purpose
    pub async fn is_connected(&self, purpose: Purpose) -> bool {
        self.slots.lock().await.contains_key(&purpose)
    }

    /// Close the connection for a purpose
    ///
    /// Returns whether a live connection actually existed. Closing an
    /// unconnected purpose is a no-op, not an error.
    pub async fn close(&self, purpose: Purpose) -> bool {
        let removed = self.slots.lock().await.remove(&purpose);
        match removed {
            Some(conn) => {
                if let Err(e) = conn.close().await {
                    debug!(purpose = %purpose, error = %e, "error closing connection");
                }
                true
            }
            None => false,
        }
    }

    /// Close every live connection
    pub async fn close_all(&self) {
        for purpose in Purpose::ALL {
            self.close(purpose).await;
        }
    }

    /// Get the stored handle for a purpose
    ///
    /// Callers needing a connection should call [`Self::ensure`] (or
    /// [`Self::connect`]) first.
    pub async fn handle(&self, purpose: Purpose) -> Result<Arc<dyn Connection>> {
        self.slots
            .lock()
            .await
            .get(&purpose)
            .cloned()
            .ok_or_else(|| Error::connection(format!("purpose '{}' is not connected", purpose)))
    }

    /// Connect with configuration defaults when no handle exists yet
    pub async fn ensure(&self, purpose: Purpose) -> Result<()> {
        if self.is_connected(purpose).await {
            return Ok(());
        }
        self.connect(purpose, ConnectOptions::default()).await
    }
}

/// Resolve the compiled-in factory for the configured dialect
fn default_factory(config: &EngineConfig) -> Result<Arc<dyn ConnectionFactory>> {
    match config.dialect {
        #[cfg(feature = "postgres")]
        crate::dialect::Dialect::Postgresql => Ok(Arc::new(crate::postgres::PgConnectionFactory)),
        #[cfg(feature = "mysql")]
        crate::dialect::Dialect::Mysql => Ok(Arc::new(crate::mysql::MySqlConnectionFactory)),
        #[allow(unreachable_patterns)]
        other => Err(Error::config(format!(
            "no backend compiled for dialect {}",
            other
        ))),
    }
}
