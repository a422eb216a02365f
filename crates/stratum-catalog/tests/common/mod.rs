//! Shared in-memory mock backend for engine tests
//!
//! Records every statement (with bound params) that reaches a connection,
//! serves canned rows for queries, simulates table-existence probes, and
//! can be told to fail statements matching a substring.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use stratum_catalog::config::EngineConfig;
use stratum_catalog::connection::{Connection, ConnectionConfig, ConnectionFactory};
use stratum_catalog::credentials::encode_credentials;
use stratum_catalog::dialect::Dialect;
use stratum_catalog::error::{Error, Result};
use stratum_catalog::registry::ConnectionRegistry;
use stratum_catalog::types::{Purpose, Row, Value};

/// Shared state observed by tests across every mock connection
#[derive(Clone)]
pub struct MockState {
    /// Every successfully executed statement with its bound params
    pub statements: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
    /// Substring that makes a statement fail
    pub fail_on: Arc<Mutex<Option<String>>>,
    /// Rows served for ordinary queries
    pub canned_rows: Arc<Mutex<Vec<Row>>>,
    /// Pattern-routed query responses, checked before the canned rows
    pub routes: Arc<Mutex<Vec<(String, Vec<Row>)>>>,
    /// Answer for information_schema existence probes
    pub table_exists: Arc<AtomicBool>,
    /// URLs passed to the factory, in connect order
    pub connect_urls: Arc<Mutex<Vec<String>>>,
    /// Closed flag of every connection ever created, in connect order
    pub closed_flags: Arc<Mutex<Vec<Arc<AtomicBool>>>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            statements: Arc::new(Mutex::new(Vec::new())),
            fail_on: Arc::new(Mutex::new(None)),
            canned_rows: Arc::new(Mutex::new(vec![Row::new(
                vec!["result".into()],
                vec![Value::Int32(1)],
            )])),
            routes: Arc::new(Mutex::new(Vec::new())),
            table_exists: Arc::new(AtomicBool::new(false)),
            connect_urls: Arc::new(Mutex::new(Vec::new())),
            closed_flags: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockState {
    pub fn fail_on(&self, pattern: &str) {
        *self.fail_on.lock().unwrap() = Some(pattern.to_string());
    }

    pub fn set_canned_rows(&self, rows: Vec<Row>) {
        *self.canned_rows.lock().unwrap() = rows;
    }

    pub fn set_table_exists(&self, exists: bool) {
        self.table_exists.store(exists, Ordering::Relaxed);
    }

    pub fn route(&self, pattern: &str, rows: Vec<Row>) {
        self.routes.lock().unwrap().push((pattern.to_string(), rows));
    }

    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.statements.lock().unwrap().clone()
    }

    pub fn executed_matching(&self, pattern: &str) -> Vec<(String, Vec<Value>)> {
        self.executed()
            .into_iter()
            .filter(|(sql, _)| sql.contains(pattern))
            .collect()
    }

    fn check_fail(&self, sql: &str) -> Result<()> {
        if let Some(pattern) = self.fail_on.lock().unwrap().as_deref() {
            if sql.contains(pattern) {
                return Err(Error::execution(format!("mock failure on '{}'", pattern)));
            }
        }
        Ok(())
    }

    fn record(&self, sql: &str, params: &[Value]) {
        self.statements
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
    }
}

pub struct MockConnection {
    state: MockState,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.state.check_fail(sql)?;
        self.state.record(sql, params);

        if sql.contains("information_schema.tables") {
            let exists = self.state.table_exists.load(Ordering::Relaxed);
            return Ok(vec![Row::new(
                vec!["exists".into()],
                vec![Value::Bool(exists)],
            )]);
        }

        for (pattern, rows) in self.state.routes.lock().unwrap().iter() {
            if sql.contains(pattern.as_str()) {
                return Ok(rows.clone());
            }
        }

        Ok(self.state.canned_rows.lock().unwrap().clone())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.state.check_fail(sql)?;
        self.state.record(sql, params);
        Ok(1)
    }

    async fn is_valid(&self) -> bool {
        !self.closed.load(Ordering::Relaxed)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

pub struct MockFactory {
    pub state: MockState,
    pub dialect: Dialect,
}

#[async_trait]
impl ConnectionFactory for MockFactory {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        self.state
            .connect_urls
            .lock()
            .unwrap()
            .push(config.url.clone());

        let closed = Arc::new(AtomicBool::new(false));
        self.state.closed_flags.lock().unwrap().push(closed.clone());

        Ok(Box::new(MockConnection {
            state: self.state.clone(),
            closed,
        }))
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

/// Engine configuration with credentials for every purpose
pub fn test_config(dialect: Dialect) -> EngineConfig {
    EngineConfig::new(dialect)
        .with_credential(Purpose::Catalog, encode_credentials("svc_catalog", "pw"))
        .with_credential(Purpose::Staging, encode_credentials("svc_staging", "pw"))
        .with_credential(Purpose::Primary, encode_credentials("svc_primary", "pw"))
        .with_actor("tester")
}

/// Registry wired to the mock factory
pub fn mock_registry(state: &MockState, config: EngineConfig) -> Arc<ConnectionRegistry> {
    let dialect = config.dialect;
    Arc::new(ConnectionRegistry::with_factory(
        config,
        Arc::new(MockFactory {
            state: state.clone(),
            dialect,
        }),
    ))
}
