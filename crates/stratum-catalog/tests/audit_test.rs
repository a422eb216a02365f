//! Integration tests for audit record generation and the audit logger

mod common;

use common::{mock_registry, test_config, MockState};
use std::collections::HashSet;

use stratum_catalog::audit::{
    random_key, statement_snapshot, AuditLogger, AuditRecord, AUDIT_LOG_COLUMNS, AUDIT_TABLE,
    MAX_STATEMENT_LEN,
};
use stratum_catalog::dialect::Dialect;
use stratum_catalog::types::{ExecStatus, Purpose, Value};

#[test]
fn test_random_key_stays_in_range() {
    for _ in 0..10_000 {
        let key = random_key();
        assert!((0..1_000_000_000).contains(&key), "key out of range: {}", key);
    }
}

#[test]
fn test_composite_identity_unique_across_timestamps() {
    let config = test_config(Dialect::Postgresql);
    let mut identities = HashSet::new();

    for second in 0..200 {
        let start = chrono::DateTime::from_timestamp(1_760_000_000 + second, 0)
            .unwrap()
            .naive_utc();
        let record = AuditRecord::for_operation(
            &config,
            Purpose::Primary,
            "SELECT 1",
            start,
            start,
            1,
            1,
            ExecStatus::Ok,
            None,
        );
        let identity = (
            record.user_id.clone(),
            record.db_id.clone(),
            record.schema_nm.clone(),
            record.start_dt,
            record.rand_key,
        );
        assert!(
            identities.insert(identity),
            "identity collided across distinct start timestamps"
        );
    }
}

#[test]
fn test_statement_snapshot_bound() {
    // Escaping happens before truncation, so a quote-heavy statement near
    // the limit still fits the audit column.
    let sql = format!("SELECT '{}'", "x".repeat(4000));
    let snapshot = statement_snapshot(&sql);
    assert!(snapshot.chars().count() <= MAX_STATEMENT_LEN);
    assert!(snapshot.starts_with("SELECT ''"));
}

#[tokio::test]
async fn test_logger_writes_through_catalog_purpose() {
    let state = MockState::default();
    let config = test_config(Dialect::Postgresql);
    let registry = mock_registry(&state, config.clone());
    let logger = AuditLogger::new(&config);

    let now = chrono::Utc::now().naive_utc();
    let record = AuditRecord::for_operation(
        &config,
        Purpose::Primary,
        "SELECT 1",
        now,
        now,
        3,
        2,
        ExecStatus::Ok,
        None,
    );
    logger.record(&registry, record).await;

    // The logger opened the catalog connection on its own
    assert!(registry.is_connected(Purpose::Catalog).await);
    assert!(!registry.is_connected(Purpose::Primary).await);

    let audits = state.executed_matching(AUDIT_TABLE);
    assert_eq!(audits.len(), 1);
    let (sql, params) = &audits[0];
    assert!(sql.contains("\"stratum_catalog\".\"ct_op_log\""));
    for column in AUDIT_LOG_COLUMNS {
        assert!(sql.contains(column), "insert is missing column {}", column);
    }
    assert_eq!(params.len(), 12);
    // The schema identifies the audited purpose, not the catalog
    assert_eq!(params[2], Value::String("stratum_primary".into()));
    // db identity comes from the purpose credential blob
    assert_eq!(params[1], Value::String("svc_primary".into()));
}

#[tokio::test]
async fn test_logger_leaves_catalog_connection_open() {
    let state = MockState::default();
    let config = test_config(Dialect::Postgresql);
    let registry = mock_registry(&state, config.clone());
    let logger = AuditLogger::new(&config);

    let now = chrono::Utc::now().naive_utc();
    for _ in 0..3 {
        let record = AuditRecord::for_operation(
            &config,
            Purpose::Staging,
            "SELECT 1",
            now,
            now,
            0,
            0,
            ExecStatus::Ok,
            None,
        );
        logger.record(&registry, record).await;
    }

    // One catalog connection serves all three inserts
    assert_eq!(state.connect_urls.lock().unwrap().len(), 1);
    assert_eq!(state.executed_matching(AUDIT_TABLE).len(), 3);
}

#[tokio::test]
async fn test_logger_swallows_insert_failure() {
    let state = MockState::default();
    state.fail_on(AUDIT_TABLE);
    let config = test_config(Dialect::Postgresql);
    let registry = mock_registry(&state, config.clone());
    let logger = AuditLogger::new(&config);

    let now = chrono::Utc::now().naive_utc();
    let record = AuditRecord::for_operation(
        &config,
        Purpose::Primary,
        "SELECT 1",
        now,
        now,
        1,
        1,
        ExecStatus::Ok,
        None,
    );

    // Must not panic or propagate
    logger.record(&registry, record).await;
    assert!(state.executed_matching(AUDIT_TABLE).is_empty());
}

#[tokio::test]
async fn test_logger_swallows_missing_catalog_credentials() {
    let state = MockState::default();
    // No credentials at all: the catalog connection cannot be ensured
    let config = stratum_catalog::config::EngineConfig::new(Dialect::Postgresql);
    let registry = mock_registry(&state, config.clone());
    let logger = AuditLogger::new(&config);

    let now = chrono::Utc::now().naive_utc();
    let record = AuditRecord::for_operation(
        &config,
        Purpose::Primary,
        "SELECT 1",
        now,
        now,
        1,
        1,
        ExecStatus::Ok,
        None,
    );

    logger.record(&registry, record).await;
    assert!(state.executed().is_empty());
}
