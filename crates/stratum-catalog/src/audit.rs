//! Operation audit logging
//!
//! Every executed query/write produces one immutable row in the central
//! audit table, which lives in the catalog schema regardless of which
//! purpose the operation touched. The logger keeps its own catalog
//! connection dependency (ensured on demand, left open) so audited
//! operations do not disturb the connection of the purpose they ran
//! against. A failed audit insert must never fail the audited operation:
//! it is swallowed and surfaced only as a warning diagnostic.

use chrono::NaiveDateTime;
use rand::Rng;
use tracing::warn;

use crate::config::EngineConfig;
use crate::credentials;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::registry::ConnectionRegistry;
use crate::security::escape_string_literal;
use crate::types::{ExecStatus, Purpose, Value};

/// Name of the audit log table in the catalog schema
pub const AUDIT_TABLE: &str = "ct_op_log";

/// Audit table columns, in insert order.
/// Primary key is (user_id, db_id, schema_nm, start_dt, rand_key).
pub const AUDIT_LOG_COLUMNS: [&str; 12] = [
    "user_id",
    "db_id",
    "schema_nm",
    "start_dt",
    "rand_key",
    "end_dt",
    "record_cnt",
    "column_cnt",
    "sql_stmt",
    "status",
    "error_msg",
    "cret_nm",
];

/// Audit metadata columns appended to written rows
pub const AUDIT_COLUMNS: [&str; 4] = ["cret_dt", "cret_nm", "mdfy_dt", "mdfy_nm"];

/// Maximum stored statement length
pub const MAX_STATEMENT_LEN: usize = 3500;

/// One immutable audit entry describing a single executed operation
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// Operator identity
    pub user_id: String,
    /// Database identity (user part of the purpose's credential blob)
    pub db_id: String,
    /// Physical schema the operation targeted
    pub schema_nm: String,
    /// Operation start time
    pub start_dt: NaiveDateTime,
    /// Collision-avoidant random key disambiguating same-second entries
    pub rand_key: i64,
    /// Operation end time
    pub end_dt: NaiveDateTime,
    /// Result row count (0 on failure)
    pub record_cnt: i64,
    /// Result column count (0 on failure)
    pub column_cnt: i64,
    /// Escaped statement snapshot, truncated to [`MAX_STATEMENT_LEN`]
    pub sql_stmt: String,
    /// "1" ok / "0" failed
    pub status: ExecStatus,
    /// Captured error text, empty on success
    pub error_msg: String,
    /// Creator identity (same as `user_id`)
    pub cret_nm: String,
}

impl AuditRecord {
    /// Build the record for one executed operation
    #[allow(clippy::too_many_arguments)]
    pub fn for_operation(
        config: &EngineConfig,
        purpose: Purpose,
        sql: &str,
        start_dt: NaiveDateTime,
        end_dt: NaiveDateTime,
        record_cnt: i64,
        column_cnt: i64,
        status: ExecStatus,
        error: Option<&str>,
    ) -> Self {
        // The db identity comes from the purpose's credential blob; an
        // unresolvable blob must not block logging.
        let db_id = credentials::resolve(config, purpose)
            .map(|c| c.user)
            .unwrap_or_default();

        let (record_cnt, column_cnt) = match status {
            ExecStatus::Ok => (record_cnt, column_cnt),
            ExecStatus::Failed => (0, 0),
        };

        Self {
            user_id: config.actor.clone(),
            db_id,
            schema_nm: config.schema_name(purpose),
            start_dt,
            rand_key: random_key(),
            end_dt,
            record_cnt,
            column_cnt,
            sql_stmt: statement_snapshot(sql),
            status,
            error_msg: error
                .map(|e| escape_string_literal(e))
                .unwrap_or_default(),
            cret_nm: config.actor.clone(),
        }
    }

    /// Bound parameter values, in [`AUDIT_LOG_COLUMNS`] order
    pub fn params(&self) -> Vec<Value> {
        vec![
            Value::String(self.user_id.clone()),
            Value::String(self.db_id.clone()),
            Value::String(self.schema_nm.clone()),
            Value::DateTime(self.start_dt),
            // The audit table stores these as 32-bit integers; the spread
            // key tops out below i32::MAX.
            Value::Int32(self.rand_key as i32),
            Value::DateTime(self.end_dt),
            Value::Int32(self.record_cnt as i32),
            Value::Int32(self.column_cnt as i32),
            Value::String(self.sql_stmt.clone()),
            Value::String(self.status.as_str().to_string()),
            Value::String(self.error_msg.clone()),
            Value::String(self.cret_nm.clone()),
        ]
    }
}

/// Generate the record key: uniform in [0, 10^8), spread by [`spread_key`]
pub fn random_key() -> i64 {
    spread_key(rand::thread_rng().gen_range(0..100_000_000))
}

/// Key-spreading rule inherited from the source system: keys below 10^8 are
/// scaled by 10 to thin out the low range. Keys therefore always land in
/// [0, 10^9). Collisions within one (user, db, schema, second) remain
/// possible; the schema defines no conflict resolution for them.
pub fn spread_key(raw: i64) -> i64 {
    if raw < 100_000_000 {
        raw * 10
    } else {
        raw
    }
}

/// Escape quotes and truncate the statement snapshot stored with a record
pub fn statement_snapshot(sql: &str) -> String {
    escape_string_literal(sql)
        .chars()
        .take(MAX_STATEMENT_LEN)
        .collect()
}

/// Writer for the central audit table
pub struct AuditLogger {
    dialect: Dialect,
    catalog_schema: String,
    insert_sql: String,
}

impl AuditLogger {
    /// Create a logger targeting the catalog schema of the given config
    pub fn new(config: &EngineConfig) -> Self {
        let catalog_schema = config.schema_name(Purpose::Catalog);
        let insert_sql =
            config
                .dialect
                .insert_sql(Some(&catalog_schema), AUDIT_TABLE, &AUDIT_LOG_COLUMNS);
        Self {
            dialect: config.dialect,
            catalog_schema,
            insert_sql,
        }
    }

    /// Write an audit record through the registry's catalog connection
    ///
    /// Never returns an error: a lost audit entry must not fail user work.
    pub async fn record(&self, registry: &ConnectionRegistry, record: AuditRecord) {
        if let Err(e) = self.try_record(registry, &record).await {
            warn!(
                schema = %self.catalog_schema,
                dialect = %self.dialect,
                error = %e,
                "audit write failed; operation result is unaffected"
            );
        }
    }

    async fn try_record(&self, registry: &ConnectionRegistry, record: &AuditRecord) -> Result<()> {
        registry.ensure(Purpose::Catalog).await?;
        let conn = registry.handle(Purpose::Catalog).await?;

        conn.execute(&self.insert_sql, &record.params())
            .await
            .map_err(|e| Error::audit_write(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread_key_rule() {
        assert_eq!(spread_key(0), 0);
        assert_eq!(spread_key(5), 50);
        assert_eq!(spread_key(99_999_999), 999_999_990);
        assert_eq!(spread_key(100_000_000), 100_000_000);
    }

    #[test]
    fn test_random_key_range() {
        for _ in 0..1000 {
            let key = random_key();
            assert!((0..1_000_000_000).contains(&key));
        }
    }

    #[test]
    fn test_statement_snapshot_escapes_and_truncates() {
        assert_eq!(statement_snapshot("SELECT 'x'"), "SELECT ''x''");

        let long = "s".repeat(5000);
        assert_eq!(statement_snapshot(&long).len(), MAX_STATEMENT_LEN);
    }

    #[test]
    fn test_record_zeroes_counts_on_failure() {
        let config = EngineConfig::default()
            .with_credential(Purpose::Primary, crate::credentials::encode_credentials("db9", "pw"));

        let now = chrono::Utc::now().naive_utc();
        let record = AuditRecord::for_operation(
            &config,
            Purpose::Primary,
            "SELECT 1",
            now,
            now,
            42,
            3,
            ExecStatus::Failed,
            Some("relation does not exist"),
        );

        assert_eq!(record.record_cnt, 0);
        assert_eq!(record.column_cnt, 0);
        assert_eq!(record.db_id, "db9");
        assert_eq!(record.schema_nm, "stratum_primary");
        assert_eq!(record.status, ExecStatus::Failed);
        assert!(!record.error_msg.is_empty());
    }

    #[test]
    fn test_record_params_order() {
        let config = EngineConfig::default();
        let now = chrono::Utc::now().naive_utc();
        let record = AuditRecord::for_operation(
            &config,
            Purpose::Catalog,
            "SELECT 1",
            now,
            now,
            1,
            1,
            ExecStatus::Ok,
            None,
        );

        let params = record.params();
        assert_eq!(params.len(), AUDIT_LOG_COLUMNS.len());
        assert_eq!(params[0], Value::String(config.actor.clone()));
        assert_eq!(params[9], Value::String("1".into()));
        assert_eq!(params[10], Value::String(String::new()));
    }
}
