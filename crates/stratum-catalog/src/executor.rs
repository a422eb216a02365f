//! Audited query/write execution
//!
//! The executor runs read queries and table writes against a purpose's
//! registry connection and wraps every operation with the audit logger.
//! Execution failures follow a "fail soft, log always" policy: they are
//! captured into the returned outcome (status "0" + error text) instead of
//! raised, and the audit entry is written either way. Only invalid input
//! (bad identifiers, empty metadata) and configuration/connection problems
//! raise.
//!
//! Every call has two connection dependencies: the operation's own purpose
//! and the catalog purpose for the audit insert. Both are ensured
//! independently; neither is implicitly closed. Callers should still not
//! assume a handle outlives a call: re-check `is_connected` or call
//! `connect` before reuse.

use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::audit::{AuditLogger, AuditRecord, AUDIT_COLUMNS};
use crate::config::EngineConfig;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::registry::ConnectionRegistry;
use crate::security;
use crate::types::{ColumnDef, ExecStatus, Frame, Purpose, QueryResult, Value};

/// Disposition of a table write when the target already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Error (captured, not raised) when the table already exists
    #[default]
    FailIfExists,
    /// Drop and re-create the table before writing
    Replace,
    /// Insert into the existing table (created when absent)
    Append,
}

/// Outcome of a table write or row delete, soft-capturing failure
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    /// Execution status
    pub status: ExecStatus,
    /// Error text when status is `Failed`
    pub error: Option<String>,
    /// Rows written/affected (0 on failure)
    pub rows: u64,
    /// Columns written (0 on failure or for deletes)
    pub columns: u64,
    /// Wall time of the operation
    pub elapsed: Duration,
}

impl WriteOutcome {
    /// Whether the write completed
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

/// One failed statement inside a best-effort batch
#[derive(Debug, Clone)]
pub struct StatementFailure {
    /// Zero-based position in the batch
    pub index: usize,
    /// The statement text
    pub statement: String,
    /// Captured error text
    pub error: String,
}

/// Report of a multi-statement batch run
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Statements attempted
    pub total: usize,
    /// Statements that completed
    pub succeeded: usize,
    /// Failures, in batch order
    pub failures: Vec<StatementFailure>,
}

impl BatchReport {
    /// Whether every statement completed
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of [`Executor::run_statements`]
#[derive(Debug)]
pub enum BatchOutcome {
    /// Single-statement mode: the statement ran as a query
    Rowset(QueryResult),
    /// Multi-statement mode: per-statement best-effort report
    Batch(BatchReport),
}

/// Strip any existing audit metadata columns from the frame and append a
/// fresh set, so re-application is idempotent
pub fn append_audit_columns(frame: &mut Frame, agent: &str, now: NaiveDateTime) {
    frame.drop_columns(&AUDIT_COLUMNS);
    frame.push_column("cret_dt", Value::DateTime(now));
    frame.push_column("cret_nm", Value::String(agent.to_string()));
    frame.push_column("mdfy_dt", Value::Null);
    frame.push_column("mdfy_nm", Value::Null);
}

/// Infer column definitions from the first non-null value of each column
pub fn infer_columns(frame: &Frame) -> Vec<ColumnDef> {
    frame
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let data_type = frame
                .rows()
                .iter()
                .find_map(|row| {
                    let value = &row[idx];
                    (!value.is_null()).then(|| value.sql_type())
                })
                .unwrap_or("VARCHAR");
            ColumnDef::new(name.clone(), data_type).at(idx as u32 + 1)
        })
        .collect()
}

/// Query/write executor bound to one registry
pub struct Executor {
    config: EngineConfig,
    registry: Arc<ConnectionRegistry>,
    audit: AuditLogger,
}

impl Executor {
    /// Create an executor with its own registry for the given config
    pub fn new(config: EngineConfig) -> Result<Self> {
        let registry = Arc::new(ConnectionRegistry::new(config.clone())?);
        Ok(Self::with_registry(registry))
    }

    /// Create an executor over an existing registry
    pub fn with_registry(registry: Arc<ConnectionRegistry>) -> Self {
        let config = registry.config().clone();
        let audit = AuditLogger::new(&config);
        Self {
            config,
            registry,
            audit,
        }
    }

    /// The registry this executor runs against
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// The engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute a read query against a purpose, audit-logging the outcome
    ///
    /// Execution failure yields an empty rowset with status "0" and the
    /// error text; it is not raised.
    pub async fn query(&self, sql: &str, purpose: Purpose) -> Result<QueryResult> {
        self.registry.ensure(purpose).await?;
        let conn = self.registry.handle(purpose).await?;

        let start_dt = Utc::now().naive_utc();
        let timer = Instant::now();
        let result = conn.query(sql, &[]).await;
        let elapsed = timer.elapsed();
        let end_dt = Utc::now().naive_utc();

        let outcome = match result {
            Ok(rows) => QueryResult::from_rows(rows, elapsed),
            Err(e) => {
                debug!(purpose = %purpose, error = %e, "query failed");
                QueryResult::failed(e.to_string(), elapsed)
            }
        };

        let record = AuditRecord::for_operation(
            &self.config,
            purpose,
            sql,
            start_dt,
            end_dt,
            outcome.row_count() as i64,
            outcome.column_count() as i64,
            outcome.status,
            outcome.error.as_deref(),
        );
        self.audit.record(&self.registry, record).await;

        Ok(outcome)
    }

    /// Write a frame into a table, audit-logging the outcome
    ///
    /// With `add_audit_columns`, the four audit metadata columns are
    /// re-derived idempotently before the write. PostgreSQL targets get
    /// lower-cased table and column names.
    pub async fn write_table(
        &self,
        name: &str,
        frame: Frame,
        mode: WriteMode,
        purpose: Purpose,
        add_audit_columns: bool,
    ) -> Result<WriteOutcome> {
        security::validate_sql_identifier(name)?;
        if frame.column_count() == 0 {
            return Err(Error::invalid_metadata("frame has no columns"));
        }
        for column in frame.columns() {
            security::validate_sql_identifier(column)?;
        }

        self.registry.ensure(purpose).await?;

        let mut frame = frame;
        if add_audit_columns {
            append_audit_columns(&mut frame, &self.config.agent, Utc::now().naive_utc());
        }

        let profile = self.config.dialect.profile();
        let table = if profile.lowercase_identifiers {
            frame.lowercase_columns();
            name.to_lowercase()
        } else {
            name.to_string()
        };

        let start_dt = Utc::now().naive_utc();
        let timer = Instant::now();
        let write_result = self.perform_write(&table, &frame, mode, purpose).await;
        let elapsed = timer.elapsed();
        let end_dt = Utc::now().naive_utc();

        let (status, error) = match write_result {
            Ok(()) => (ExecStatus::Ok, None),
            Err(e) => (ExecStatus::Failed, Some(e.to_string())),
        };
        let (rows, columns) = match status {
            ExecStatus::Ok => (frame.row_count() as u64, frame.column_count() as u64),
            ExecStatus::Failed => (0, 0),
        };

        let statement = match mode {
            WriteMode::Append => format!("insert into {}", table),
            _ => format!("create table {}", table),
        };
        let record = AuditRecord::for_operation(
            &self.config,
            purpose,
            &statement,
            start_dt,
            end_dt,
            rows as i64,
            columns as i64,
            status,
            error.as_deref(),
        );
        self.audit.record(&self.registry, record).await;

        Ok(WriteOutcome {
            status,
            error,
            rows,
            columns,
            elapsed,
        })
    }

    async fn perform_write(
        &self,
        table: &str,
        frame: &Frame,
        mode: WriteMode,
        purpose: Purpose,
    ) -> Result<()> {
        let dialect = self.config.dialect;
        let conn = self.registry.handle(purpose).await?;
        let exists = self.probe_exists(conn.as_ref(), table, purpose).await?;

        match mode {
            WriteMode::FailIfExists if exists => {
                return Err(Error::execution(format!(
                    "table '{}' already exists",
                    table
                )));
            }
            WriteMode::Replace => {
                conn.execute(&dialect.drop_table_sql(None, table), &[])
                    .await?;
                self.create_from_frame(conn.as_ref(), table, frame).await?;
            }
            WriteMode::Append if exists => {}
            // FailIfExists on a fresh table, or Append with no table yet
            _ => self.create_from_frame(conn.as_ref(), table, frame).await?,
        }

        if frame.is_empty() {
            return Ok(());
        }

        let columns: Vec<&str> = frame.columns().iter().map(String::as_str).collect();
        let insert = dialect.insert_sql(None, table, &columns);
        for row in frame.rows() {
            conn.execute(&insert, row).await?;
        }

        Ok(())
    }

    async fn create_from_frame(
        &self,
        conn: &dyn Connection,
        table: &str,
        frame: &Frame,
    ) -> Result<()> {
        let dialect = self.config.dialect;
        let clauses: Vec<String> = infer_columns(frame)
            .iter()
            .map(|c| {
                format!(
                    "{} {}",
                    dialect.quote_identifier(&c.name),
                    dialect.native_type(c)
                )
            })
            .collect();

        let sql = format!(
            "CREATE TABLE {} ({})",
            dialect.quote_identifier(table),
            clauses.join(", ")
        );
        conn.execute(&sql, &[]).await?;
        Ok(())
    }

    async fn probe_exists(
        &self,
        conn: &dyn Connection,
        table: &str,
        purpose: Purpose,
    ) -> Result<bool> {
        let schema = self.config.schema_name(purpose);
        let sql = self.config.dialect.table_exists_sql(&schema, table);
        let rows = conn.query(&sql, &[]).await?;
        Ok(rows
            .first()
            .and_then(|r| r.get(0))
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    /// Check whether a table exists in the purpose's schema
    pub async fn table_exists(&self, name: &str, purpose: Purpose) -> Result<bool> {
        security::validate_sql_identifier(name)?;
        self.registry.ensure(purpose).await?;
        let conn = self.registry.handle(purpose).await?;
        self.probe_exists(conn.as_ref(), name, purpose).await
    }

    /// Run a batch of SQL statements separated by ';'
    ///
    /// Without `multi_statement`, exactly one statement is permitted and it
    /// runs as a query; with it, statements run one at a time and failures
    /// are collected while execution continues (best-effort, no rollback).
    pub async fn run_statements(
        &self,
        text: &str,
        purpose: Purpose,
        multi_statement: bool,
    ) -> Result<BatchOutcome> {
        let statements: Vec<&str> = text
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if statements.is_empty() {
            return Err(Error::invalid_metadata(
                "no executable statements in input",
            ));
        }
        if statements.len() > 1 && !multi_statement {
            return Err(Error::invalid_metadata(
                "multiple statements found; set multi_statement to execute them",
            ));
        }

        if !multi_statement {
            let rowset = self.query(text.trim(), purpose).await?;
            return Ok(BatchOutcome::Rowset(rowset));
        }

        self.registry.ensure(purpose).await?;
        let conn = self.registry.handle(purpose).await?;

        let mut report = BatchReport {
            total: statements.len(),
            ..Default::default()
        };
        for (index, statement) in statements.iter().enumerate() {
            match conn.execute(statement, &[]).await {
                Ok(_) => report.succeeded += 1,
                Err(e) => {
                    debug!(index, error = %e, "batch statement failed; continuing");
                    report.failures.push(StatementFailure {
                        index,
                        statement: (*statement).to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(BatchOutcome::Batch(report))
    }

    /// Delete rows matching the equality filters, soft-capturing failure
    pub async fn delete_rows(
        &self,
        table: &str,
        purpose: Purpose,
        filters: &[(&str, Value)],
    ) -> Result<WriteOutcome> {
        security::validate_sql_identifier(table)?;
        for (column, _) in filters {
            security::validate_sql_identifier(column)?;
        }

        self.registry.ensure(purpose).await?;
        let conn = self.registry.handle(purpose).await?;

        let dialect = self.config.dialect;
        let mut sql = format!("DELETE FROM {} WHERE 1=1", dialect.quote_identifier(table));
        let mut params = Vec::with_capacity(filters.len());
        for (position, (column, value)) in filters.iter().enumerate() {
            sql.push_str(&format!(
                " AND {} = {}",
                dialect.quote_identifier(column),
                dialect.placeholder(position + 1)
            ));
            params.push(value.clone());
        }

        let timer = Instant::now();
        let outcome = match conn.execute(&sql, &params).await {
            Ok(affected) => WriteOutcome {
                status: ExecStatus::Ok,
                error: None,
                rows: affected,
                columns: 0,
                elapsed: timer.elapsed(),
            },
            Err(e) => WriteOutcome {
                status: ExecStatus::Failed,
                error: Some(e.to_string()),
                rows: 0,
                columns: 0,
                elapsed: timer.elapsed(),
            },
        };

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_audit_columns_idempotent() {
        let mut frame = Frame::new(vec!["id".into(), "label".into()]);
        frame
            .push_row(vec![Value::Int32(1), Value::String("a".into())])
            .unwrap();

        let now = Utc::now().naive_utc();
        append_audit_columns(&mut frame, "stratum", now);
        append_audit_columns(&mut frame, "stratum", now);

        assert_eq!(
            frame.columns(),
            &[
                "id".to_string(),
                "label".to_string(),
                "cret_dt".to_string(),
                "cret_nm".to_string(),
                "mdfy_dt".to_string(),
                "mdfy_nm".to_string(),
            ]
        );
        assert_eq!(frame.rows()[0].len(), 6);
        assert_eq!(frame.rows()[0][3], Value::String("stratum".into()));
        assert!(frame.rows()[0][4].is_null());
    }

    #[test]
    fn test_infer_columns_skips_nulls() {
        let mut frame = Frame::new(vec!["id".into(), "note".into(), "blank".into()]);
        frame
            .push_row(vec![Value::Null, Value::Null, Value::Null])
            .unwrap();
        frame
            .push_row(vec![Value::Int64(7), Value::String("x".into()), Value::Null])
            .unwrap();

        let cols = infer_columns(&frame);
        assert_eq!(cols[0].data_type, "BIGINT");
        assert_eq!(cols[1].data_type, "VARCHAR");
        // All-null columns fall back to VARCHAR
        assert_eq!(cols[2].data_type, "VARCHAR");
        assert_eq!(cols[0].ordinal, 1);
        assert_eq!(cols[2].ordinal, 3);
    }

    #[test]
    fn test_write_mode_default() {
        assert_eq!(WriteMode::default(), WriteMode::FailIfExists);
    }
}
