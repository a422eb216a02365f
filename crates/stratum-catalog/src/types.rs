//! Core value and data types for stratum-catalog
//!
//! - Value: SQL value representation shared by all backends
//! - Row / Frame: query results and tabular write payloads
//! - ColumnDef: ordered column metadata driving DDL synthesis
//! - Purpose: logical connection slot (catalog / staging / primary)
//! - QueryResult: rowset plus soft status/error capture

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{Error, Result};

/// SQL value type that can hold any database value the engine touches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean value
    Bool(bool),
    /// 16-bit signed integer (SMALLINT)
    Int16(i16),
    /// 32-bit signed integer (INTEGER)
    Int32(i32),
    /// 64-bit signed integer (BIGINT)
    Int64(i64),
    /// 32-bit floating point (REAL)
    Float32(f32),
    /// 64-bit floating point (DOUBLE PRECISION)
    Float64(f64),
    /// Arbitrary precision decimal (NUMERIC, DECIMAL)
    Decimal(Decimal),
    /// Text string (VARCHAR, TEXT, CHAR)
    String(String),
    /// Binary data (BYTEA, BLOB)
    Bytes(Vec<u8>),
    /// Date without time (DATE)
    Date(NaiveDate),
    /// Time without date (TIME)
    Time(NaiveTime),
    /// Timestamp without timezone (TIMESTAMP)
    DateTime(NaiveDateTime),
    /// Timestamp with timezone (TIMESTAMPTZ)
    DateTimeTz(DateTime<Utc>),
    /// UUID
    Uuid(Uuid),
    /// JSON value
    Json(serde_json::Value),
}

impl Value {
    /// Check if value is NULL
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the logical SQL type name used for column inference
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BOOLEAN",
            Self::Int16(_) => "SMALLINT",
            Self::Int32(_) => "INTEGER",
            Self::Int64(_) => "BIGINT",
            Self::Float32(_) => "REAL",
            Self::Float64(_) => "DOUBLE PRECISION",
            Self::Decimal(_) => "DECIMAL",
            Self::String(_) => "VARCHAR",
            Self::Bytes(_) => "BYTEA",
            Self::Date(_) => "DATE",
            Self::Time(_) => "TIME",
            Self::DateTime(_) => "TIMESTAMP",
            Self::DateTimeTz(_) => "TIMESTAMPTZ",
            Self::Uuid(_) => "UUID",
            Self::Json(_) => "JSON",
        }
    }

    /// Try to convert to bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int16(n) => Some(*n != 0),
            Self::Int32(n) => Some(*n != 0),
            Self::Int64(n) => Some(*n != 0),
            Self::String(s) => match s.to_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Some(true),
                "false" | "f" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Try to convert to i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int16(n) => Some(i64::from(*n)),
            Self::Int32(n) => Some(i64::from(*n)),
            Self::Int64(n) => Some(*n),
            Self::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTimeTz(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Self::Null,
        }
    }
}

/// Database row as ordered column values
#[derive(Debug, Clone)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Create a new row
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Get column count
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if row is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get column names
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get all values
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get value by column index
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Get value by column name (case-insensitive)
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|idx| self.values.get(idx))
    }
}

/// Ordered tabular payload for table writes
///
/// Column order is significant: it defines the column order of generated
/// inserts and of any table created from the frame.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    /// Create an empty frame with the given column names
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row; its arity must match the column count
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::invalid_metadata(format!(
                "row arity {} does not match column count {}",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Number of rows
    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column names, in order
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows, in insertion order
    #[inline]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Whether the frame holds no rows
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Drop the named columns wherever they appear (case-insensitive)
    pub fn drop_columns(&mut self, names: &[&str]) {
        let doomed: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| names.iter().any(|n| c.eq_ignore_ascii_case(n)))
            .map(|(i, _)| i)
            .collect();

        for &idx in doomed.iter().rev() {
            self.columns.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
        }
    }

    /// Append a column filled with the same value in every row
    pub fn push_column(&mut self, name: impl Into<String>, fill: Value) {
        self.columns.push(name.into());
        for row in &mut self.rows {
            row.push(fill.clone());
        }
    }

    /// Lower-case all column names in place
    pub fn lowercase_columns(&mut self) {
        for c in &mut self.columns {
            *c = c.to_lowercase();
        }
    }
}

/// Ordered column metadata consumed by the DDL synthesizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Logical SQL type (e.g. VARCHAR, INTEGER)
    pub data_type: String,
    /// Length for string/char types, when bounded
    pub length: Option<u32>,
    /// Whether the column admits NULL
    pub nullable: bool,
    /// Column comment text
    pub comment: Option<String>,
    /// Whether the column belongs to the primary key
    pub primary_key: bool,
    /// Sequence order (1-based); defines generated column order
    pub ordinal: u32,
}

impl ColumnDef {
    /// Create a nullable, non-key column of the given type
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            length: None,
            nullable: true,
            comment: None,
            primary_key: false,
            ordinal: 0,
        }
    }

    /// Set the bounded length
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Mark the column NOT NULL
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Attach a comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Mark the column as part of the primary key (implies NOT NULL)
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Set the sequence order
    pub fn at(mut self, ordinal: u32) -> Self {
        self.ordinal = ordinal;
        self
    }
}

/// Logical connection slot
///
/// Each purpose maps to one physical schema (`<prefix>_<purpose>`) and one
/// credential entry. The catalog purpose additionally hosts the metadata
/// tables and the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    /// Metadata definitions and the audit log table
    Catalog,
    /// Operational staging area
    Staging,
    /// Primary data schema
    Primary,
}

impl Purpose {
    /// All purposes, in declaration order
    pub const ALL: [Purpose; 3] = [Purpose::Catalog, Purpose::Staging, Purpose::Primary];

    /// Lowercase name used in schema names and credential keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Staging => "staging",
            Self::Primary => "primary",
        }
    }

    /// Physical schema name for this purpose under the given prefix
    pub fn schema_name(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.as_str())
    }
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Purpose {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "catalog" => Ok(Self::Catalog),
            "staging" => Ok(Self::Staging),
            "primary" => Ok(Self::Primary),
            other => Err(Error::config(format!("unknown purpose: {}", other))),
        }
    }
}

/// Execution status recorded with every audited operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecStatus {
    /// Operation completed ("1")
    #[default]
    Ok,
    /// Operation failed; error text captured ("0")
    Failed,
}

impl ExecStatus {
    /// Status flag as stored in the audit table
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "1",
            Self::Failed => "0",
        }
    }

    /// Whether the operation completed
    #[inline]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Result of a read query: rowset plus soft status capture
///
/// A failed execution is not raised; it surfaces here as an empty rowset
/// with status `Failed` and a non-empty error text.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Column names of the rowset (empty when the query failed)
    pub columns: Vec<String>,
    /// Result rows
    pub rows: Vec<Row>,
    /// Execution status
    pub status: ExecStatus,
    /// Error text when status is `Failed`
    pub error: Option<String>,
    /// Wall time of the round-trip
    pub elapsed: Duration,
}

impl QueryResult {
    /// Build a successful result from backend rows
    pub fn from_rows(rows: Vec<Row>, elapsed: Duration) -> Self {
        let columns = rows
            .first()
            .map(|r| r.columns().to_vec())
            .unwrap_or_default();
        Self {
            columns,
            rows,
            status: ExecStatus::Ok,
            error: None,
            elapsed,
        }
    }

    /// Build an empty failed result carrying the error text
    pub fn failed(error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            status: ExecStatus::Failed,
            error: Some(error.into()),
            elapsed,
        }
    }

    /// Number of rows
    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Whether the query completed
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}
