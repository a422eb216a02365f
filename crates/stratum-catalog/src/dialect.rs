//! SQL dialect profiles for stratum-catalog
//!
//! The two supported engines differ in a small, enumerable set of syntax
//! points: identifier quoting, parameter placeholders, comment attachment,
//! default port, timestamp defaults, identifier casing, and how a logical
//! purpose maps to a physical database. Those differences live in one
//! `DialectProfile` row per dialect; the DDL synthesizer, the executor and
//! the connection registry consult the profile instead of branching per
//! dialect. Adding a third dialect means adding a profile (plus a driver
//! backend), not touching the consumers.
//!
//! Parameterized INSERT statements are generated with sea-query, as in the
//! write path; DDL keeps manual construction because its clause layout is
//! contractual.

use sea_query::{Alias, Expr, IntoIden, MysqlQueryBuilder, PostgresQueryBuilder, Query, TableRef};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::security::escape_string_literal;
use crate::types::ColumnDef;

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL
    Postgresql,
    /// MySQL / MariaDB
    Mysql,
}

/// Syntax differences between the supported engines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectProfile {
    /// Display name
    pub name: &'static str,
    /// Default server port
    pub default_port: u16,
    /// Whether `COMMENT '...'` may be attached inline in a column clause;
    /// when false, comments are emitted as trailing `COMMENT ON` statements
    pub inline_column_comments: bool,
    /// Native timestamp column type
    pub timestamp_type: &'static str,
    /// Expression used as the created-at column default
    pub timestamp_default: &'static str,
    /// Whether table/column names are lower-cased before writes
    pub lowercase_identifiers: bool,
    /// Whether all purposes share one physical database (schema-scoped via
    /// search path) rather than one database per purpose
    pub shared_database: bool,
}

const POSTGRESQL: DialectProfile = DialectProfile {
    name: "PostgreSQL",
    default_port: 5432,
    inline_column_comments: false,
    timestamp_type: "TIMESTAMP",
    timestamp_default: "CURRENT_TIMESTAMP",
    lowercase_identifiers: true,
    shared_database: true,
};

const MYSQL: DialectProfile = DialectProfile {
    name: "MySQL",
    default_port: 3306,
    inline_column_comments: true,
    timestamp_type: "DATETIME",
    timestamp_default: "now()",
    lowercase_identifiers: false,
    shared_database: false,
};

fn table_ref(schema: Option<&str>, table: &str) -> TableRef {
    match schema {
        Some(s) => TableRef::SchemaTable(Alias::new(s).into_iden(), Alias::new(table).into_iden()),
        None => TableRef::Table(Alias::new(table).into_iden()),
    }
}

impl Dialect {
    /// Resolve a dialect by name
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgresql),
            "mysql" | "mariadb" => Ok(Self::Mysql),
            other => Err(Error::unsupported_dialect(other)),
        }
    }

    /// The syntax profile for this dialect
    pub fn profile(&self) -> &'static DialectProfile {
        match self {
            Self::Postgresql => &POSTGRESQL,
            Self::Mysql => &MYSQL,
        }
    }

    /// Quote an identifier (table, column name)
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Self::Postgresql => format!("\"{}\"", name.replace('"', "\"\"")),
            Self::Mysql => format!("`{}`", name.replace('`', "``")),
        }
    }

    /// Parameter placeholder at a 1-based position
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Postgresql => format!("${}", index),
            Self::Mysql => "?".to_string(),
        }
    }

    /// Build a connection URL for one purpose-scoped connection
    ///
    /// PostgreSQL connects to the shared database and scopes the session to
    /// the purpose schema via `search_path`; MySQL connects straight to the
    /// purpose-qualified database, which doubles as its schema.
    pub fn connection_url(
        &self,
        user: &str,
        password: &str,
        host: &str,
        port: u16,
        database: &str,
        schema: &str,
    ) -> String {
        match self {
            Self::Postgresql => format!(
                "postgresql://{}:{}@{}:{}/{}?options=-c%20search_path%3D{}",
                user, password, host, port, database, schema
            ),
            Self::Mysql => format!(
                "mysql://{}:{}@{}:{}/{}",
                user, password, host, port, database
            ),
        }
    }

    /// Map a logical column type to the dialect's native type
    ///
    /// Used when a table is created from inferred frame columns; synthesized
    /// DDL keeps the metadata-supplied type verbatim.
    pub fn native_type(&self, column: &ColumnDef) -> String {
        match self {
            Self::Postgresql => match column.data_type.to_uppercase().as_str() {
                "BOOLEAN" | "BOOL" => "BOOLEAN".to_string(),
                "SMALLINT" | "INT16" => "SMALLINT".to_string(),
                "INTEGER" | "INT" | "INT32" => "INTEGER".to_string(),
                "BIGINT" | "INT64" => "BIGINT".to_string(),
                "REAL" | "FLOAT32" => "REAL".to_string(),
                "DOUBLE PRECISION" | "DOUBLE" | "FLOAT64" => "DOUBLE PRECISION".to_string(),
                "DECIMAL" | "NUMERIC" => "NUMERIC".to_string(),
                "VARCHAR" | "STRING" => match column.length {
                    Some(len) => format!("VARCHAR({})", len),
                    None => "TEXT".to_string(),
                },
                "TEXT" => "TEXT".to_string(),
                "BYTEA" | "BYTES" | "BLOB" => "BYTEA".to_string(),
                "DATE" => "DATE".to_string(),
                "TIME" => "TIME".to_string(),
                "TIMESTAMP" | "DATETIME" => "TIMESTAMP".to_string(),
                "TIMESTAMPTZ" => "TIMESTAMPTZ".to_string(),
                "UUID" => "UUID".to_string(),
                "JSON" | "JSONB" => "JSONB".to_string(),
                other => other.to_string(),
            },
            Self::Mysql => match column.data_type.to_uppercase().as_str() {
                "BOOLEAN" | "BOOL" => "TINYINT(1)".to_string(),
                "SMALLINT" | "INT16" => "SMALLINT".to_string(),
                "INTEGER" | "INT" | "INT32" => "INT".to_string(),
                "BIGINT" | "INT64" => "BIGINT".to_string(),
                "REAL" | "FLOAT32" => "FLOAT".to_string(),
                "DOUBLE PRECISION" | "DOUBLE" | "FLOAT64" => "DOUBLE".to_string(),
                "DECIMAL" | "NUMERIC" => "DECIMAL(65,30)".to_string(),
                "VARCHAR" | "STRING" => match column.length {
                    Some(len) if len <= 65_535 => format!("VARCHAR({})", len),
                    _ => "TEXT".to_string(),
                },
                "TEXT" => "TEXT".to_string(),
                "BYTEA" | "BYTES" | "BLOB" => "BLOB".to_string(),
                "DATE" => "DATE".to_string(),
                "TIME" => "TIME".to_string(),
                "TIMESTAMP" | "DATETIME" | "TIMESTAMPTZ" => "DATETIME".to_string(),
                "UUID" => "CHAR(36)".to_string(),
                "JSON" | "JSONB" => "JSON".to_string(),
                other => other.to_string(),
            },
        }
    }

    /// Generate a parameterized INSERT for the given column list
    pub fn insert_sql(&self, schema: Option<&str>, table: &str, columns: &[&str]) -> String {
        let tbl = table_ref(schema, table);
        let col_idens: Vec<_> = columns.iter().map(|c| Alias::new(*c).into_iden()).collect();

        let values: Vec<_> = match self {
            Self::Postgresql => (1..=columns.len())
                .map(|i| Expr::cust(format!("${}", i)))
                .collect(),
            Self::Mysql => columns.iter().map(|_| Expr::cust("?")).collect(),
        };

        let mut stmt = Query::insert();
        stmt.into_table(tbl).columns(col_idens).values_panic(values);

        match self {
            Self::Postgresql => stmt.to_string(PostgresQueryBuilder),
            Self::Mysql => stmt.to_string(MysqlQueryBuilder),
        }
    }

    /// SQL probing for table existence in a schema
    ///
    /// `information_schema` spells this identically on both engines; the
    /// MySQL result is 1/0 where PostgreSQL yields a boolean.
    pub fn table_exists_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT EXISTS(SELECT 1 FROM information_schema.tables WHERE table_schema = '{}' AND table_name = '{}')",
            escape_string_literal(schema),
            escape_string_literal(table)
        )
    }

    /// DROP TABLE IF EXISTS for the (optionally qualified) table
    pub fn drop_table_sql(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(s) => format!(
                "DROP TABLE IF EXISTS {}.{}",
                self.quote_identifier(s),
                self.quote_identifier(table)
            ),
            None => format!("DROP TABLE IF EXISTS {}", self.quote_identifier(table)),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.profile().name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Dialect::parse("postgres").unwrap(), Dialect::Postgresql);
        assert_eq!(Dialect::parse("PostgreSQL").unwrap(), Dialect::Postgresql);
        assert_eq!(Dialect::parse("mysql").unwrap(), Dialect::Mysql);
        assert!(matches!(
            Dialect::parse("oracle"),
            Err(Error::UnsupportedDialect { .. })
        ));
    }

    #[test]
    fn test_profiles() {
        let pg = Dialect::Postgresql.profile();
        assert_eq!(pg.default_port, 5432);
        assert!(!pg.inline_column_comments);
        assert!(pg.lowercase_identifiers);
        assert!(pg.shared_database);

        let my = Dialect::Mysql.profile();
        assert_eq!(my.default_port, 3306);
        assert!(my.inline_column_comments);
        assert!(!my.lowercase_identifiers);
        assert!(!my.shared_database);
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(Dialect::Postgresql.quote_identifier("users"), "\"users\"");
        assert_eq!(
            Dialect::Postgresql.quote_identifier("my\"table"),
            "\"my\"\"table\""
        );
        assert_eq!(Dialect::Mysql.quote_identifier("users"), "`users`");
        assert_eq!(Dialect::Mysql.quote_identifier("my`table"), "`my``table`");
    }

    #[test]
    fn test_placeholder() {
        assert_eq!(Dialect::Postgresql.placeholder(3), "$3");
        assert_eq!(Dialect::Mysql.placeholder(3), "?");
    }

    #[test]
    fn test_connection_url() {
        let url = Dialect::Postgresql.connection_url(
            "svc",
            "pw",
            "db.internal",
            5432,
            "stratum",
            "stratum_catalog",
        );
        assert!(url.starts_with("postgresql://svc:pw@db.internal:5432/stratum"));
        assert!(url.contains("search_path%3Dstratum_catalog"));

        let url =
            Dialect::Mysql.connection_url("svc", "pw", "db.internal", 3306, "stratum_primary", "");
        assert_eq!(url, "mysql://svc:pw@db.internal:3306/stratum_primary");
    }

    #[test]
    fn test_native_types() {
        let col = ColumnDef::new("flag", "BOOLEAN");
        assert_eq!(Dialect::Postgresql.native_type(&col), "BOOLEAN");
        assert_eq!(Dialect::Mysql.native_type(&col), "TINYINT(1)");

        let col = ColumnDef::new("label", "VARCHAR").with_length(50);
        assert_eq!(Dialect::Postgresql.native_type(&col), "VARCHAR(50)");
        assert_eq!(Dialect::Mysql.native_type(&col), "VARCHAR(50)");

        let col = ColumnDef::new("note", "VARCHAR");
        assert_eq!(Dialect::Postgresql.native_type(&col), "TEXT");

        let col = ColumnDef::new("seen_at", "TIMESTAMP");
        assert_eq!(Dialect::Mysql.native_type(&col), "DATETIME");
    }

    #[test]
    fn test_insert_sql_postgres() {
        let sql = Dialect::Postgresql.insert_sql(
            Some("stratum_catalog"),
            "ct_op_log",
            &["user_id", "db_id", "status"],
        );
        assert!(sql.starts_with("INSERT INTO"));
        assert!(sql.contains("\"stratum_catalog\".\"ct_op_log\""));
        assert!(sql.contains("$1"));
        assert!(sql.contains("$3"));
    }

    #[test]
    fn test_insert_sql_mysql() {
        let sql = Dialect::Mysql.insert_sql(None, "measurements", &["id", "val"]);
        assert!(sql.contains("`measurements`"));
        assert!(sql.contains("VALUES (?, ?)"));
    }

    #[test]
    fn test_table_exists_sql_escapes() {
        let sql = Dialect::Postgresql.table_exists_sql("stratum_primary", "o'brien");
        assert!(sql.contains("table_name = 'o''brien'"));
        assert!(sql.contains("information_schema.tables"));
    }

    #[test]
    fn test_drop_table_sql() {
        assert_eq!(
            Dialect::Mysql.drop_table_sql(None, "tmp"),
            "DROP TABLE IF EXISTS `tmp`"
        );
        assert_eq!(
            Dialect::Postgresql.drop_table_sql(Some("stratum_staging"), "tmp"),
            "DROP TABLE IF EXISTS \"stratum_staging\".\"tmp\""
        );
    }
}
