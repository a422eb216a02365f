//! SQL injection guards for metadata-driven statement construction.
//!
//! Table and column names in this engine come from catalog metadata rows,
//! not from a fixed schema, so every identifier and type name that reaches
//! a DDL or DML string passes through these checks. Values never do: they
//! are always bound as parameters.

use crate::error::{Error, Result};

/// Validate a SQL identifier (table, column, schema names).
///
/// - Must not be empty
/// - Maximum 255 characters
/// - Must start with ASCII letter or underscore
/// - May only contain ASCII alphanumeric characters and underscores
pub fn validate_sql_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_metadata("SQL identifier cannot be empty"));
    }

    if name.len() > 255 {
        return Err(Error::invalid_metadata(format!(
            "SQL identifier too long: {} chars (max 255)",
            name.len()
        )));
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => {
            return Err(Error::invalid_metadata(format!(
                "invalid SQL identifier '{}': must start with a letter or underscore",
                name
            )));
        }
    }

    for c in chars {
        if !c.is_ascii_alphanumeric() && c != '_' {
            return Err(Error::invalid_metadata(format!(
                "invalid SQL identifier '{}': contains invalid character '{}'",
                name, c
            )));
        }
    }

    Ok(())
}

/// Validate a SQL type name before interpolating it into DDL.
///
/// Allows the characters that appear in legitimate type specifications
/// (`VARCHAR(255)`, `DECIMAL(10,2)`, `DOUBLE PRECISION`) and rejects
/// statement terminators, comments and other metacharacters.
pub fn validate_sql_type_name(type_name: &str) -> Result<()> {
    if type_name.is_empty() {
        return Err(Error::invalid_metadata("SQL type name cannot be empty"));
    }

    if type_name.len() > 255 {
        return Err(Error::invalid_metadata(format!(
            "SQL type name too long: {} chars (max 255)",
            type_name.len()
        )));
    }

    for c in type_name.chars() {
        if !(c.is_ascii_alphanumeric() || matches!(c, '_' | '(' | ')' | ',' | ' ')) {
            return Err(Error::invalid_metadata(format!(
                "invalid SQL type name '{}': contains invalid character '{}'",
                type_name, c
            )));
        }
    }

    Ok(())
}

/// Escape a string value for a single-quoted SQL literal context.
///
/// Used for comment text in generated DDL and for the statement snapshot
/// stored in audit records. Data values are bound as parameters instead.
pub fn escape_string_literal(value: &str) -> String {
    if !value.contains('\'') {
        return value.to_string();
    }
    value.replace('\'', "''")
}
