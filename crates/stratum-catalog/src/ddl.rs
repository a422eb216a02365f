//! Metadata-driven DDL synthesis
//!
//! Turns an ordered [`ColumnDef`] list into a complete, terminated
//! `CREATE TABLE IF NOT EXISTS` statement for the target dialect, plus the
//! dialect's comment attachment: inline `COMMENT` clauses and one
//! `ALTER TABLE ... COMMENT` for MySQL, a trailing `COMMENT ON` block for
//! PostgreSQL. One generic algorithm consults the [`DialectProfile`] for
//! every branch point; no per-dialect code path exists.
//!
//! Identifiers and type names come from catalog metadata rows and are
//! validated before interpolation; free-text comments are escaped.

use crate::audit::AUDIT_COLUMNS;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::security::{escape_string_literal, validate_sql_identifier, validate_sql_type_name};
use crate::types::ColumnDef;

/// Comments attached to the audit metadata columns
const AUDIT_COLUMN_COMMENTS: [&str; 4] = ["created at", "created by", "modified at", "modified by"];

/// Synthesize a `CREATE TABLE` statement (plus comment attachments)
///
/// Column order in the generated DDL matches the input order exactly. The
/// primary-key constraint is emitted only when at least one column carries
/// the primary-key flag, listing those columns in input order. With
/// `add_audit_columns`, the four audit metadata columns are appended before
/// the constraint.
pub fn synthesize_create_table(
    table_id: &str,
    table_label: &str,
    columns: &[ColumnDef],
    dialect: Dialect,
    schema: &str,
    add_audit_columns: bool,
) -> Result<String> {
    if columns.is_empty() {
        return Err(Error::invalid_metadata(format!(
            "no column metadata for table '{}'",
            table_id
        )));
    }

    validate_sql_identifier(table_id)?;
    validate_sql_identifier(schema)?;
    for column in columns {
        validate_sql_identifier(&column.name)?;
        validate_sql_type_name(&column.data_type)?;
    }

    let profile = dialect.profile();
    let qualified = format!("{}.{}", schema, table_id);

    let mut clauses: Vec<String> = columns
        .iter()
        .map(|column| {
            let mut clause = format!("{} {}", column.name, column.data_type);
            if let Some(length) = column.length {
                if length > 0 {
                    clause.push_str(&format!("({})", length));
                }
            }
            if !column.nullable {
                clause.push_str(" NOT NULL");
            }
            if profile.inline_column_comments {
                if let Some(comment) = &column.comment {
                    clause.push_str(&format!(" COMMENT '{}'", escape_string_literal(comment)));
                }
            }
            clause
        })
        .collect();

    if add_audit_columns {
        clauses.extend(audit_column_clauses(dialect));
    }

    let pk_columns: Vec<&str> = columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.as_str())
        .collect();
    if !pk_columns.is_empty() {
        clauses.push(format!(
            "CONSTRAINT {}_pkey PRIMARY KEY ({})",
            table_id,
            pk_columns.join(", ")
        ));
    }

    let mut ddl = format!(
        "CREATE TABLE IF NOT EXISTS {} ( {} );",
        qualified,
        clauses.join(", ")
    );

    if profile.inline_column_comments {
        ddl.push_str(&format!(
            " ALTER TABLE {} COMMENT = '{}';",
            qualified,
            escape_string_literal(table_label)
        ));
    } else {
        ddl.push_str(&format!(
            "\n\nCOMMENT ON TABLE {} IS '{}';",
            qualified,
            escape_string_literal(table_label)
        ));
        for column in columns {
            if let Some(comment) = &column.comment {
                ddl.push_str(&format!(
                    "\nCOMMENT ON COLUMN {}.{} IS '{}';",
                    qualified,
                    column.name,
                    escape_string_literal(comment)
                ));
            }
        }
        if add_audit_columns {
            for (name, comment) in AUDIT_COLUMNS.iter().zip(AUDIT_COLUMN_COMMENTS) {
                ddl.push_str(&format!(
                    "\nCOMMENT ON COLUMN {}.{} IS '{}';",
                    qualified, name, comment
                ));
            }
        }
    }

    Ok(ddl)
}

/// Clauses for the four audit metadata columns
fn audit_column_clauses(dialect: Dialect) -> Vec<String> {
    let profile = dialect.profile();
    let comment = |text: &str| -> String {
        if profile.inline_column_comments {
            format!(" COMMENT '{}'", text)
        } else {
            String::new()
        }
    };

    vec![
        format!(
            "cret_dt {} DEFAULT {} NOT NULL{}",
            profile.timestamp_type,
            profile.timestamp_default,
            comment(AUDIT_COLUMN_COMMENTS[0])
        ),
        format!("cret_nm VARCHAR(20) NOT NULL{}", comment(AUDIT_COLUMN_COMMENTS[1])),
        format!(
            "mdfy_dt {}{}",
            profile.timestamp_type,
            comment(AUDIT_COLUMN_COMMENTS[2])
        ),
        format!("mdfy_nm VARCHAR(20){}", comment(AUDIT_COLUMN_COMMENTS[3])),
    ]
}
