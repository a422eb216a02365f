//! Thin read accessors over the catalog metadata tables
//!
//! The catalog schema holds the definitional rows driving the engine:
//! API endpoint templates, their parameters, result-column definitions and
//! registered datasets. These accessors are ordered lookups over those
//! tables; the interesting consumer is [`CatalogReader::ddl_for_dataset`],
//! which turns a dataset's result-column rows into synthesized DDL.

use crate::ddl::synthesize_create_table;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::types::{ColumnDef, Purpose, QueryResult, Row, Value};

/// Catalog metadata table names
pub mod tables {
    /// Registered datasets
    pub const DATASET: &str = "ct_dataset";
    /// API endpoint URL templates
    pub const API_ENDPOINT: &str = "ct_api_endpoint";
    /// API request parameters
    pub const API_PARAM: &str = "ct_api_param";
    /// Enumerated parameter value sets
    pub const API_PARAMSET: &str = "ct_api_paramset";
    /// Result column definitions
    pub const RESULT_COLUMN: &str = "ct_result_column";
}

/// Read-only view over the catalog metadata tables
pub struct CatalogReader<'a> {
    exec: &'a Executor,
}

impl Executor {
    /// Catalog metadata accessors bound to this executor
    pub fn catalog(&self) -> CatalogReader<'_> {
        CatalogReader { exec: self }
    }
}

impl CatalogReader<'_> {
    /// Endpoint rows, optionally filtered by endpoint id
    pub async fn api_endpoints(&self, endpoint_id: Option<&str>) -> Result<QueryResult> {
        let sql = match endpoint_id {
            Some(_) => format!(
                "SELECT * FROM {} WHERE endpoint_id = {}",
                tables::API_ENDPOINT,
                self.placeholder(1)
            ),
            None => format!("SELECT * FROM {}", tables::API_ENDPOINT),
        };
        self.fetch(&sql, endpoint_id).await
    }

    /// Parameter rows ordered by sequence, optionally per endpoint
    pub async fn api_params(&self, endpoint_id: Option<&str>) -> Result<QueryResult> {
        let sql = match endpoint_id {
            Some(_) => format!(
                "SELECT * FROM {} WHERE endpoint_id = {} ORDER BY param_seq",
                tables::API_PARAM,
                self.placeholder(1)
            ),
            None => format!(
                "SELECT * FROM {} ORDER BY endpoint_id, param_seq",
                tables::API_PARAM
            ),
        };
        self.fetch(&sql, endpoint_id).await
    }

    /// Enumerated parameter value sets
    ///
    /// `param_seq` may only be given together with `endpoint_id`.
    pub async fn param_sets(
        &self,
        endpoint_id: Option<&str>,
        param_seq: Option<i32>,
    ) -> Result<QueryResult> {
        match (endpoint_id, param_seq) {
            (Some(endpoint), Some(seq)) => {
                let sql = format!(
                    "SELECT * FROM {} WHERE endpoint_id = {} AND param_seq = {} ORDER BY value_seq",
                    tables::API_PARAMSET,
                    self.placeholder(1),
                    self.placeholder(2)
                );
                self.exec
                    .registry()
                    .ensure(Purpose::Catalog)
                    .await?;
                self.run(&sql, vec![Value::from(endpoint), Value::Int32(seq)])
                    .await
            }
            (Some(_), None) => {
                let sql = format!(
                    "SELECT * FROM {} WHERE endpoint_id = {} ORDER BY value_seq",
                    tables::API_PARAMSET,
                    self.placeholder(1)
                );
                self.fetch(&sql, endpoint_id).await
            }
            (None, Some(_)) => Err(Error::config(
                "param_seq requires endpoint_id to be provided",
            )),
            (None, None) => {
                let sql = format!(
                    "SELECT * FROM {} ORDER BY endpoint_id, param_seq, value_seq",
                    tables::API_PARAMSET
                );
                self.fetch(&sql, None).await
            }
        }
    }

    /// Dataset rows, optionally filtered by dataset id
    pub async fn datasets(&self, dataset_id: Option<&str>) -> Result<QueryResult> {
        let sql = match dataset_id {
            Some(_) => format!(
                "SELECT * FROM {} WHERE dataset_id = {}",
                tables::DATASET,
                self.placeholder(1)
            ),
            None => format!("SELECT * FROM {}", tables::DATASET),
        };
        self.fetch(&sql, dataset_id).await
    }

    /// Result-column definitions for an endpoint, as ordered [`ColumnDef`]s
    pub async fn result_columns(&self, endpoint_id: &str) -> Result<Vec<ColumnDef>> {
        let sql = format!(
            "SELECT * FROM {} WHERE endpoint_id = {} ORDER BY result_seq",
            tables::RESULT_COLUMN,
            self.placeholder(1)
        );
        let result = self.fetch(&sql, Some(endpoint_id)).await?;
        if !result.is_ok() {
            return Err(Error::execution(
                result
                    .error
                    .unwrap_or_else(|| "result column lookup failed".into()),
            ));
        }

        Ok(result
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| column_from_row(row, idx as u32 + 1))
            .collect())
    }

    /// Synthesize the DDL for a registered dataset's raw table
    pub async fn ddl_for_dataset(
        &self,
        dataset_id: &str,
        target: Purpose,
        add_audit_columns: bool,
    ) -> Result<String> {
        let datasets = self.datasets(Some(dataset_id)).await?;
        let row = datasets.rows.first().ok_or_else(|| {
            Error::invalid_metadata(format!("dataset '{}' is not registered", dataset_id))
        })?;

        let table_id = text_field(row, "raw_table_id").to_lowercase();
        let label = text_field(row, "dataset_nm");
        let endpoint_id = text_field(row, "endpoint_id");

        let columns = self.result_columns(&endpoint_id).await?;

        let config = self.exec.config();
        synthesize_create_table(
            &table_id,
            &label,
            &columns,
            config.dialect,
            &config.schema_name(target),
            add_audit_columns,
        )
    }

    fn placeholder(&self, index: usize) -> String {
        self.exec.config().dialect.placeholder(index)
    }

    async fn fetch(&self, sql: &str, param: Option<&str>) -> Result<QueryResult> {
        self.exec.registry().ensure(Purpose::Catalog).await?;
        let params = param.map(|p| vec![Value::from(p)]).unwrap_or_default();
        self.run(sql, params).await
    }

    /// Run a parameterized catalog lookup without audit noise
    ///
    /// Definitional reads happen on nearly every engine call; logging each
    /// of them would drown the audit table in lookups of itself.
    async fn run(&self, sql: &str, params: Vec<Value>) -> Result<QueryResult> {
        let conn = self.exec.registry().handle(Purpose::Catalog).await?;
        let timer = std::time::Instant::now();
        match conn.query(sql, &params).await {
            Ok(rows) => Ok(QueryResult::from_rows(rows, timer.elapsed())),
            Err(e) => Ok(QueryResult::failed(e.to_string(), timer.elapsed())),
        }
    }
}

/// Map one result-column metadata row to a [`ColumnDef`]
fn column_from_row(row: &Row, ordinal: u32) -> ColumnDef {
    let mut column = ColumnDef::new(
        text_field(row, "result_id").to_lowercase(),
        text_field(row, "data_type"),
    )
    .at(ordinal);

    if let Some(length) = row.get_by_name("data_len").and_then(Value::as_i64) {
        if length > 0 {
            column = column.with_length(length as u32);
        }
    }

    let comment = text_field(row, "result_nm");
    if !comment.is_empty() {
        column = column.with_comment(comment);
    }

    if !flag(row, "is_missing") {
        column = column.not_null();
    }
    if flag(row, "is_pk") {
        column = column.primary_key();
    }

    column
}

fn text_field(row: &Row, name: &str) -> String {
    row.get_by_name(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Y/N metadata flag
fn flag(row: &Row, name: &str) -> bool {
    row.get_by_name(name)
        .and_then(Value::as_str)
        .map(|v| v.eq_ignore_ascii_case("y"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_row(
        result_id: &str,
        data_type: &str,
        data_len: i64,
        is_missing: &str,
        is_pk: &str,
        result_nm: &str,
    ) -> Row {
        Row::new(
            vec![
                "result_id".into(),
                "data_type".into(),
                "data_len".into(),
                "is_missing".into(),
                "is_pk".into(),
                "result_nm".into(),
            ],
            vec![
                Value::from(result_id),
                Value::from(data_type),
                Value::Int64(data_len),
                Value::from(is_missing),
                Value::from(is_pk),
                Value::from(result_nm),
            ],
        )
    }

    #[test]
    fn test_column_from_row() {
        let row = result_row("REGION_CD", "VARCHAR", 10, "N", "Y", "region code");
        let column = column_from_row(&row, 1);

        assert_eq!(column.name, "region_cd");
        assert_eq!(column.data_type, "VARCHAR");
        assert_eq!(column.length, Some(10));
        assert!(!column.nullable);
        assert!(column.primary_key);
        assert_eq!(column.comment.as_deref(), Some("region code"));
        assert_eq!(column.ordinal, 1);
    }

    #[test]
    fn test_column_from_row_nullable_no_length() {
        let row = result_row("note", "TEXT", 0, "Y", "N", "");
        let column = column_from_row(&row, 3);

        assert!(column.nullable);
        assert!(!column.primary_key);
        assert_eq!(column.length, None);
        assert_eq!(column.comment, None);
        assert_eq!(column.ordinal, 3);
    }
}
