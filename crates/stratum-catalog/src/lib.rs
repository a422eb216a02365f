//! # stratum-catalog
//!
//! Metadata-driven catalog engine for the Stratum data-integration
//! platform: purpose-scoped database connections, audited query/write
//! execution, and dialect-aware DDL synthesis.
//!
//! ## Architecture
//!
//! - **Connection Registry**: zero-or-one live connection per logical
//!   purpose (catalog / staging / primary); re-connecting a purpose always
//!   disposes the old handle first
//! - **Audit Logger**: one immutable row per executed operation in the
//!   central `ct_op_log` table, written through the catalog purpose and
//!   never allowed to fail user work
//! - **Executor**: read queries and table writes with a "fail soft, log
//!   always" policy — execution failures surface as status/error fields on
//!   the outcome, not as raised errors
//! - **DDL Synthesizer**: turns ordered column metadata into complete
//!   `CREATE TABLE` statements with dialect-appropriate comment syntax
//! - **Catalog accessors**: thin ordered lookups over the metadata tables
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stratum_catalog::prelude::*;
//!
//! let config = EngineConfig::new(Dialect::Postgresql)
//!     .with_host("db.internal")
//!     .with_credential(Purpose::Catalog, encode_credentials("svc", "pw"));
//!
//! let executor = Executor::new(config)?;
//! let result = executor.query("SELECT * FROM ct_dataset", Purpose::Catalog).await?;
//! if !result.is_ok() {
//!     eprintln!("query failed: {:?}", result.error);
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `postgres` — PostgreSQL support via tokio-postgres
//! - `mysql` — MySQL/MariaDB support via mysql_async
//! - `full` — both backends (default)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod catalog;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod ddl;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod registry;
pub mod security;
pub mod types;

// Backend implementations (conditionally compiled)
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

/// Prelude module for convenient imports
pub mod prelude {
    // Error types
    pub use crate::error::{Error, Result};

    // Value and data model
    pub use crate::types::{
        ColumnDef, ExecStatus, Frame, Purpose, QueryResult, Row, Value,
    };

    // Configuration and credentials
    pub use crate::config::EngineConfig;
    pub use crate::credentials::{encode_credentials, Credentials};

    // Connection layer
    pub use crate::connection::{Connection, ConnectionConfig, ConnectionFactory};
    pub use crate::registry::{ConnectOptions, ConnectionRegistry};

    // Execution
    pub use crate::executor::{
        BatchOutcome, BatchReport, Executor, WriteMode, WriteOutcome,
    };

    // Audit
    pub use crate::audit::{AuditLogger, AuditRecord};

    // Dialects and DDL
    pub use crate::ddl::synthesize_create_table;
    pub use crate::dialect::{Dialect, DialectProfile};

    // Catalog accessors
    pub use crate::catalog::CatalogReader;
}

// Re-export commonly used items at crate root
pub use error::{Error, Result};
pub use types::{Purpose, Value};

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let _value = Value::Int32(42);
        let _config = EngineConfig::new(Dialect::Postgresql);
        let _mode = WriteMode::Append;
        let _status = ExecStatus::Ok;
    }

    #[test]
    fn test_crate_root_reexports() {
        let err = crate::Error::config("x");
        assert!(err.to_string().contains("configuration"));
        assert_eq!(crate::Purpose::Catalog.as_str(), "catalog");
    }
}
