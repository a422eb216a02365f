//! Error types for stratum-catalog
//!
//! Propagation policy:
//! - Configuration, dialect and metadata errors raise immediately
//! - Execution failures on query/write paths are captured into the
//!   operation outcome (status "0" + error text), not raised
//! - Audit-write failures are swallowed by the logger

use thiserror::Error;

/// Result type for stratum-catalog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for stratum-catalog
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed configuration (credentials, purpose keys)
    #[error("configuration error: {message}")]
    Configuration {
        /// Human-readable description
        message: String,
    },

    /// Driver-level connection failure
    #[error("connection error: {message}")]
    Connection {
        /// Human-readable description
        message: String,
        /// Underlying driver error, when available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Dialect name not recognised by any profile
    #[error("unsupported dialect: {name}")]
    UnsupportedDialect {
        /// The dialect name that failed to resolve
        name: String,
    },

    /// Empty or contradictory column/table metadata
    #[error("invalid metadata: {message}")]
    InvalidMetadata {
        /// Human-readable description
        message: String,
    },

    /// Statement execution failure (captured on query/write paths)
    #[error("execution error: {message}")]
    Execution {
        /// Human-readable description
        message: String,
        /// The statement that failed, when available
        sql: Option<String>,
    },

    /// Audit log insert failure (always swallowed by the logger)
    #[error("audit write error: {message}")]
    AuditWrite {
        /// Human-readable description
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an unsupported-dialect error
    pub fn unsupported_dialect(name: impl Into<String>) -> Self {
        Self::UnsupportedDialect { name: name.into() }
    }

    /// Create an invalid-metadata error
    pub fn invalid_metadata(message: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            message: message.into(),
        }
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            sql: None,
        }
    }

    /// Create an execution error carrying the failed statement
    pub fn execution_with_sql(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            sql: Some(sql.into()),
        }
    }

    /// Create an audit-write error
    pub fn audit_write(message: impl Into<String>) -> Self {
        Self::AuditWrite {
            message: message.into(),
        }
    }

    /// Whether this error is captured softly on query/write paths
    /// rather than raised to the caller
    pub fn is_captured(&self) -> bool {
        matches!(self, Self::Execution { .. } | Self::AuditWrite { .. })
    }
}
