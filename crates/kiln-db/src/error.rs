//! Error types for sessions and drivers.

use thiserror::Error;

/// Update count reported for a batch entry that failed.
pub const EXECUTE_FAILED: i64 = -3;

/// Errors raised by a physical driver. They never leave a session
/// unwrapped: the session attaches SQL text and dialect identity and turns
/// them into a [`DatabaseError`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// The database rejected a statement.
    #[error("{message}")]
    Sql { message: String },

    /// A batch stopped part way. `update_counts` holds one entry per
    /// statement that ran, [`EXECUTE_FAILED`] for failures.
    #[error("{message}")]
    Batch {
        message: String,
        update_counts: Vec<i64>,
    },

    /// The driver does not implement this operation.
    #[error("Not supported by driver: {feature}")]
    Unsupported { feature: String },

    /// The running statement was cancelled from another thread.
    #[error("Statement was cancelled")]
    Cancelled,

    /// The statement or connection has been closed.
    #[error("Statement or connection is closed")]
    Closed,
}

impl DriverError {
    pub fn sql(message: impl Into<String>) -> Self {
        Self::Sql {
            message: message.into(),
        }
    }

    pub fn batch(message: impl Into<String>, update_counts: Vec<i64>) -> Self {
        Self::Batch {
            message: message.into(),
            update_counts,
        }
    }

    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }
}

/// Errors that can occur during session operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The driver could not be loaded or the connection could not be opened.
    /// Fatal to the session.
    #[error("Error connecting to '{connection}' using driver '{driver}': {message}")]
    Connection {
        connection: String,
        driver: String,
        message: String,
    },

    /// A statement could not be prepared. The session stays usable.
    #[error("Couldn't prepare statement on {dialect}: {message}\n{sql}")]
    StatementPreparation {
        dialect: String,
        sql: String,
        message: String,
    },

    /// A statement failed while executing.
    #[error("Couldn't execute SQL on {dialect}: {message}\n{sql}")]
    Execution {
        dialect: String,
        sql: String,
        message: String,
    },

    /// A batch failed part way. `success_count` rows of the batch were
    /// applied before the failure.
    #[error("Error updating batch on {dialect} ({success_count} rows succeeded): {message}\n{sql}")]
    BatchPartialFailure {
        dialect: String,
        sql: String,
        message: String,
        update_counts: Vec<i64>,
        success_count: usize,
    },

    /// An insert relying on a generated key returned none.
    #[error("Unable to retrieve value of auto-generated technical key for '{table}' on {dialect}")]
    KeyRetrieval { dialect: String, table: String },

    /// The dialect or driver does not support the requested feature.
    #[error("Feature not supported by {dialect}: {feature}")]
    UnsupportedFeature { dialect: String, feature: String },

    /// Invalid connection settings.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// An operation needed an open connection.
    #[error("Connection '{connection}' is not open")]
    NotConnected { connection: String },

    /// Generic session error.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl DatabaseError {
    pub fn connection(
        connection: impl Into<String>,
        driver: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Connection {
            connection: connection.into(),
            driver: driver.into(),
            message: message.into(),
        }
    }

    pub fn preparation(
        dialect: impl Into<String>,
        sql: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::StatementPreparation {
            dialect: dialect.into(),
            sql: sql.into(),
            message: message.into(),
        }
    }

    pub fn execution(
        dialect: impl Into<String>,
        sql: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Execution {
            dialect: dialect.into(),
            sql: sql.into(),
            message: message.into(),
        }
    }

    /// Wrap a driver failure raised while executing `sql`. Batch failures
    /// keep their per-row outcome.
    pub fn from_driver(dialect: impl Into<String>, sql: impl Into<String>, err: DriverError) -> Self {
        match err {
            DriverError::Batch {
                message,
                update_counts,
            } => {
                let success_count = update_counts
                    .iter()
                    .filter(|count| **count != EXECUTE_FAILED)
                    .count();
                Self::BatchPartialFailure {
                    dialect: dialect.into(),
                    sql: sql.into(),
                    message,
                    update_counts,
                    success_count,
                }
            }
            DriverError::Unsupported { feature } => Self::UnsupportedFeature {
                dialect: dialect.into(),
                feature,
            },
            other => Self::execution(dialect, sql, other.to_string()),
        }
    }

    /// Wrap a driver failure raised while preparing `sql`. A driver that
    /// lacks the statement kind reports an unsupported feature.
    pub fn from_preparation(dialect: impl Into<String>, sql: impl Into<String>, err: DriverError) -> Self {
        match err {
            DriverError::Unsupported { feature } => Self::UnsupportedFeature {
                dialect: dialect.into(),
                feature,
            },
            other => Self::preparation(dialect, sql, other.to_string()),
        }
    }

    pub fn key_retrieval(dialect: impl Into<String>, table: impl Into<String>) -> Self {
        Self::KeyRetrieval {
            dialect: dialect.into(),
            table: table.into(),
        }
    }

    pub fn unsupported(dialect: impl Into<String>, feature: impl Into<String>) -> Self {
        Self::UnsupportedFeature {
            dialect: dialect.into(),
            feature: feature.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn not_connected(connection: impl Into<String>) -> Self {
        Self::NotConnected {
            connection: connection.into(),
        }
    }

    /// Number of rows applied before a batch failed, if this is a batch failure.
    pub fn success_count(&self) -> Option<usize> {
        match self {
            Self::BatchPartialFailure { success_count, .. } => Some(*success_count),
            _ => None,
        }
    }
}
