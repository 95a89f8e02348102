//! Dialect error types.

use thiserror::Error;

/// Errors raised while selecting or configuring a dialect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialectError {
    /// No database family is registered under this code.
    #[error("Unknown database type: {code}")]
    UnknownDatabaseType { code: String },

    /// No access type is known under this code.
    #[error("Unknown access type: {code}")]
    UnknownAccessType { code: String },

    /// The family cannot be reached through the requested access type.
    #[error("Access type {access} is not available for {dialect}")]
    UnsupportedAccess { dialect: String, access: String },
}

impl DialectError {
    /// Create an unknown database type error.
    pub fn unknown_database_type(code: impl Into<String>) -> Self {
        Self::UnknownDatabaseType { code: code.into() }
    }

    /// Create an unknown access type error.
    pub fn unknown_access_type(code: impl Into<String>) -> Self {
        Self::UnknownAccessType { code: code.into() }
    }

    /// Create an unsupported access error.
    pub fn unsupported_access(dialect: impl Into<String>, access: impl Into<String>) -> Self {
        Self::UnsupportedAccess {
            dialect: dialect.into(),
            access: access.into(),
        }
    }
}
