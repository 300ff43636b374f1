//! Error types for the instance layer.

use schemadelta_core::DiffError;
use sqlx::mysql::MySqlDatabaseError;

/// MySQL error numbers reporting malformed SQL.
const SYNTAX_ERRORS: &[u16] = &[1064, 1149];

/// MySQL error numbers reporting missing privileges or bad credentials.
const ACCESS_ERRORS: &[u16] = &[1044, 1045, 1142, 1143, 1227, 1370];

/// Coarse classification of an [`InstanceError`], for deciding whether to
/// retry, fail fast, or report differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server rejected the SQL text.
    Syntax,
    /// Authentication or authorization failed. Retrying will not help.
    Access,
    /// Network trouble, pool exhaustion or a timeout. A retry may succeed.
    Transient,
    /// Anything else.
    Other,
}

/// Errors that can occur while talking to a database instance.
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    /// Error reported by the driver or the server.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The requested schema does not exist on the instance.
    #[error("Schema '{0}' does not exist")]
    UnknownSchema(String),

    /// A drop was requested only for empty tables and this one has rows.
    #[error("Table {schema}.{table} is not empty")]
    NonEmptyTable {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
    },

    /// A round trip did not finish within the configured timeout.
    #[error("Timed out during {operation}")]
    Timeout {
        /// What was being done.
        operation: String,
    },

    /// The connection string could not be parsed.
    #[error("Invalid DSN: {0}")]
    InvalidDsn(String),

    /// Statement generation failed.
    #[error(transparent)]
    Diff(#[from] DiffError),
}

impl InstanceError {
    /// Classifies the error by the server's error number or the driver's
    /// failure mode.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Database(err) => classify(err),
            Self::Timeout { .. } => ErrorKind::Transient,
            _ => ErrorKind::Other,
        }
    }

    /// MySQL error number, when the server reported one.
    #[must_use]
    pub fn error_number(&self) -> Option<u16> {
        match self {
            Self::Database(sqlx::Error::Database(db)) => db
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(MySqlDatabaseError::number),
            _ => None,
        }
    }
}

fn classify(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::Database(db) => {
            let Some(number) = db
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(MySqlDatabaseError::number)
            else {
                return ErrorKind::Other;
            };
            kind_for_number(number)
        }
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::WorkerCrashed => {
            ErrorKind::Transient
        }
        _ => ErrorKind::Other,
    }
}

fn kind_for_number(number: u16) -> ErrorKind {
    if SYNTAX_ERRORS.contains(&number) {
        ErrorKind::Syntax
    } else if ACCESS_ERRORS.contains(&number) {
        ErrorKind::Access
    } else {
        ErrorKind::Other
    }
}

/// Result type for instance operations.
pub type Result<T> = std::result::Result<T, InstanceError>;
