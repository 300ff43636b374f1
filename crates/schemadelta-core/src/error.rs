//! Error types for the diff engine.

use std::fmt;

/// Errors returned when turning a computed diff into executable SQL.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// The statement was generated, but the active modifiers do not allow it.
    ///
    /// The rendered statement is kept so callers can show what would have run.
    #[error("statement for table `{table}` is forbidden: {reason}")]
    Forbidden {
        /// Table the statement applies to.
        table: String,
        /// Why the modifiers rejected it.
        reason: String,
        /// Full statement text.
        statement: String,
    },

    /// An operation the engine recognizes but cannot express as DDL.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl DiffError {
    /// Returns the statement attached to a forbidden diff, if any.
    #[must_use]
    pub fn statement(&self) -> Option<&str> {
        match self {
            Self::Forbidden { statement, .. } => Some(statement),
            Self::UnsupportedOperation(_) => None,
        }
    }

    /// Returns `true` for policy rejections (as opposed to unsupported operations).
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }
}

/// Why a pair of tables could not be diffed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum UnsupportedReason {
    /// One side uses DDL features the renderer does not model.
    UnsupportedDdl,
    /// The partition list changed in a way ADD/DROP PARTITION cannot express.
    PartitionChange,
    /// Column repositioning failed to reach the target order.
    ReorderDidNotConverge,
    /// The CREATE statements differ but no clause explains the difference.
    UnhandledDifference,
}

impl fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UnsupportedDdl => "table uses DDL features that cannot be diffed",
            Self::PartitionChange => "partition list change cannot be expressed",
            Self::ReorderDidNotConverge => "column reordering did not converge",
            Self::UnhandledDifference => "tables differ in an unhandled way",
        };
        f.write_str(text)
    }
}

/// Signals that two tables differ in a way this engine cannot express.
///
/// This is an expected outcome, not a bug: callers usually skip the table and
/// tell the user that manual intervention is needed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("table `{table}`: {reason}")]
pub struct UnsupportedDiff {
    /// Table name.
    pub table: String,
    /// Why the diff is unsupported.
    pub reason: UnsupportedReason,
}

impl UnsupportedDiff {
    pub(crate) fn new(table: &str, reason: UnsupportedReason) -> Self {
        Self {
            table: table.to_string(),
            reason,
        }
    }
}

/// Failed to parse a flavor string such as `mysql:8.0`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid flavor string: {0:?}")]
pub struct ParseFlavorError(pub String);

/// Result type for statement generation.
pub type Result<T> = std::result::Result<T, DiffError>;
