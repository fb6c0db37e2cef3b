//! Migration-specific error types

use crate::executor::WarehouseError;

/// Migration-specific errors
#[derive(Debug)]
pub enum MigrationError {
    /// Warehouse execution or connection error outside a migration statement
    Warehouse(WarehouseError),
    /// The migrations source (directory) cannot be read
    Source(String),
    /// A statement inside a migration file failed; the failure is recorded
    /// in the tracking table before this propagates and halts the run
    StatementFailed {
        migration: String,
        /// 1-based index of the failing statement within the file
        index: usize,
        statement: String,
        source: WarehouseError,
    },
    /// Rollback target does not exist in the tracking table
    NotFound(String),
    /// A tracking-table row could not be interpreted
    InvalidRecord(String),
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::Warehouse(e) => write!(f, "Warehouse error: {e}"),
            MigrationError::Source(msg) => write!(f, "{msg}"),
            MigrationError::StatementFailed {
                migration,
                index,
                statement,
                source,
            } => {
                write!(
                    f,
                    "Migration '{migration}' failed at statement {index}: {source}\n\
                     Statement: {statement}"
                )
            }
            MigrationError::NotFound(target) => {
                write!(
                    f,
                    "Rollback target not found: {target}. Nothing to roll back."
                )
            }
            MigrationError::InvalidRecord(msg) => {
                write!(f, "Invalid tracking record: {msg}")
            }
        }
    }
}

impl std::error::Error for MigrationError {}

impl From<WarehouseError> for MigrationError {
    fn from(error: WarehouseError) -> Self {
        MigrationError::Warehouse(error)
    }
}
