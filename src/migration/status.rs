//! Migration status tracking

use crate::migration::{MigrationFile, MigrationRecord};

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Successfully applied migrations (from the tracking table)
    pub applied: Vec<MigrationRecord>,

    /// Pending migrations (from the source), in execution order
    pub pending: Vec<PendingMigration>,
}

/// One migration requiring execution
#[derive(Debug, Clone)]
pub struct PendingMigration {
    pub file: MigrationFile,

    /// True when a successful record exists but its checksum no longer
    /// matches the file: the migration was edited after being applied and
    /// will be re-run
    pub rerun: bool,
}

impl MigrationStatus {
    #[must_use]
    pub fn new(applied: Vec<MigrationRecord>, pending: Vec<PendingMigration>) -> Self {
        Self { applied, pending }
    }

    /// Check if all migrations are applied
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Summary of an `apply_all` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Migrations executed to completion this run
    pub applied: usize,
    /// Migrations already up to date (or deferred by migrate-one mode)
    pub skipped: usize,
    /// Migrations that failed (0 or 1; the run halts at the first failure)
    pub failed: usize,
}
