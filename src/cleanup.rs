//! Schema cleanup
//!
//! Drops every view and table currently in a schema, queried live from the
//! warehouse metadata rather than from migration tracking records. This is a
//! full wipe, independent of the migration history - the CLI gates it behind
//! an interactive confirmation.

use crate::executor::WarehouseExecutor;
use crate::migration::MigrationError;

/// What a cleanup did (or, in dry-run, would do)
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    /// Views found in the schema, in drop order
    pub views: Vec<String>,
    /// Tables found in the schema, in drop order
    pub tables: Vec<String>,
    /// Number of drop statements that failed (logged, not fatal)
    pub drop_errors: usize,
    /// False for dry-run
    pub executed: bool,
}

/// Drop all objects in the schema: views first (they may depend on tables),
/// then tables.
///
/// Per-object drop failures are logged and skipped. In dry-run mode the
/// object lists are returned without dropping anything.
///
/// # Errors
///
/// Returns `MigrationError::Warehouse` if the schema's objects cannot be
/// listed.
pub fn cleanup_schema(
    executor: &dyn WarehouseExecutor,
    schema: &str,
    dry_run: bool,
) -> Result<CleanupReport, MigrationError> {
    // SHOW output puts the object name at column index 1
    let object_names = |sql: &str| -> Result<Vec<String>, MigrationError> {
        let rows = executor.query_all(sql)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.get(1).cloned().flatten())
            .collect())
    };

    let views = object_names(&format!("SHOW VIEWS IN SCHEMA {schema}"))?;
    let tables = object_names(&format!("SHOW TABLES IN SCHEMA {schema}"))?;

    log::info!(
        "Found {} views and {} tables in schema {schema}",
        views.len(),
        tables.len()
    );

    if dry_run {
        for view in &views {
            log::info!("DRY RUN: would drop view {schema}.{view}");
        }
        for table in &tables {
            log::info!("DRY RUN: would drop table {schema}.{table}");
        }
        return Ok(CleanupReport {
            views,
            tables,
            drop_errors: 0,
            executed: false,
        });
    }

    let mut drop_errors = 0;

    for view in &views {
        match executor.execute(&format!("DROP VIEW IF EXISTS {schema}.{view}")) {
            Ok(_) => log::info!("Dropped view {schema}.{view}"),
            Err(e) => {
                log::warn!("Failed to drop view {schema}.{view}: {e}");
                drop_errors += 1;
            }
        }
    }

    for table in &tables {
        match executor.execute(&format!("DROP TABLE IF EXISTS {schema}.{table}")) {
            Ok(_) => log::info!("Dropped table {schema}.{table}"),
            Err(e) => {
                log::warn!("Failed to drop table {schema}.{table}: {e}");
                drop_errors += 1;
            }
        }
    }

    Ok(CleanupReport {
        views,
        tables,
        drop_errors,
        executed: true,
    })
}
