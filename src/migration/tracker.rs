//! Migration tracking store
//!
//! The tracking table is the runner's only persisted state. It is accessed
//! through the narrow [`TrackingStore`] interface rather than ad-hoc queries
//! scattered through the engine, so tests can substitute an in-memory store
//! and the table's shape stays in one place.

use crate::executor::{quote_literal, WarehouseExecutor};
use crate::migration::{MigrationError, MigrationRecord};

/// Narrow read/write interface over the migration tracking state
pub trait TrackingStore {
    /// Create the tracking table if it does not exist (idempotent)
    fn ensure(&self) -> Result<(), MigrationError>;

    /// All tracking records, oldest first
    fn all(&self) -> Result<Vec<MigrationRecord>, MigrationError>;

    /// Look up the record for one migration name
    fn get(&self, name: &str) -> Result<Option<MigrationRecord>, MigrationError>;

    /// Insert or update the record for `record.name`
    ///
    /// Guarantees at most one record per name: an existing record is updated
    /// in place, never duplicated.
    fn put(&self, record: &MigrationRecord) -> Result<(), MigrationError>;

    /// Remove the record for one migration name
    fn delete(&self, name: &str) -> Result<(), MigrationError>;

    /// The most recently executed record, by `executed_at`
    fn latest(&self) -> Result<Option<MigrationRecord>, MigrationError>;
}

/// Tracking store backed by the `<schema>.schema_migrations` warehouse table
pub struct SqlTrackingStore<'a> {
    executor: &'a dyn WarehouseExecutor,
    table: String,
}

impl<'a> SqlTrackingStore<'a> {
    /// Create a store over the tracking table in the given schema
    pub fn new(executor: &'a dyn WarehouseExecutor, schema: &str) -> Self {
        Self {
            executor,
            table: format!("{schema}.schema_migrations"),
        }
    }

    fn select_columns(&self) -> String {
        format!(
            "SELECT migration_name, checksum, executed_at, executed_by, \
             execution_time_ms, success, error_message \
             FROM {}",
            self.table
        )
    }

    fn rows_to_records(
        rows: Vec<crate::executor::Row>,
    ) -> Result<Vec<MigrationRecord>, MigrationError> {
        rows.iter()
            .map(|row| MigrationRecord::from_row(row).map_err(MigrationError::InvalidRecord))
            .collect()
    }
}

impl TrackingStore for SqlTrackingStore<'_> {
    fn ensure(&self) -> Result<(), MigrationError> {
        let sql = format!(
            r#"CREATE TABLE IF NOT EXISTS {} (
    migration_name STRING NOT NULL PRIMARY KEY,
    checksum STRING NOT NULL,
    executed_at TIMESTAMP_NTZ NOT NULL DEFAULT CURRENT_TIMESTAMP(),
    executed_by STRING,
    execution_time_ms INTEGER,
    success BOOLEAN NOT NULL DEFAULT TRUE,
    error_message STRING
)
COMMENT = 'Tracks executed schema migrations to prevent re-running'"#,
            self.table
        );

        self.executor.execute(&sql)?;
        log::debug!("Ensured tracking table exists: {}", self.table);
        Ok(())
    }

    fn all(&self) -> Result<Vec<MigrationRecord>, MigrationError> {
        let sql = format!("{} ORDER BY executed_at", self.select_columns());
        let rows = self.executor.query_all(&sql)?;
        Self::rows_to_records(rows)
    }

    fn get(&self, name: &str) -> Result<Option<MigrationRecord>, MigrationError> {
        let sql = format!(
            "{} WHERE migration_name = {}",
            self.select_columns(),
            quote_literal(name)
        );
        let rows = self.executor.query_all(&sql)?;
        Ok(Self::rows_to_records(rows)?.into_iter().next())
    }

    fn put(&self, record: &MigrationRecord) -> Result<(), MigrationError> {
        let execution_time = record
            .execution_time_ms
            .map_or("NULL".to_string(), |ms| ms.to_string());
        let error_message = record
            .error_message
            .as_deref()
            .map_or("NULL".to_string(), quote_literal);

        // MERGE keeps the one-record-per-name invariant: re-application
        // updates in place rather than inserting a duplicate.
        let sql = format!(
            r#"MERGE INTO {table} AS target
USING (
    SELECT
        {name} AS migration_name,
        {checksum} AS checksum,
        {execution_time} AS execution_time_ms,
        {success} AS success,
        {error_message} AS error_message,
        CURRENT_USER() AS executed_by
) AS source
ON target.migration_name = source.migration_name
WHEN MATCHED THEN
    UPDATE SET
        checksum = source.checksum,
        executed_at = CURRENT_TIMESTAMP(),
        execution_time_ms = source.execution_time_ms,
        success = source.success,
        error_message = source.error_message,
        executed_by = source.executed_by
WHEN NOT MATCHED THEN
    INSERT (migration_name, checksum, execution_time_ms, success, error_message, executed_by)
    VALUES (source.migration_name, source.checksum, source.execution_time_ms,
            source.success, source.error_message, source.executed_by)"#,
            table = self.table,
            name = quote_literal(&record.name),
            checksum = quote_literal(&record.checksum),
            execution_time = execution_time,
            success = record.outcome.is_success(),
            error_message = error_message,
        );

        self.executor.execute(&sql)?;
        log::debug!("Recorded migration: {}", record.name);
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), MigrationError> {
        let sql = format!(
            "DELETE FROM {} WHERE migration_name = {}",
            self.table,
            quote_literal(name)
        );
        self.executor.execute(&sql)?;
        log::debug!("Deleted tracking record: {name}");
        Ok(())
    }

    fn latest(&self) -> Result<Option<MigrationRecord>, MigrationError> {
        let sql = format!(
            "{} ORDER BY executed_at DESC LIMIT 1",
            self.select_columns()
        );
        let rows = self.executor.query_all(&sql)?;
        Ok(Self::rows_to_records(rows)?.into_iter().next())
    }
}
