//! Migrator - Core migration execution engine

use crate::config::DEFAULT_SCHEMA;
use crate::extract::{extract_objects, ExtractedObject, ObjectKind};
use crate::executor::WarehouseExecutor;
use crate::migration::file::{parse_filename, DirectorySource, MigrationFile, MigrationSource};
use crate::migration::split::split_statements;
use crate::migration::status::{ApplySummary, MigrationStatus, PendingMigration};
use crate::migration::tracker::TrackingStore;
use crate::migration::{MigrationError, MigrationOutcome, MigrationRecord};
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

/// Rollback target selector
#[derive(Debug, Clone, Copy)]
pub enum RollbackTarget<'a> {
    /// The most recently executed migration, by `executed_at`
    Latest,
    /// A specific migration by filename
    Named(&'a str),
}

/// What a rollback did (or, in dry-run, would do)
#[derive(Debug, Clone)]
pub struct RollbackPlan {
    /// Name of the migration rolled back
    pub migration: String,
    /// Objects in drop order: views in reverse creation order first, then
    /// tables in reverse creation order
    pub drops: Vec<ExtractedObject>,
    /// Number of drop statements that failed (logged, not fatal)
    pub drop_errors: usize,
    /// False for dry-run: nothing was executed or deleted
    pub executed: bool,
}

/// Core migration execution engine
///
/// The `Migrator` orchestrates discovery, pending-set computation, execution
/// with checksum tracking, and rollback. The warehouse and the tracking
/// state are passed into each operation, never owned, so one engine serves
/// live runs, dry runs, and tests alike.
///
/// Concurrent runs against the same schema are NOT protected against; the
/// runner takes no distributed lock. Serializing runs is the caller's
/// responsibility.
pub struct Migrator {
    source: Box<dyn MigrationSource>,
    schema: String,
}

impl Migrator {
    /// Create a Migrator scanning the given directory for `*.sql` files
    pub fn new(migrations_dir: impl AsRef<Path>, schema: impl Into<String>) -> Self {
        Self {
            source: Box::new(DirectorySource::new(migrations_dir)),
            schema: schema.into(),
        }
    }

    /// Create a Migrator over an arbitrary migration source
    pub fn with_source(source: Box<dyn MigrationSource>, schema: impl Into<String>) -> Self {
        Self {
            source,
            schema: schema.into(),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Load, filter, rewrite, and sort the migration files
    ///
    /// Files matching neither naming pattern are skipped with a warning
    /// (non-fatal). The returned list is in execution order.
    pub fn load_files(&self) -> Result<Vec<MigrationFile>, MigrationError> {
        let mut files = Vec::new();

        for (name, content) in self.source.load()? {
            let Some((prefix, description)) = parse_filename(&name) else {
                log::warn!("Migration file doesn't match naming pattern: {name}");
                continue;
            };

            let sql = self.rewrite_schema(&content);
            files.push(MigrationFile::new(name, prefix, description, sql));
        }

        files.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(files)
    }

    /// Compute migration status: applied records vs the pending set
    ///
    /// Ensures the tracking table exists, then compares discovered files
    /// against tracking records. A file is pending when it has no successful
    /// record, or when its successful record's checksum no longer matches
    /// the file (tagged as a re-run and logged).
    pub fn status(&self, store: &dyn TrackingStore) -> Result<MigrationStatus, MigrationError> {
        store.ensure()?;
        let records = store.all()?;
        Ok(self.compute_status(self.load_files()?, records))
    }

    fn compute_status(
        &self,
        files: Vec<MigrationFile>,
        records: Vec<MigrationRecord>,
    ) -> MigrationStatus {
        // Failed records don't count as applied: the file shows up as
        // pending again on the next run.
        let applied: Vec<MigrationRecord> = records
            .into_iter()
            .filter(|r| r.outcome.is_success())
            .collect();
        let by_name: HashMap<&str, &MigrationRecord> =
            applied.iter().map(|r| (r.name.as_str(), r)).collect();

        let mut pending = Vec::new();
        for file in files {
            match by_name.get(file.name.as_str()) {
                None => pending.push(PendingMigration { file, rerun: false }),
                Some(record) if record.checksum != file.checksum => {
                    log::warn!(
                        "Migration {} was modified (checksum changed). Re-running...",
                        file.name
                    );
                    pending.push(PendingMigration { file, rerun: true });
                }
                Some(_) => {
                    log::debug!("Skipping {} (already executed)", file.name);
                }
            }
        }

        MigrationStatus::new(applied, pending)
    }

    /// Apply one migration file
    ///
    /// Splits the file into statements and executes them in order. In
    /// dry-run mode the statement list is returned without executing or
    /// recording anything. Otherwise the outcome is recorded exactly once:
    /// `success` after the last statement, or `failed` with the warehouse's
    /// message at the first failing statement, which also halts the run.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::StatementFailed` on the first failing
    /// statement (after recording the failure).
    pub fn apply(
        &self,
        executor: &dyn WarehouseExecutor,
        store: &dyn TrackingStore,
        file: &MigrationFile,
        dry_run: bool,
    ) -> Result<Vec<String>, MigrationError> {
        let statements: Vec<String> = split_statements(&file.sql)
            .into_iter()
            .filter(|s| !is_comment_only(s))
            .collect();

        if dry_run {
            log::info!(
                "DRY RUN: would execute {} ({} statements)",
                file.name,
                statements.len()
            );
            return Ok(statements);
        }

        log::info!("Executing migration: {}", file.name);
        let start = Instant::now();
        let total = statements.len();

        for (i, statement) in statements.iter().enumerate() {
            log::info!("  {} (statement {}/{})", file.name, i + 1, total);

            if let Err(e) = executor.execute(statement) {
                let elapsed = start.elapsed().as_millis() as i64;
                log::error!("Migration failed: {} - {}", file.name, e);

                let record = MigrationRecord {
                    name: file.name.clone(),
                    checksum: file.checksum.clone(),
                    executed_at: Utc::now(),
                    executed_by: None,
                    execution_time_ms: Some(elapsed),
                    outcome: MigrationOutcome::Failed,
                    error_message: Some(e.to_string()),
                };
                if let Err(record_err) = store.put(&record) {
                    log::error!("Failed to record migration failure: {record_err}");
                }

                return Err(MigrationError::StatementFailed {
                    migration: file.name.clone(),
                    index: i + 1,
                    statement: statement.clone(),
                    source: e,
                });
            }
        }

        let elapsed = start.elapsed().as_millis() as i64;
        let record = MigrationRecord {
            name: file.name.clone(),
            checksum: file.checksum.clone(),
            executed_at: Utc::now(),
            executed_by: None,
            execution_time_ms: Some(elapsed),
            outcome: MigrationOutcome::Success,
            error_message: None,
        };
        store.put(&record)?;

        log::info!("Completed migration: {}", file.name);
        Ok(statements)
    }

    /// Apply every pending migration in order
    ///
    /// Bootstraps the target schema and tracking table (skipped in dry-run),
    /// then applies the pending set - all of it, or only the first entry in
    /// migrate-one mode. Halts at the first failing migration; that failure
    /// lands in the summary, while infrastructure errors propagate.
    ///
    /// The summary counts executed migrations as `applied`, the failing one
    /// (if any) as `failed`, and everything not executed this run - already
    /// up to date, deferred by migrate-one, or abandoned after the failure -
    /// as `skipped`.
    pub fn apply_all(
        &self,
        executor: &dyn WarehouseExecutor,
        store: &dyn TrackingStore,
        dry_run: bool,
        one_at_a_time: bool,
    ) -> Result<ApplySummary, MigrationError> {
        log::info!("Deploying migrations to schema: {}", self.schema);

        let files = self.load_files()?;
        let total = files.len();
        log::info!("Found {total} migration files");

        let status = if dry_run {
            // Purity: no schema/table bootstrap in dry-run. A fresh
            // warehouse has no tracking table yet; degrade to an empty
            // applied set instead of failing the preview.
            let records = match store.all() {
                Ok(records) => records,
                Err(e) => {
                    log::warn!("Tracking table unavailable ({e}); assuming no applied migrations");
                    Vec::new()
                }
            };
            self.compute_status(files, records)
        } else {
            executor.execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema))?;
            store.ensure()?;
            self.compute_status(files, store.all()?)
        };

        let take = if one_at_a_time {
            1.min(status.pending.len())
        } else {
            status.pending.len()
        };

        let mut summary = ApplySummary::default();
        for pending in status.pending.iter().take(take) {
            match self.apply(executor, store, &pending.file, dry_run) {
                Ok(_) => summary.applied += 1,
                Err(MigrationError::StatementFailed { .. }) => {
                    summary.failed = 1;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        summary.skipped = total - summary.applied - summary.failed;

        if summary.applied == 0 && summary.failed == 0 {
            log::info!("All migrations are up to date");
        } else {
            log::info!(
                "Deployed {} migration(s), {} failed, {} skipped",
                summary.applied,
                summary.failed,
                summary.skipped
            );
        }

        Ok(summary)
    }

    /// Roll back one migration
    ///
    /// Resolves the target record, re-reads the migration's CURRENT on-disk
    /// content by name (a file edited after being applied is rolled back
    /// from its edited text - a known limitation, preserved deliberately),
    /// extracts the objects it creates, and drops them: views in reverse
    /// creation order first, then tables in reverse creation order, since
    /// views may depend on tables. Each drop uses `IF EXISTS`; a failing
    /// drop is logged and skipped. The tracking record is deleted once the
    /// drop pass finishes, regardless of per-object failures. Rollback never
    /// cascades to migrations that depended on this one.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::NotFound` if the target record does not
    /// exist.
    pub fn rollback(
        &self,
        executor: &dyn WarehouseExecutor,
        store: &dyn TrackingStore,
        target: RollbackTarget<'_>,
        dry_run: bool,
    ) -> Result<RollbackPlan, MigrationError> {
        if !dry_run {
            store.ensure()?;
        }

        let record = match target {
            RollbackTarget::Named(name) => store
                .get(name)?
                .ok_or_else(|| MigrationError::NotFound(format!("migration '{name}'")))?,
            RollbackTarget::Latest => store
                .latest()?
                .ok_or_else(|| MigrationError::NotFound("no migrations recorded".to_string()))?,
        };

        let sql = self
            .source
            .load()?
            .into_iter()
            .find(|(name, _)| *name == record.name)
            .map(|(_, content)| self.rewrite_schema(&content));

        let objects = match sql {
            Some(sql) => extract_objects(&sql),
            None => {
                log::warn!(
                    "Migration file {} no longer on disk; removing tracking record only",
                    record.name
                );
                Vec::new()
            }
        };

        // Views first, each group in reverse creation order
        let mut drops: Vec<ExtractedObject> = Vec::with_capacity(objects.len());
        drops.extend(
            objects
                .iter()
                .filter(|o| o.kind == ObjectKind::View)
                .rev()
                .cloned(),
        );
        drops.extend(
            objects
                .iter()
                .filter(|o| o.kind == ObjectKind::Table)
                .rev()
                .cloned(),
        );

        if dry_run {
            log::info!("DRY RUN: would roll back {}", record.name);
            for object in &drops {
                log::info!("  would drop {} {}", object.kind, object.name);
            }
            return Ok(RollbackPlan {
                migration: record.name,
                drops,
                drop_errors: 0,
                executed: false,
            });
        }

        log::info!("Rolling back migration: {}", record.name);
        let mut drop_errors = 0;
        for object in &drops {
            let sql = format!("DROP {} IF EXISTS {}", object.kind.keyword(), object.name);
            match executor.execute(&sql) {
                Ok(_) => log::info!("  dropped {} {}", object.kind, object.name),
                Err(e) => {
                    log::warn!("  failed to drop {} {}: {e}", object.kind, object.name);
                    drop_errors += 1;
                }
            }
        }

        store.delete(&record.name)?;
        log::info!("Rolled back migration: {}", record.name);

        Ok(RollbackPlan {
            migration: record.name,
            drops,
            drop_errors,
            executed: true,
        })
    }

    /// Rewrite the default schema qualifier to this run's target schema
    ///
    /// Migration files are written against `sec_raw`; deploying to another
    /// schema rewrites qualified names and the schema DDL itself.
    fn rewrite_schema(&self, sql: &str) -> String {
        sql.replace(&format!("{DEFAULT_SCHEMA}."), &format!("{}.", self.schema))
            .replace(
                &format!("CREATE SCHEMA {DEFAULT_SCHEMA}"),
                &format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema),
            )
            .replace(
                &format!("USE SCHEMA {DEFAULT_SCHEMA}"),
                &format!("USE SCHEMA {}", self.schema),
            )
    }
}

// Statements reduced to nothing once line comments are stripped are not sent
// to the warehouse.
fn is_comment_only(statement: &str) -> bool {
    statement
        .lines()
        .all(|line| line.trim().is_empty() || line.trim().starts_with("--"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Row, WarehouseError};
    use crate::migration::tracker::TrackingStore;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    /// In-memory migration source
    struct MemorySource {
        files: Vec<(String, String)>,
    }

    impl MemorySource {
        fn new(files: &[(&str, &str)]) -> Box<Self> {
            Box::new(Self {
                files: files
                    .iter()
                    .map(|(n, c)| (n.to_string(), c.to_string()))
                    .collect(),
            })
        }
    }

    impl MigrationSource for MemorySource {
        fn load(&self) -> Result<Vec<(String, String)>, MigrationError> {
            Ok(self.files.clone())
        }
    }

    /// In-memory tracking store
    #[derive(Default)]
    struct MemoryStore {
        records: RefCell<BTreeMap<String, MigrationRecord>>,
    }

    impl TrackingStore for MemoryStore {
        fn ensure(&self) -> Result<(), MigrationError> {
            Ok(())
        }

        fn all(&self) -> Result<Vec<MigrationRecord>, MigrationError> {
            let mut records: Vec<MigrationRecord> =
                self.records.borrow().values().cloned().collect();
            records.sort_by_key(|r| r.executed_at);
            Ok(records)
        }

        fn get(&self, name: &str) -> Result<Option<MigrationRecord>, MigrationError> {
            Ok(self.records.borrow().get(name).cloned())
        }

        fn put(&self, record: &MigrationRecord) -> Result<(), MigrationError> {
            self.records
                .borrow_mut()
                .insert(record.name.clone(), record.clone());
            Ok(())
        }

        fn delete(&self, name: &str) -> Result<(), MigrationError> {
            self.records.borrow_mut().remove(name);
            Ok(())
        }

        fn latest(&self) -> Result<Option<MigrationRecord>, MigrationError> {
            Ok(self
                .records
                .borrow()
                .values()
                .max_by_key(|r| r.executed_at)
                .cloned())
        }
    }

    /// Executor that records statements and fails on a marker substring
    #[derive(Default)]
    struct ScriptedExecutor {
        executed: RefCell<Vec<String>>,
        fail_on: Option<String>,
    }

    impl ScriptedExecutor {
        fn failing_on(marker: &str) -> Self {
            Self {
                executed: RefCell::new(Vec::new()),
                fail_on: Some(marker.to_string()),
            }
        }

        fn statements(&self) -> Vec<String> {
            self.executed.borrow().clone()
        }
    }

    impl WarehouseExecutor for ScriptedExecutor {
        fn execute(&self, sql: &str) -> Result<u64, WarehouseError> {
            if let Some(marker) = &self.fail_on {
                if sql.contains(marker.as_str()) {
                    return Err(WarehouseError::Statement {
                        code: Some("001003".to_string()),
                        message: format!("syntax error near '{marker}'"),
                    });
                }
            }
            self.executed.borrow_mut().push(sql.to_string());
            Ok(0)
        }

        fn query_all(&self, _sql: &str) -> Result<Vec<Row>, WarehouseError> {
            Ok(Vec::new())
        }
    }

    const CREATE_SUBMISSIONS: &str =
        "CREATE OR REPLACE TABLE sec_raw.submissions (cik STRING, accession_number STRING);";
    const CREATE_COMPANYFACTS: &str =
        "CREATE OR REPLACE TABLE sec_raw.companyfacts (cik STRING, facts VARIANT);";
    const CREATE_TABLE_AND_VIEW: &str = "\
CREATE OR REPLACE TABLE sec_raw.tickers (symbol STRING, cik STRING);
CREATE OR REPLACE VIEW sec_raw.ticker_lookup AS SELECT symbol, cik FROM sec_raw.tickers;";

    fn migrator(files: &[(&str, &str)]) -> Migrator {
        Migrator::with_source(MemorySource::new(files), "sec_raw")
    }

    #[test]
    fn test_apply_all_then_rerun_is_idempotent() {
        let migrator = migrator(&[
            ("202512221000__create_submissions.sql", CREATE_SUBMISSIONS),
            ("202512221100__create_companyfacts.sql", CREATE_COMPANYFACTS),
        ]);
        let executor = ScriptedExecutor::default();
        let store = MemoryStore::default();

        let first = migrator.apply_all(&executor, &store, false, false).unwrap();
        assert_eq!(first.applied, 2);
        assert_eq!(first.failed, 0);

        let second = migrator.apply_all(&executor, &store, false, false).unwrap();
        assert_eq!(second.applied, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(second.failed, 0);
    }

    #[test]
    fn test_edited_migration_is_rerun_without_duplicate_record() {
        let executor = ScriptedExecutor::default();
        let store = MemoryStore::default();

        migrator(&[("202512221000__create_submissions.sql", CREATE_SUBMISSIONS)])
            .apply_all(&executor, &store, false, false)
            .unwrap();
        let original_checksum = store
            .get("202512221000__create_submissions.sql")
            .unwrap()
            .unwrap()
            .checksum;

        // Same file, edited content
        let edited = migrator(&[(
            "202512221000__create_submissions.sql",
            "CREATE OR REPLACE TABLE sec_raw.submissions (cik STRING, form_type STRING);",
        )]);

        let status = edited.status(&store).unwrap();
        assert_eq!(status.pending_count(), 1);
        assert!(status.pending[0].rerun);

        let summary = edited.apply_all(&executor, &store, false, false).unwrap();
        assert_eq!(summary.applied, 1);

        let records = store.all().unwrap();
        assert_eq!(records.len(), 1, "re-application must not duplicate records");
        assert_ne!(records[0].checksum, original_checksum);
    }

    #[test]
    fn test_fail_fast_halts_run_and_records_failure() {
        let migrator = migrator(&[
            ("202512221000__one.sql", CREATE_SUBMISSIONS),
            (
                "202512221100__two.sql",
                "CREATE TABLE sec_raw.broken (id INT);\nSELECT BOOM FROM nowhere;",
            ),
            ("202512221200__three.sql", CREATE_COMPANYFACTS),
        ]);
        let executor = ScriptedExecutor::failing_on("BOOM");
        let store = MemoryStore::default();

        let summary = migrator.apply_all(&executor, &store, false, false).unwrap();
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);

        let one = store.get("202512221000__one.sql").unwrap().unwrap();
        assert_eq!(one.outcome, MigrationOutcome::Success);

        let two = store.get("202512221100__two.sql").unwrap().unwrap();
        assert_eq!(two.outcome, MigrationOutcome::Failed);
        assert!(two.error_message.as_deref().unwrap().contains("BOOM"));

        assert!(
            store.get("202512221200__three.sql").unwrap().is_none(),
            "migration after the failure must never be attempted"
        );
    }

    #[test]
    fn test_failed_migration_is_pending_again() {
        let migrator = migrator(&[(
            "202512221100__two.sql",
            "SELECT BOOM FROM nowhere;",
        )]);
        let store = MemoryStore::default();

        let summary = migrator
            .apply_all(&ScriptedExecutor::failing_on("BOOM"), &store, false, false)
            .unwrap();
        assert_eq!(summary.failed, 1);

        let status = migrator.status(&store).unwrap();
        assert_eq!(status.pending_count(), 1);
        assert!(!status.pending[0].rerun);
    }

    #[test]
    fn test_dry_run_apply_is_pure() {
        let migrator = migrator(&[
            ("202512221000__create_submissions.sql", CREATE_SUBMISSIONS),
            ("202512221100__tv.sql", CREATE_TABLE_AND_VIEW),
        ]);
        let executor = ScriptedExecutor::default();
        let store = MemoryStore::default();

        let summary = migrator.apply_all(&executor, &store, true, false).unwrap();
        assert_eq!(summary.applied, 2);

        assert!(executor.statements().is_empty(), "dry run must execute nothing");
        assert!(store.all().unwrap().is_empty(), "dry run must record nothing");
    }

    #[test]
    fn test_migrate_one_applies_only_next_pending() {
        let migrator = migrator(&[
            ("202512221000__one.sql", CREATE_SUBMISSIONS),
            ("202512221100__two.sql", CREATE_COMPANYFACTS),
        ]);
        let executor = ScriptedExecutor::default();
        let store = MemoryStore::default();

        let summary = migrator.apply_all(&executor, &store, false, true).unwrap();
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.skipped, 1);
        assert!(store.get("202512221000__one.sql").unwrap().is_some());
        assert!(store.get("202512221100__two.sql").unwrap().is_none());

        let summary = migrator.apply_all(&executor, &store, false, true).unwrap();
        assert_eq!(summary.applied, 1);
        assert!(store.get("202512221100__two.sql").unwrap().is_some());
    }

    #[test]
    fn test_malformed_filenames_are_skipped_not_fatal() {
        let migrator = migrator(&[
            ("notes.sql", "CREATE TABLE sec_raw.ignored (id INT);"),
            ("202512221000__one.sql", CREATE_SUBMISSIONS),
        ]);
        let store = MemoryStore::default();

        let status = migrator.status(&store).unwrap();
        assert_eq!(status.pending_count(), 1);
        assert_eq!(status.pending[0].file.name, "202512221000__one.sql");
    }

    #[test]
    fn test_schema_rewrite_targets_configured_schema() {
        let migrator = Migrator::with_source(
            MemorySource::new(&[("202512221000__one.sql", CREATE_SUBMISSIONS)]),
            "analytics",
        );
        let executor = ScriptedExecutor::default();
        let store = MemoryStore::default();

        migrator.apply_all(&executor, &store, false, false).unwrap();

        let statements = executor.statements();
        assert!(statements
            .iter()
            .any(|s| s == "CREATE SCHEMA IF NOT EXISTS analytics"));
        assert!(statements
            .iter()
            .any(|s| s.contains("analytics.submissions")));
        assert!(!statements.iter().any(|s| s.contains("sec_raw.")));
    }

    #[test]
    fn test_comment_only_statements_are_not_sent() {
        let migrator = migrator(&[(
            "202512221000__one.sql",
            "-- preamble only\n;\nCREATE TABLE sec_raw.t (id INT);",
        )]);
        let executor = ScriptedExecutor::default();
        let store = MemoryStore::default();

        migrator.apply_all(&executor, &store, false, false).unwrap();

        let ddl: Vec<String> = executor
            .statements()
            .into_iter()
            .filter(|s| !s.starts_with("CREATE SCHEMA"))
            .collect();
        assert_eq!(ddl.len(), 1);
        assert!(ddl[0].contains("sec_raw.t"));
    }

    #[test]
    fn test_rollback_drops_view_before_table() {
        let migrator = migrator(&[("202512221100__tv.sql", CREATE_TABLE_AND_VIEW)]);
        let executor = ScriptedExecutor::default();
        let store = MemoryStore::default();

        migrator.apply_all(&executor, &store, false, false).unwrap();
        executor.executed.borrow_mut().clear();

        let plan = migrator
            .rollback(&executor, &store, RollbackTarget::Latest, false)
            .unwrap();

        assert!(plan.executed);
        assert_eq!(plan.drops.len(), 2);

        let statements = executor.statements();
        assert_eq!(statements.len(), 2, "exactly one drop per created object");
        assert_eq!(statements[0], "DROP VIEW IF EXISTS sec_raw.ticker_lookup");
        assert_eq!(statements[1], "DROP TABLE IF EXISTS sec_raw.tickers");

        assert!(store.get("202512221100__tv.sql").unwrap().is_none());
    }

    #[test]
    fn test_rollback_by_name_and_not_found() {
        let migrator = migrator(&[("202512221000__one.sql", CREATE_SUBMISSIONS)]);
        let executor = ScriptedExecutor::default();
        let store = MemoryStore::default();

        migrator.apply_all(&executor, &store, false, false).unwrap();

        let missing = migrator.rollback(
            &executor,
            &store,
            RollbackTarget::Named("202599999999__ghost.sql"),
            false,
        );
        assert!(matches!(missing, Err(MigrationError::NotFound(_))));

        let plan = migrator
            .rollback(
                &executor,
                &store,
                RollbackTarget::Named("202512221000__one.sql"),
                false,
            )
            .unwrap();
        assert_eq!(plan.migration, "202512221000__one.sql");
        assert!(store.get("202512221000__one.sql").unwrap().is_none());
    }

    #[test]
    fn test_rollback_latest_on_empty_store_is_not_found() {
        let migrator = migrator(&[]);
        let executor = ScriptedExecutor::default();
        let store = MemoryStore::default();

        let result = migrator.rollback(&executor, &store, RollbackTarget::Latest, false);
        assert!(matches!(result, Err(MigrationError::NotFound(_))));
    }

    #[test]
    fn test_rollback_dry_run_is_pure() {
        let migrator = migrator(&[("202512221100__tv.sql", CREATE_TABLE_AND_VIEW)]);
        let executor = ScriptedExecutor::default();
        let store = MemoryStore::default();

        migrator.apply_all(&executor, &store, false, false).unwrap();
        executor.executed.borrow_mut().clear();

        let plan = migrator
            .rollback(&executor, &store, RollbackTarget::Latest, true)
            .unwrap();

        assert!(!plan.executed);
        assert_eq!(plan.drops.len(), 2);
        assert!(executor.statements().is_empty());
        assert!(
            store.get("202512221100__tv.sql").unwrap().is_some(),
            "dry-run rollback must keep the tracking record"
        );
    }

    #[test]
    fn test_rollback_continues_past_drop_failures() {
        let migrator = migrator(&[("202512221100__tv.sql", CREATE_TABLE_AND_VIEW)]);
        let store = MemoryStore::default();

        migrator
            .apply_all(&ScriptedExecutor::default(), &store, false, false)
            .unwrap();

        // View drop fails; table drop must still run and the record must go
        let executor = ScriptedExecutor::failing_on("ticker_lookup");
        let plan = migrator
            .rollback(&executor, &store, RollbackTarget::Latest, false)
            .unwrap();

        assert_eq!(plan.drop_errors, 1);
        let statements = executor.statements();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("DROP TABLE"));
        assert!(store.get("202512221100__tv.sql").unwrap().is_none());
    }

    #[test]
    fn test_rollback_with_file_missing_from_disk() {
        let executor = ScriptedExecutor::default();
        let store = MemoryStore::default();

        migrator(&[("202512221000__one.sql", CREATE_SUBMISSIONS)])
            .apply_all(&executor, &store, false, false)
            .unwrap();
        executor.executed.borrow_mut().clear();

        // The file has since been deleted from the migrations directory
        let gone = migrator(&[]);
        let plan = gone
            .rollback(&executor, &store, RollbackTarget::Latest, false)
            .unwrap();

        assert!(plan.drops.is_empty());
        assert!(executor.statements().is_empty());
        assert!(store.get("202512221000__one.sql").unwrap().is_none());
    }

    #[test]
    fn test_rollback_uses_current_disk_content() {
        let executor = ScriptedExecutor::default();
        let store = MemoryStore::default();

        migrator(&[("202512221000__one.sql", CREATE_SUBMISSIONS)])
            .apply_all(&executor, &store, false, false)
            .unwrap();
        executor.executed.borrow_mut().clear();

        // File edited after application: rollback follows the edited text
        let edited = migrator(&[(
            "202512221000__one.sql",
            "CREATE OR REPLACE TABLE sec_raw.submissions_v2 (cik STRING);",
        )]);
        let plan = edited
            .rollback(&executor, &store, RollbackTarget::Latest, false)
            .unwrap();

        assert_eq!(plan.drops.len(), 1);
        assert_eq!(plan.drops[0].name, "sec_raw.submissions_v2");
    }
}
