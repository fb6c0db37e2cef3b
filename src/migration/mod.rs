//! Migration system for the SEC filings warehouse
//!
//! This module owns the migration lifecycle:
//! - Discovery and deterministic ordering of versioned SQL files
//! - Pending-set computation with checksum-based change detection
//! - Statement-by-statement execution with per-file outcome tracking
//! - Rollback driven by object extraction from the migration's own DDL
//!
//! # Example
//!
//! ```rust,no_run
//! use secwarehouse::migration::{Migrator, SqlTrackingStore};
//! use secwarehouse::{connect, WarehouseConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WarehouseConfig::load(None)?;
//! let session = connect(&config)?;
//!
//! let migrator = Migrator::new("migrations", &config.schema);
//! let store = SqlTrackingStore::new(&session, &config.schema);
//! let summary = migrator.apply_all(&session, &store, false, false)?;
//! println!("applied {}", summary.applied);
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod error;
pub mod file;
pub mod migrator;
pub mod record;
pub mod split;
pub mod status;
pub mod tracker;

pub use checksum::checksum;
pub use error::MigrationError;
pub use file::{parse_filename, DirectorySource, MigrationFile, MigrationSource};
pub use migrator::{Migrator, RollbackPlan, RollbackTarget};
pub use record::{MigrationOutcome, MigrationRecord};
pub use split::split_statements;
pub use status::{ApplySummary, MigrationStatus, PendingMigration};
pub use tracker::{SqlTrackingStore, TrackingStore};
