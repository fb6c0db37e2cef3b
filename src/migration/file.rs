//! Migration file discovery and parsing

use crate::migration::checksum::checksum;
use crate::migration::MigrationError;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Represents a discovered migration file
#[derive(Debug, Clone)]
pub struct MigrationFile {
    /// Filename, the migration's unique identifier (e.g. `202512221000__create_submissions.sql`)
    pub name: String,

    /// Normalized 12-digit ordering prefix (`YYYYMMDDHHMM`); legacy 8-digit
    /// prefixes are padded with `0000` so both formats sort together
    pub prefix: String,

    /// Human-readable description parsed from the filename
    pub description: String,

    /// Full SQL content (after schema rewriting)
    pub sql: String,

    /// SHA-256 checksum of `sql`
    pub checksum: String,
}

impl MigrationFile {
    /// Create a new `MigrationFile`, computing the content checksum
    #[must_use]
    pub fn new(name: String, prefix: String, description: String, sql: String) -> Self {
        let checksum = checksum(&sql);
        Self {
            name,
            prefix,
            description,
            sql,
            checksum,
        }
    }

    /// Deterministic ordering key: (normalized prefix, filename)
    ///
    /// The prefix comparison is lexicographic over fixed-width digits, which
    /// matches chronological order; the filename breaks ties.
    #[must_use]
    pub fn sort_key(&self) -> (&str, &str) {
        (&self.prefix, &self.name)
    }
}

/// Parse a migration filename into its normalized prefix and description
///
/// Accepted formats: `YYYYMMDDHHMM__description.sql` or the legacy
/// `YYYYMMDD__description.sql`. A legacy prefix is normalized by suffixing
/// `0000`, placing it at midnight of its day - before any same-day
/// timestamped migration.
///
/// Returns `None` for names matching neither pattern; callers treat that as
/// a skippable discovery warning, not an error.
#[must_use]
pub fn parse_filename(filename: &str) -> Option<(String, String)> {
    let re = Regex::new(r"^(\d{12}|\d{8})__(.+)\.sql$").ok()?;
    let caps = re.captures(filename)?;

    let raw_prefix = caps.get(1)?.as_str();
    let description = caps.get(2)?.as_str().to_string();

    let mut prefix = raw_prefix.to_string();
    if prefix.len() == 8 {
        prefix.push_str("0000");
    }

    Some((prefix, description))
}

/// Provider of migration files as `(filename, content)` pairs
///
/// The migrator reads migrations only through this trait, so tests can feed
/// in-memory content instead of touching a filesystem.
pub trait MigrationSource {
    /// Load every candidate migration file
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Source` if the underlying provider cannot be
    /// read at all. Individual malformed names are NOT this method's concern;
    /// the migrator filters them with a warning.
    fn load(&self) -> Result<Vec<(String, String)>, MigrationError>;
}

/// Filesystem-backed migration source scanning a directory for `.sql` files
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    /// Create a source over the given migrations directory
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl MigrationSource for DirectorySource {
    fn load(&self) -> Result<Vec<(String, String)>, MigrationError> {
        if !self.dir.is_dir() {
            return Err(MigrationError::Source(format!(
                "Migrations directory not found: {}",
                self.dir.display()
            )));
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| {
            MigrationError::Source(format!(
                "Failed to read migrations directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| MigrationError::Source(format!("Failed to read directory entry: {e}")))?;
            let path = entry.path();

            if path.extension().and_then(|s| s.to_str()) != Some("sql") {
                continue;
            }

            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(&path).map_err(|e| {
                MigrationError::Source(format!(
                    "Failed to read migration file {}: {}",
                    path.display(),
                    e
                ))
            })?;

            files.push((filename.to_string(), content));
        }

        Ok(files)
    }
}
