//! `MigrationRecord` - Represents entries in the `schema_migrations` tracking table

use crate::executor::Row;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;

/// Outcome recorded for an attempted migration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    Success,
    Failed,
}

impl MigrationOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, MigrationOutcome::Success)
    }
}

impl fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationOutcome::Success => f.write_str("success"),
            MigrationOutcome::Failed => f.write_str("failed"),
        }
    }
}

/// Represents a migration record in the `schema_migrations` tracking table
///
/// At most one record exists per migration name; re-application updates the
/// existing record in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    /// Migration filename (unique key)
    pub name: String,

    /// `SHA-256` checksum of the content that was applied
    pub checksum: String,

    /// When the migration was attempted
    pub executed_at: DateTime<Utc>,

    /// Warehouse user that ran the migration
    pub executed_by: Option<String>,

    /// Execution time in milliseconds (`None` if not recorded)
    pub execution_time_ms: Option<i64>,

    /// Whether the migration completed successfully
    pub outcome: MigrationOutcome,

    /// Warehouse error message for failed migrations
    pub error_message: Option<String>,
}

impl MigrationRecord {
    /// Create a `MigrationRecord` from a warehouse row
    ///
    /// Expected column order: `migration_name`, `checksum`, `executed_at`,
    /// `executed_by`, `execution_time_ms`, `success`, `error_message`.
    ///
    /// # Errors
    ///
    /// Returns a description of the offending cell if a required column is
    /// missing or unparseable.
    pub fn from_row(row: &Row) -> Result<Self, String> {
        let text = |i: usize| -> Option<String> { row.get(i).cloned().flatten() };

        let name = text(0).ok_or("missing migration_name column")?;
        let checksum = text(1).ok_or("missing checksum column")?;

        let executed_at_raw = text(2).ok_or("missing executed_at column")?;
        let executed_at = parse_timestamp(&executed_at_raw)
            .ok_or_else(|| format!("unrecognized timestamp format: '{executed_at_raw}'"))?;

        let executed_by = text(3);

        let execution_time_ms = match text(4) {
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| format!("invalid execution_time_ms: '{raw}'"))?,
            ),
            None => None,
        };

        let success_raw = text(5).ok_or("missing success column")?;
        let outcome = match success_raw.to_ascii_lowercase().as_str() {
            "true" | "1" => MigrationOutcome::Success,
            "false" | "0" => MigrationOutcome::Failed,
            other => return Err(format!("invalid success flag: '{other}'")),
        };

        let error_message = text(6);

        Ok(Self {
            name,
            checksum,
            executed_at,
            executed_by,
            execution_time_ms,
            outcome,
            error_message,
        })
    }
}

/// Parse a warehouse timestamp cell.
///
/// The REST protocol returns `TIMESTAMP_NTZ` as fractional epoch seconds;
/// text formats are accepted as well since `SHOW`-style metadata renders
/// timestamps as strings.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(epoch) = raw.parse::<f64>() {
        let seconds = epoch.trunc() as i64;
        let nanos = (epoch.fract() * 1_000_000_000.0).round() as u32;
        return Utc.timestamp_opt(seconds, nanos).single();
    }

    for format in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    None
}
