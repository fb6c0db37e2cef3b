//! `WarehouseExecutor` - the execution seam between the migration engine and Snowflake
//!
//! Everything that touches the warehouse (the migrator, the tracking store,
//! schema cleanup) goes through this trait, so tests can substitute a mock
//! and production code a real REST session.

use std::fmt;

/// A single result row as returned by the warehouse.
///
/// Snowflake's REST protocol returns every cell as an optional string
/// (`NULL` becomes `None`); typed decoding is the caller's concern.
pub type Row = Vec<Option<String>>;

/// Warehouse execution error type
#[derive(Debug)]
pub enum WarehouseError {
    /// Network-level failure talking to the warehouse
    Transport(String),
    /// The warehouse accepted the request but rejected the statement
    Statement {
        code: Option<String>,
        message: String,
    },
    /// Authentication or session establishment failure
    Auth(String),
    /// Response arrived but could not be interpreted
    Protocol(String),
}

impl fmt::Display for WarehouseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarehouseError::Transport(s) => {
                write!(f, "Transport error: {s}")
            }
            WarehouseError::Statement { code, message } => match code {
                Some(code) => write!(f, "Statement failed (error {code}): {message}"),
                None => write!(f, "Statement failed: {message}"),
            },
            WarehouseError::Auth(s) => {
                write!(f, "Authentication error: {s}")
            }
            WarehouseError::Protocol(s) => {
                write!(f, "Protocol error: {s}")
            }
        }
    }
}

impl std::error::Error for WarehouseError {}

/// Trait for executing SQL against the warehouse
///
/// Statements are sent as complete SQL text; the warehouse dialect has no
/// client-side parameter binding here, so callers escape literals themselves
/// (see [`quote_literal`]). Each call is blocking and runs exactly one
/// statement.
///
/// # Examples
///
/// ```no_run
/// use secwarehouse::{connect, WarehouseConfig, WarehouseExecutor};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = WarehouseConfig::load(None)?;
/// let session = connect(&config)?;
///
/// session.execute("CREATE SCHEMA IF NOT EXISTS sec_raw")?;
///
/// let rows = session.query_all("SHOW TABLES IN SCHEMA sec_raw")?;
/// for row in rows {
///     println!("{:?}", row.get(1));
/// }
/// # Ok(())
/// # }
/// ```
pub trait WarehouseExecutor {
    /// Execute a single SQL statement and return the number of affected rows
    ///
    /// DDL statements report 0 affected rows.
    ///
    /// # Errors
    ///
    /// Returns `WarehouseError` if the statement is rejected or the
    /// connection fails.
    fn execute(&self, sql: &str) -> Result<u64, WarehouseError>;

    /// Execute a single SQL statement and return all result rows
    ///
    /// # Errors
    ///
    /// Returns `WarehouseError` if the statement is rejected or the
    /// connection fails.
    fn query_all(&self, sql: &str) -> Result<Vec<Row>, WarehouseError>;
}

/// Quote a string as a SQL literal, doubling embedded single quotes.
///
/// This is how the warehouse dialect escapes literals; used when building
/// tracking-table statements from migration names and error messages.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_literal_plain() {
        assert_eq!(quote_literal("submissions"), "'submissions'");
    }

    #[test]
    fn test_quote_literal_embedded_quote() {
        assert_eq!(quote_literal("can't"), "'can''t'");
    }

    #[test]
    fn test_warehouse_error_display() {
        let err = WarehouseError::Statement {
            code: Some("002003".to_string()),
            message: "Object does not exist".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("002003"));
        assert!(text.contains("Object does not exist"));

        let err = WarehouseError::Transport("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
