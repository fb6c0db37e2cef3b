//! Connection Module
//!
//! Establishes and manages a Snowflake session over the REST protocol.
//!
//! This module wraps a blocking HTTP agent and provides:
//! - Password-based login (`/session/v1/login-request`)
//! - Single-statement execution (`/queries/v1/query-request`)
//! - Session logout on drop (`/session/logout-request`)
//!
//! One session is acquired per run and held for the run's duration; the
//! `Drop` impl guarantees logout on every exit path, including failures.

use crate::config::WarehouseConfig;
use crate::executor::{Row, WarehouseError, WarehouseExecutor};
use serde_json::{json, Value};
use std::cell::Cell;
use std::fmt;
use uuid::Uuid;

/// Connection error type
#[derive(Debug)]
pub enum ConnectionError {
    /// Network failure reaching the warehouse endpoint
    Transport(String),
    /// The warehouse rejected the credentials
    Auth(String),
    /// Login response could not be interpreted
    Protocol(String),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Transport(s) => {
                write!(f, "Transport error: {s}")
            }
            ConnectionError::Auth(s) => {
                write!(f, "Authentication failed: {s}")
            }
            ConnectionError::Protocol(s) => {
                write!(f, "Unexpected login response: {s}")
            }
        }
    }
}

impl std::error::Error for ConnectionError {}

/// An authenticated Snowflake session.
///
/// Holds the session token issued at login and a monotonically increasing
/// sequence id, as the query endpoint requires. Statement execution happens
/// through the [`WarehouseExecutor`] impl.
pub struct Session {
    agent: ureq::Agent,
    base_url: String,
    token: String,
    sequence: Cell<u64>,
}

/// Establish a session with the warehouse.
///
/// Authenticates with the account/user/password from `config` and pins the
/// session to the configured warehouse, database, schema, and (optionally)
/// role.
///
/// # Errors
///
/// Returns `ConnectionError` if the endpoint is unreachable, the credentials
/// are rejected, or the login response is malformed.
///
/// # Examples
///
/// ```no_run
/// use secwarehouse::{connect, WarehouseConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = WarehouseConfig::load(None)?;
/// let session = connect(&config)?;
/// # Ok(())
/// # }
/// ```
pub fn connect(config: &WarehouseConfig) -> Result<Session, ConnectionError> {
    let base_url = format!("https://{}.snowflakecomputing.com", config.account);
    let agent = ureq::AgentBuilder::new().build();

    let mut request = agent
        .post(&format!("{base_url}/session/v1/login-request"))
        .query("requestId", &Uuid::new_v4().to_string())
        .query("warehouse", &config.warehouse)
        .query("databaseName", &config.database)
        .query("schemaName", &config.schema);
    if let Some(role) = &config.role {
        request = request.query("roleName", role);
    }

    let body = json!({
        "data": {
            "ACCOUNT_NAME": config.account,
            "LOGIN_NAME": config.user,
            "PASSWORD": config.password,
            "CLIENT_APP_ID": "secwarehouse",
            "CLIENT_APP_VERSION": env!("CARGO_PKG_VERSION"),
        }
    });

    let response: Value = send_request(request, &body).map_err(|e| match e {
        WarehouseError::Transport(s) => ConnectionError::Transport(s),
        WarehouseError::Statement { message, .. } | WarehouseError::Auth(message) => {
            ConnectionError::Auth(message)
        }
        WarehouseError::Protocol(s) => ConnectionError::Protocol(s),
    })?;

    if !response["success"].as_bool().unwrap_or(false) {
        let message = response["message"]
            .as_str()
            .unwrap_or("login rejected")
            .to_string();
        return Err(ConnectionError::Auth(message));
    }

    let token = response["data"]["token"]
        .as_str()
        .ok_or_else(|| ConnectionError::Protocol("no session token in response".to_string()))?
        .to_string();

    log::info!(
        "Connected to Snowflake: {}/{}/{}",
        config.account,
        config.database,
        config.schema
    );

    Ok(Session {
        agent,
        base_url,
        token,
        sequence: Cell::new(0),
    })
}

impl Session {
    /// Close the session explicitly.
    ///
    /// Logout also happens automatically on drop; this exists for callers
    /// that want to release the session at a well-defined point.
    pub fn close(self) {
        drop(self);
    }

    /// Send one statement to the query endpoint and return the parsed body.
    fn query_request(&self, sql: &str) -> Result<Value, WarehouseError> {
        let sequence = self.sequence.get() + 1;
        self.sequence.set(sequence);

        let request = self
            .agent
            .post(&format!("{}/queries/v1/query-request", self.base_url))
            .query("requestId", &Uuid::new_v4().to_string())
            .set(
                "Authorization",
                &format!("Snowflake Token=\"{}\"", self.token),
            );

        let body = json!({
            "sqlText": sql,
            "asyncExec": false,
            "sequenceId": sequence,
        });

        let response = send_request(request, &body)?;

        if response["success"].as_bool().unwrap_or(false) {
            Ok(response)
        } else {
            let message = response["message"]
                .as_str()
                .unwrap_or("statement rejected")
                .to_string();
            let code = response["code"]
                .as_str()
                .map(str::to_string)
                .or_else(|| response["data"]["errorCode"].as_str().map(str::to_string));
            Err(WarehouseError::Statement { code, message })
        }
    }
}

impl WarehouseExecutor for Session {
    fn execute(&self, sql: &str) -> Result<u64, WarehouseError> {
        let response = self.query_request(sql)?;

        // DML responses carry the affected-row count as the single cell of a
        // single row; DDL responses carry a status string instead.
        let affected = response["data"]["rowset"]
            .get(0)
            .and_then(|row| row.get(0))
            .and_then(Value::as_str)
            .and_then(|cell| cell.parse::<u64>().ok())
            .unwrap_or(0);

        Ok(affected)
    }

    fn query_all(&self, sql: &str) -> Result<Vec<Row>, WarehouseError> {
        let response = self.query_request(sql)?;

        let rowset = response["data"]["rowset"]
            .as_array()
            .ok_or_else(|| WarehouseError::Protocol("response has no rowset".to_string()))?;

        let mut rows = Vec::with_capacity(rowset.len());
        for raw in rowset {
            let cells = raw
                .as_array()
                .ok_or_else(|| WarehouseError::Protocol("rowset entry is not a row".to_string()))?;
            rows.push(cells.iter().map(cell_to_string).collect());
        }

        Ok(rows)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Best-effort logout; errors during drop cannot be propagated
        let request = self
            .agent
            .post(&format!("{}/session/logout-request", self.base_url))
            .query("requestId", &Uuid::new_v4().to_string())
            .set(
                "Authorization",
                &format!("Snowflake Token=\"{}\"", self.token),
            );
        let _ = request.send_json(json!({}));
        log::info!("Disconnected from Snowflake");
    }
}

/// POST a JSON body and parse the JSON response, normalizing transport and
/// HTTP-status failures into `WarehouseError`.
fn send_request(request: ureq::Request, body: &Value) -> Result<Value, WarehouseError> {
    let response = match request.send_json(body.clone()) {
        Ok(response) => response,
        Err(ureq::Error::Status(status, response)) => {
            let detail = response
                .into_json::<Value>()
                .ok()
                .and_then(|v| v["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| format!("HTTP status {status}"));
            if status == 401 || status == 403 {
                return Err(WarehouseError::Auth(detail));
            }
            return Err(WarehouseError::Statement {
                code: Some(status.to_string()),
                message: detail,
            });
        }
        Err(e) => return Err(WarehouseError::Transport(e.to_string())),
    };

    response
        .into_json::<Value>()
        .map_err(|e| WarehouseError::Protocol(format!("invalid JSON response: {e}")))
}

/// Convert one rowset cell into the executor's string representation.
fn cell_to_string(cell: &Value) -> Option<String> {
    match cell {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
