//! Daemon configuration
//!
//! All settings live in one explicit struct passed to constructors; there
//! are no ambient globals. Values come from environment variables (usually
//! via a `.env` file loaded by the binary). Missing required settings are
//! fatal and reported before the poll loop starts.

use rowsync_common::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// Approval token matched (trimmed, lowercased) against the approval cell
pub const DEFAULT_APPROVAL_TOKEN: &str = "одобрена";

/// Zero-based index of the approval-status column (column E)
pub const DEFAULT_APPROVAL_COLUMN: usize = 4;

/// Destination column i takes source column DEFAULT_COLUMN_MAPPING[i]
pub const DEFAULT_COLUMN_MAPPING: [usize; 9] = [1, 2, 9, 3, 7, 11, 12, 13, 5];

/// Source columns a row signature is derived from
pub const DEFAULT_SIGNATURE_COLUMNS: [usize; 1] = [1];

/// Serial-date plausibility bounds (exclusive), roughly 1927..2036
pub const DEFAULT_SERIAL_DATE_MIN: f64 = 10_000.0;
pub const DEFAULT_SERIAL_DATE_MAX: f64 = 50_000.0;

/// Pause between consecutive appends, matching the destination write quota
pub const DEFAULT_APPEND_DELAY_MS: u64 = 1_100;

/// Wait after a failed cycle before retrying
pub const DEFAULT_ERROR_BACKOFF_SECS: u64 = 30;

/// Persisted signature state file
pub const DEFAULT_STATE_PATH: &str = "./processed_rows.json";

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Spreadsheet identifier (logical store handle, logged at startup)
    pub spreadsheet_id: String,

    /// Sheet rows are read from
    pub source_sheet: String,

    /// Sheet rows are appended to
    pub target_sheet: String,

    /// Seconds between poll cycles (>= 1)
    pub poll_interval_secs: u64,

    /// Approval token; the approval cell is trimmed and lowercased before
    /// comparison
    pub approval_token: String,

    /// Zero-based index of the approval-status column
    pub approval_column: usize,

    /// Destination column i takes source column `column_mapping[i]`
    pub column_mapping: Vec<usize>,

    /// Source columns the row signature is derived from; the first listed
    /// column is also the primary-key projection used by reconciliation
    pub signature_columns: Vec<usize>,

    /// Lower plausibility bound for serial dates (exclusive)
    pub serial_date_min: f64,

    /// Upper plausibility bound for serial dates (exclusive)
    pub serial_date_max: f64,

    /// Pause between consecutive appends, in milliseconds
    pub append_delay_ms: u64,

    /// Drop signatures whose source row no longer exists, so a deleted and
    /// later re-added row is treated as new
    pub reconcile_deleted: bool,

    /// Path of the persisted signature state file
    pub state_path: PathBuf,

    /// Wait after a failed cycle before the next attempt, in seconds
    pub error_backoff_secs: u64,
}

impl SyncConfig {
    /// Load configuration from environment variables
    ///
    /// Required: `ROWSYNC_SPREADSHEET_ID`, `ROWSYNC_SOURCE_SHEET`,
    /// `ROWSYNC_TARGET_SHEET`, `ROWSYNC_POLL_INTERVAL_SECS`.
    ///
    /// Optional (with defaults): `ROWSYNC_APPROVAL_TOKEN`,
    /// `ROWSYNC_APPROVAL_COLUMN`, `ROWSYNC_COLUMN_MAPPING`,
    /// `ROWSYNC_SIGNATURE_COLUMNS`, `ROWSYNC_SERIAL_DATE_MIN`,
    /// `ROWSYNC_SERIAL_DATE_MAX`, `ROWSYNC_APPEND_DELAY_MS`,
    /// `ROWSYNC_RECONCILE_DELETED`, `ROWSYNC_STATE_PATH`,
    /// `ROWSYNC_ERROR_BACKOFF_SECS`.
    pub fn from_env() -> Result<Self> {
        let interval_raw = require("ROWSYNC_POLL_INTERVAL_SECS")?;
        let poll_interval_secs = interval_raw.trim().parse().map_err(|_| {
            SyncError::config(format!(
                "ROWSYNC_POLL_INTERVAL_SECS has an invalid value: {interval_raw}"
            ))
        })?;

        let config = Self {
            spreadsheet_id: require("ROWSYNC_SPREADSHEET_ID")?,
            source_sheet: require("ROWSYNC_SOURCE_SHEET")?,
            target_sheet: require("ROWSYNC_TARGET_SHEET")?,
            poll_interval_secs,
            approval_token: optional("ROWSYNC_APPROVAL_TOKEN")
                .unwrap_or_else(|| DEFAULT_APPROVAL_TOKEN.to_string()),
            approval_column: parse_var(
                "ROWSYNC_APPROVAL_COLUMN",
                optional("ROWSYNC_APPROVAL_COLUMN"),
                DEFAULT_APPROVAL_COLUMN,
            )?,
            column_mapping: parse_index_list(
                "ROWSYNC_COLUMN_MAPPING",
                optional("ROWSYNC_COLUMN_MAPPING"),
                &DEFAULT_COLUMN_MAPPING,
            )?,
            signature_columns: parse_index_list(
                "ROWSYNC_SIGNATURE_COLUMNS",
                optional("ROWSYNC_SIGNATURE_COLUMNS"),
                &DEFAULT_SIGNATURE_COLUMNS,
            )?,
            serial_date_min: parse_var(
                "ROWSYNC_SERIAL_DATE_MIN",
                optional("ROWSYNC_SERIAL_DATE_MIN"),
                DEFAULT_SERIAL_DATE_MIN,
            )?,
            serial_date_max: parse_var(
                "ROWSYNC_SERIAL_DATE_MAX",
                optional("ROWSYNC_SERIAL_DATE_MAX"),
                DEFAULT_SERIAL_DATE_MAX,
            )?,
            append_delay_ms: parse_var(
                "ROWSYNC_APPEND_DELAY_MS",
                optional("ROWSYNC_APPEND_DELAY_MS"),
                DEFAULT_APPEND_DELAY_MS,
            )?,
            reconcile_deleted: parse_var(
                "ROWSYNC_RECONCILE_DELETED",
                optional("ROWSYNC_RECONCILE_DELETED"),
                true,
            )?,
            state_path: optional("ROWSYNC_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH)),
            error_backoff_secs: parse_var(
                "ROWSYNC_ERROR_BACKOFF_SECS",
                optional("ROWSYNC_ERROR_BACKOFF_SECS"),
                DEFAULT_ERROR_BACKOFF_SECS,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs < 1 {
            return Err(SyncError::config(
                "ROWSYNC_POLL_INTERVAL_SECS must be at least 1",
            ));
        }
        if self.column_mapping.is_empty() {
            return Err(SyncError::config("ROWSYNC_COLUMN_MAPPING must not be empty"));
        }
        if self.signature_columns.is_empty() {
            return Err(SyncError::config(
                "ROWSYNC_SIGNATURE_COLUMNS must not be empty",
            ));
        }
        if self.signature_columns.contains(&self.approval_column) {
            return Err(SyncError::config(
                "ROWSYNC_SIGNATURE_COLUMNS must not include the approval column; \
                 the approval cell changes after approval and would destabilize signatures",
            ));
        }
        if self.serial_date_min >= self.serial_date_max {
            return Err(SyncError::config(
                "ROWSYNC_SERIAL_DATE_MIN must be below ROWSYNC_SERIAL_DATE_MAX",
            ));
        }
        Ok(())
    }

    /// Poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Error backoff as a Duration
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    /// Per-append pacing delay as a Duration
    pub fn append_delay(&self) -> Duration {
        Duration::from_millis(self.append_delay_ms)
    }

    /// The column whose trimmed text identifies a live source row during
    /// reconciliation
    pub fn primary_key_column(&self) -> usize {
        self.signature_columns[0]
    }
}

/// Read a required environment variable
fn require(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(SyncError::config(format!("{var} is not set"))),
    }
}

/// Read an optional environment variable, treating empty as unset
fn optional(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an optional value, falling back to a default
fn parse_var<T>(var: &str, value: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SyncError::config(format!("{var} has an invalid value: {raw}"))),
        None => Ok(default),
    }
}

/// Parse a comma-separated list of column indices
fn parse_index_list(var: &str, value: Option<String>, default: &[usize]) -> Result<Vec<usize>> {
    match value {
        Some(raw) => raw
            .split(',')
            .map(|part| {
                part.trim()
                    .parse()
                    .map_err(|_| SyncError::config(format!("{var} has an invalid index: {part}")))
            })
            .collect(),
        None => Ok(default.to_vec()),
    }
}
