//! The tabular store seam
//!
//! The engine talks to sheets through the [`TabularStore`] trait: read every
//! row of a sheet, or append one row past the current extent. Column order
//! is preserved and missing cells are empty strings, never errors.
//!
//! Two backends are provided: [`CsvStore`] keeps each sheet in a CSV file so
//! the daemon runs without a spreadsheet backend, and [`MemoryStore`] backs
//! the engine tests.

use crate::row::Row;
use rowsync_common::{Result, SyncError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// Abstract tabular storage: ordered sheets of sparse string rows
pub trait TabularStore {
    /// Read all rows of a sheet, in sheet order
    fn read_all_rows(&self, sheet: &str) -> impl std::future::Future<Output = Result<Vec<Row>>> + Send;

    /// Append one row at the first position past the sheet's current extent
    fn append_row(&self, sheet: &str, row: &Row) -> impl std::future::Future<Output = Result<()>> + Send;
}

// ============================================================================
// CSV-backed store
// ============================================================================

/// Tabular store backed by one CSV file per sheet
///
/// Sheet `Заявки` lives in `<dir>/Заявки.csv`. Records may be ragged;
/// readers and writers are built per call since polling is infrequent.
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    /// Create a store over the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{sheet}.csv"))
    }
}

impl TabularStore for CsvStore {
    async fn read_all_rows(&self, sheet: &str) -> Result<Vec<Row>> {
        let path = self.sheet_path(sheet);
        if !path.exists() {
            return Err(SyncError::store(format!(
                "sheet '{sheet}' not found at {}",
                path.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .map_err(|e| SyncError::store(format!("failed to open sheet '{sheet}': {e}")))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| SyncError::store(format!("bad record in '{sheet}': {e}")))?;
            rows.push(Row(record.iter().map(str::to_string).collect()));
        }

        debug!(sheet, count = rows.len(), "Read sheet");
        Ok(rows)
    }

    async fn append_row(&self, sheet: &str, row: &Row) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.sheet_path(sheet))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(file);

        writer
            .write_record(row.0.iter())
            .map_err(|e| SyncError::store(format!("failed to append to '{sheet}': {e}")))?;
        writer
            .flush()
            .map_err(|e| SyncError::store(format!("failed to flush '{sheet}': {e}")))?;

        Ok(())
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// In-memory tabular store for tests
///
/// `fail_appends(true)` makes every append return a store error, which the
/// crash-safety tests use to check the append-then-record invariant.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sheets: Mutex<HashMap<String, Vec<Row>>>,
    fail_appends: Mutex<bool>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn sheets(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Row>>> {
        // Single-threaded test usage; a poisoned lock still holds valid data
        self.sheets.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the contents of a sheet
    pub fn set_sheet(&self, sheet: &str, rows: Vec<Row>) {
        self.sheets().insert(sheet.to_string(), rows);
    }

    /// Snapshot the contents of a sheet
    pub fn sheet(&self, sheet: &str) -> Vec<Row> {
        self.sheets().get(sheet).cloned().unwrap_or_default()
    }

    /// Toggle whether appends fail
    pub fn fail_appends(&self, fail: bool) {
        *self
            .fail_appends
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = fail;
    }

    fn appends_failing(&self) -> bool {
        *self
            .fail_appends
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl TabularStore for MemoryStore {
    async fn read_all_rows(&self, sheet: &str) -> Result<Vec<Row>> {
        Ok(self.sheet(sheet))
    }

    async fn append_row(&self, sheet: &str, row: &Row) -> Result<()> {
        if self.appends_failing() {
            return Err(SyncError::store("append failed (injected)"));
        }

        self.sheets()
            .entry(sheet.to_string())
            .or_default()
            .push(row.clone());
        Ok(())
    }
}
