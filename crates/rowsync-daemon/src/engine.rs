//! One poll cycle over the source sheet
//!
//! The engine reads the source, optionally prunes signatures whose rows
//! were deleted, copies newly-approved rows to the destination, and
//! persists the signature set. The ordering invariant is append-then-record:
//! a signature enters the in-memory set only after its row was successfully
//! appended, so a failed append can never be masked as "already synced".

use crate::config::SyncConfig;
use crate::row::{primary_key_of, Row, RowSignature, SignatureScheme};
use crate::state::{reconcile, SignatureStore};
use crate::store::TabularStore;
use crate::transform::RowTransformer;
use rowsync_common::Result;
use std::collections::HashSet;
use tracing::{debug, info};

/// Orchestrates one polling pass: read, filter, transform, append, record
pub struct SyncEngine<S: TabularStore> {
    config: SyncConfig,
    store: S,
    state: SignatureStore,
    scheme: SignatureScheme,
    transformer: RowTransformer,
    approval_token: String,
    processed: HashSet<RowSignature>,
}

impl<S: TabularStore> SyncEngine<S> {
    /// Build an engine and load persisted signature state
    pub fn new(config: SyncConfig, store: S) -> Result<Self> {
        config.validate()?;

        let state = SignatureStore::new(&config.state_path);
        let processed = state.load();
        let scheme = SignatureScheme::new(config.signature_columns.clone());
        let transformer = RowTransformer::new(
            config.column_mapping.clone(),
            config.serial_date_min,
            config.serial_date_max,
        );
        let approval_token = config.approval_token.trim().to_lowercase();

        info!(known = processed.len(), "Loaded signature state");

        Ok(Self {
            config,
            store,
            state,
            scheme,
            transformer,
            approval_token,
            processed,
        })
    }

    /// Number of signatures currently known
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Run one poll cycle; returns the number of rows copied
    ///
    /// A store failure aborts the cycle and leaves both the in-memory set
    /// and the persisted state untouched for rows not yet appended.
    pub async fn poll(&mut self) -> Result<usize> {
        let rows = self.store.read_all_rows(&self.config.source_sheet).await?;
        debug!(rows = rows.len(), sheet = %self.config.source_sheet, "Read source sheet");

        if self.config.reconcile_deleted {
            self.prune_deleted(&rows)?;
        }

        let mut copied = 0usize;

        for (row_num, row) in rows.iter().enumerate() {
            if row.is_blank() {
                continue;
            }
            if !self.is_eligible(row) {
                continue;
            }

            let signature = self.scheme.signature_of(row);
            if self.processed.contains(&signature) {
                continue;
            }

            info!(row = row_num + 1, signature = %signature, "Copying approved row");

            let transformed = self.transformer.transform(row);
            self.store
                .append_row(&self.config.target_sheet, &transformed)
                .await?;

            // Record only after the append succeeded
            self.processed.insert(signature);
            copied += 1;

            if self.config.append_delay_ms > 0 {
                tokio::time::sleep(self.config.append_delay()).await;
            }
        }

        if copied > 0 {
            self.state.save(&self.processed)?;
            info!(copied, "Copied new rows");
        } else {
            debug!("No new rows to copy");
        }

        Ok(copied)
    }

    /// Approval predicate: the approval cell, trimmed and lowercased,
    /// equals the configured token
    fn is_eligible(&self, row: &Row) -> bool {
        row.cell(self.config.approval_column).trim().to_lowercase() == self.approval_token
    }

    /// Drop signatures whose source row no longer exists
    fn prune_deleted(&mut self, rows: &[Row]) -> Result<()> {
        let key_column = self.config.primary_key_column();
        let live_keys: HashSet<String> = rows
            .iter()
            .filter(|row| !row.is_blank())
            .map(|row| primary_key_of(row, key_column))
            .collect();

        let pruned = reconcile(&self.processed, &live_keys);
        let dropped = self.processed.len() - pruned.len();

        if dropped > 0 {
            info!(dropped, "Dropped signatures for deleted source rows");
            self.processed = pruned;
            self.state.save(&self.processed)?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::{
        DEFAULT_APPROVAL_COLUMN, DEFAULT_APPROVAL_TOKEN, DEFAULT_COLUMN_MAPPING,
        DEFAULT_SERIAL_DATE_MAX, DEFAULT_SERIAL_DATE_MIN, DEFAULT_SIGNATURE_COLUMNS,
    };
    use crate::store::MemoryStore;
    use std::path::Path;
    use tempfile::TempDir;

    const SOURCE: &str = "source";
    const TARGET: &str = "target";

    fn test_config(state_path: &Path) -> SyncConfig {
        SyncConfig {
            spreadsheet_id: "test".to_string(),
            source_sheet: SOURCE.to_string(),
            target_sheet: TARGET.to_string(),
            poll_interval_secs: 60,
            approval_token: DEFAULT_APPROVAL_TOKEN.to_string(),
            approval_column: DEFAULT_APPROVAL_COLUMN,
            column_mapping: DEFAULT_COLUMN_MAPPING.to_vec(),
            signature_columns: DEFAULT_SIGNATURE_COLUMNS.to_vec(),
            serial_date_min: DEFAULT_SERIAL_DATE_MIN,
            serial_date_max: DEFAULT_SERIAL_DATE_MAX,
            append_delay_ms: 0,
            reconcile_deleted: true,
            state_path: state_path.to_path_buf(),
            error_backoff_secs: 30,
        }
    }

    fn approved_row(key: &str) -> Row {
        Row::new([
            "0", key, "Widget", "3", "Одобрена ", "45000", "6", "unit", "8", "note", "10", "11",
            "12", "13",
        ])
    }

    fn pending_row(key: &str) -> Row {
        let mut row = approved_row(key);
        row.0[DEFAULT_APPROVAL_COLUMN] = "на рассмотрении".to_string();
        row
    }

    fn engine_with_rows(
        dir: &TempDir,
        rows: Vec<Row>,
    ) -> SyncEngine<MemoryStore> {
        let store = MemoryStore::new();
        store.set_sheet(SOURCE, rows);
        SyncEngine::new(test_config(&dir.path().join("state.json")), store).unwrap()
    }

    #[tokio::test]
    async fn test_approved_row_is_copied_and_transformed() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_with_rows(&dir, vec![approved_row("ACME-42")]);

        let copied = engine.poll().await.unwrap();
        assert_eq!(copied, 1);

        let target = engine.store.sheet(TARGET);
        assert_eq!(target.len(), 1);
        assert_eq!(target[0].cell(0), "ACME-42");
        assert_eq!(target[0].cell(8), "15.03.2023");
        assert_eq!(engine.processed_count(), 1);
    }

    #[tokio::test]
    async fn test_second_poll_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut engine =
            engine_with_rows(&dir, vec![approved_row("ACME-42"), approved_row("ACME-43")]);

        assert_eq!(engine.poll().await.unwrap(), 2);
        assert_eq!(engine.poll().await.unwrap(), 0);
        assert_eq!(engine.store.sheet(TARGET).len(), 2);
    }

    #[tokio::test]
    async fn test_unapproved_rows_are_never_copied() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_with_rows(&dir, vec![pending_row("ACME-42")]);

        assert_eq!(engine.poll().await.unwrap(), 0);
        assert!(engine.store.sheet(TARGET).is_empty());
        assert_eq!(engine.processed_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_rows_do_not_touch_state() {
        let dir = TempDir::new().unwrap();
        let state_path = dir.path().join("state.json");
        let mut engine = engine_with_rows(&dir, vec![Row::new(["", "", ""]), Row::default()]);

        assert_eq!(engine.poll().await.unwrap(), 0);
        assert_eq!(engine.processed_count(), 0);
        assert!(!state_path.exists());
    }

    #[tokio::test]
    async fn test_failed_append_records_no_signature() {
        let dir = TempDir::new().unwrap();
        let state_path = dir.path().join("state.json");
        let store = MemoryStore::new();
        store.set_sheet(SOURCE, vec![approved_row("ACME-42")]);
        store.fail_appends(true);

        let mut engine = SyncEngine::new(test_config(&state_path), store).unwrap();

        assert!(engine.poll().await.is_err());
        assert_eq!(engine.processed_count(), 0);
        assert!(!state_path.exists());

        // Once the store recovers, the row goes through
        engine.store.fail_appends(false);
        assert_eq!(engine.poll().await.unwrap(), 1);
        assert_eq!(engine.processed_count(), 1);
    }

    #[tokio::test]
    async fn test_partial_cycle_keeps_rows_appended_before_failure() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.set_sheet(
            SOURCE,
            vec![approved_row("ACME-42"), approved_row("ACME-43")],
        );

        let mut engine = SyncEngine::new(test_config(&dir.path().join("state.json")), store).unwrap();

        // First row appends, then the store starts failing
        assert_eq!(engine.poll().await.unwrap(), 2);
        engine.store.set_sheet(SOURCE, vec![approved_row("ACME-42"), approved_row("ACME-43"), approved_row("ACME-44")]);
        engine.store.fail_appends(true);

        assert!(engine.poll().await.is_err());
        // The two earlier signatures are still recorded
        assert_eq!(engine.processed_count(), 2);
    }

    #[tokio::test]
    async fn test_deleted_row_can_be_resynced() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_with_rows(&dir, vec![approved_row("ACME-42")]);

        assert_eq!(engine.poll().await.unwrap(), 1);

        // Row deleted from the source: its signature is pruned
        engine.store.set_sheet(SOURCE, vec![]);
        assert_eq!(engine.poll().await.unwrap(), 0);
        assert_eq!(engine.processed_count(), 0);

        // Identical content re-added later counts as new
        engine.store.set_sheet(SOURCE, vec![approved_row("ACME-42")]);
        assert_eq!(engine.poll().await.unwrap(), 1);
        assert_eq!(engine.store.sheet(TARGET).len(), 2);
    }

    #[tokio::test]
    async fn test_reconciliation_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        let state_path = dir.path().join("state.json");
        let store = MemoryStore::new();
        store.set_sheet(SOURCE, vec![approved_row("ACME-42")]);

        let mut config = test_config(&state_path);
        config.reconcile_deleted = false;
        let mut engine = SyncEngine::new(config, store).unwrap();

        assert_eq!(engine.poll().await.unwrap(), 1);

        engine.store.set_sheet(SOURCE, vec![]);
        assert_eq!(engine.poll().await.unwrap(), 0);
        // Signature survives the deletion
        assert_eq!(engine.processed_count(), 1);
    }

    #[tokio::test]
    async fn test_state_survives_engine_restart() {
        let dir = TempDir::new().unwrap();
        let state_path = dir.path().join("state.json");

        let store = MemoryStore::new();
        store.set_sheet(SOURCE, vec![approved_row("ACME-42")]);
        let mut engine = SyncEngine::new(test_config(&state_path), store).unwrap();
        assert_eq!(engine.poll().await.unwrap(), 1);

        // New engine over the same state file sees the signature
        let store = MemoryStore::new();
        store.set_sheet(SOURCE, vec![approved_row("ACME-42")]);
        let mut engine = SyncEngine::new(test_config(&state_path), store).unwrap();
        assert_eq!(engine.processed_count(), 1);
        assert_eq!(engine.poll().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_approval_matching_is_trimmed_and_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let mut row = approved_row("ACME-42");
        row.0[DEFAULT_APPROVAL_COLUMN] = "  ОДОБРЕНА  ".to_string();
        let mut engine = engine_with_rows(&dir, vec![row]);

        assert_eq!(engine.poll().await.unwrap(), 1);
    }
}
