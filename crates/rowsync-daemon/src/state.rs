//! Persisted signature state
//!
//! The processed set is the sole source of truth for "already synced". It is
//! stored as a JSON array of signature strings, UTF-8 and human-inspectable.
//! Load failures degrade to an empty set: the only risk is duplicate copies
//! on the destination, never data loss. Saves go through a sibling temp file
//! and an atomic rename so a crash mid-write cannot truncate good state.

use crate::row::RowSignature;
use rowsync_common::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extension of the temporary file written before the atomic rename
const TMP_EXTENSION: &str = "tmp";

/// Persistent set of row signatures already transferred
#[derive(Debug, Clone)]
pub struct SignatureStore {
    path: PathBuf,
}

impl SignatureStore {
    /// Create a store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the persisted state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted set
    ///
    /// An absent file yields an empty set. An unreadable or unparseable
    /// file is logged and also yields an empty set; re-syncing everything
    /// is safe because destination-side duplicates are the only risk.
    pub fn load(&self) -> HashSet<RowSignature> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No persisted state, starting empty");
            return HashSet::new();
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read persisted state, starting empty"
                );
                return HashSet::new();
            },
        };

        match serde_json::from_str::<Vec<RowSignature>>(&content) {
            Ok(signatures) => signatures.into_iter().collect(),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Persisted state is corrupt, starting empty"
                );
                HashSet::new()
            },
        }
    }

    /// Persist the set, overwriting previous state atomically
    ///
    /// Serializes to `<path>.tmp` in the same directory, then renames over
    /// the target so readers never observe a partially-written file.
    pub fn save(&self, signatures: &HashSet<RowSignature>) -> Result<()> {
        let mut ordered: Vec<&RowSignature> = signatures.iter().collect();
        ordered.sort_by(|a, b| a.0.cmp(&b.0));

        let content = serde_json::to_string_pretty(&ordered)?;
        let tmp_path = self.path.with_extension(TMP_EXTENSION);

        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;

        debug!(
            path = %self.path.display(),
            count = signatures.len(),
            "Persisted signature state"
        );
        Ok(())
    }
}

/// Drop signatures whose source row no longer exists
///
/// A signature survives iff its primary-key projection appears in
/// `live_keys` (the trimmed primary-key cells of the rows currently in the
/// source sheet). Deleting a row and later re-adding identical content thus
/// makes it eligible again.
pub fn reconcile(
    current: &HashSet<RowSignature>,
    live_keys: &HashSet<String>,
) -> HashSet<RowSignature> {
    current
        .iter()
        .filter(|sig| live_keys.contains(sig.primary_key()))
        .cloned()
        .collect()
}
