//! Rows, signatures, and key projections
//!
//! A row is an ordered sequence of string cells. Rows are sparse: a row may
//! carry fewer cells than the sheet is wide, and a missing cell reads as an
//! empty string rather than an error.

use serde::{Deserialize, Serialize};

/// Separator used when a signature is composed from multiple cells
pub const SIGNATURE_SEPARATOR: &str = "|";

/// One source or destination row
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Row(pub Vec<String>);

impl Row {
    /// Create a row from anything iterable as strings
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(cells.into_iter().map(Into::into).collect())
    }

    /// Cell at `idx`, or "" when the row is too short
    pub fn cell(&self, idx: usize) -> &str {
        self.0.get(idx).map(String::as_str).unwrap_or("")
    }

    /// True when every cell is an empty string (or there are no cells)
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|c| c.is_empty())
    }

    /// Number of cells actually present
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the row carries no cells at all
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for Row {
    fn from(cells: Vec<String>) -> Self {
        Self(cells)
    }
}

/// Stable key identifying a source row for dedup purposes
///
/// Serialized as a plain JSON string so the persisted state file stays a
/// human-inspectable array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowSignature(pub String);

impl RowSignature {
    /// The primary-key projection of this signature: the first separator
    /// segment, trimmed. For single-column signatures this is the whole key.
    pub fn primary_key(&self) -> &str {
        self.0
            .split(SIGNATURE_SEPARATOR)
            .next()
            .unwrap_or("")
            .trim()
    }
}

impl std::fmt::Display for RowSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a row signature is derived from a row
///
/// The column list is configuration. It must never include the approval
/// column: cells that legitimately change after approval would make the
/// signature unstable and cause missed or duplicate transfers.
#[derive(Debug, Clone)]
pub struct SignatureScheme {
    columns: Vec<usize>,
}

impl SignatureScheme {
    /// Build a scheme over the given source column indices
    pub fn new(columns: Vec<usize>) -> Self {
        Self { columns }
    }

    /// Derive the signature for a row
    ///
    /// A single configured column yields that cell's text verbatim; several
    /// columns are joined with [`SIGNATURE_SEPARATOR`].
    pub fn signature_of(&self, row: &Row) -> RowSignature {
        let key = self
            .columns
            .iter()
            .map(|&idx| row.cell(idx))
            .collect::<Vec<_>>()
            .join(SIGNATURE_SEPARATOR);
        RowSignature(key)
    }
}

/// Trimmed text of the primary-key cell, used by reconciliation to decide
/// whether a signature's source row still exists
pub fn primary_key_of(row: &Row, column: usize) -> String {
    row.cell(column).trim().to_string()
}
