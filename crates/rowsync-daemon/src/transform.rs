//! Row transformation
//!
//! Projects a fixed subset of source columns into the destination column
//! order and normalizes the trailing date cell. The mapping is a plain
//! index table taken from configuration, not logic.

use crate::row::Row;
use chrono::{Duration, NaiveDate};
use tracing::{debug, warn};

/// Epoch of spreadsheet serial dates: day 0 is 1899-12-30
const SERIAL_DATE_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Destination date format
const DATE_FORMAT: &str = "%d.%m.%Y";

/// Maps a raw source row to a destination row
#[derive(Debug, Clone)]
pub struct RowTransformer {
    mapping: Vec<usize>,
    serial_min: f64,
    serial_max: f64,
}

impl RowTransformer {
    /// Create a transformer from the configured mapping table and
    /// serial-date plausibility bounds
    pub fn new(mapping: Vec<usize>, serial_min: f64, serial_max: f64) -> Self {
        Self {
            mapping,
            serial_min,
            serial_max,
        }
    }

    /// Transform a source row into a destination row
    ///
    /// Destination column i takes source column `mapping[i]`; cells the
    /// source row does not carry become empty strings. The last destination
    /// cell carries a date and may arrive as a spreadsheet serial number,
    /// in which case it is rewritten as DD.MM.YYYY. Conversion failure is
    /// non-fatal: the original text is kept.
    pub fn transform(&self, row: &Row) -> Row {
        let mut cells: Vec<String> = self
            .mapping
            .iter()
            .map(|&idx| row.cell(idx).to_string())
            .collect();

        if let Some(last) = cells.last_mut() {
            if let Some(converted) = self.normalize_serial_date(last) {
                debug!(from = %last, to = %converted, "Converted serial date");
                *last = converted;
            }
        }

        Row(cells)
    }

    /// Convert a plausible serial-date cell to a DD.MM.YYYY string
    ///
    /// A cell is a candidate when its text, with all '.' characters
    /// removed, is non-empty and entirely ASCII digits, and its numeric
    /// value falls strictly between the configured bounds. Returns None
    /// when the cell should be left untouched.
    fn normalize_serial_date(&self, text: &str) -> Option<String> {
        let digits: String = text.chars().filter(|&c| c != '.').collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let value: f64 = match text.parse() {
            Ok(value) => value,
            Err(_) => return None,
        };

        if value <= self.serial_min || value >= self.serial_max {
            return None;
        }

        match serial_to_date(value as i64) {
            Some(date) => Some(date.format(DATE_FORMAT).to_string()),
            None => {
                warn!(value = %text, "Serial date out of calendar range, keeping original text");
                None
            },
        }
    }
}

/// Add a day count to the 1899-12-30 epoch
fn serial_to_date(days: i64) -> Option<NaiveDate> {
    let (y, m, d) = SERIAL_DATE_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    epoch.checked_add_signed(Duration::days(days))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn transformer() -> RowTransformer {
        RowTransformer::new(vec![1, 2, 9, 3, 7, 11, 12, 13, 5], 10_000.0, 50_000.0)
    }

    fn source_row() -> Row {
        Row::new([
            "0", "ACME-42", "Widget", "3", "одобрена", "45000", "6", "unit", "8", "note", "10",
            "11", "12", "13",
        ])
    }

    #[test]
    fn test_projection_follows_mapping() {
        let out = transformer().transform(&source_row());
        assert_eq!(
            out,
            Row::new([
                "ACME-42",
                "Widget",
                "note",
                "3",
                "unit",
                "11",
                "12",
                "13",
                "15.03.2023"
            ])
        );
    }

    #[test]
    fn test_ragged_rows_project_empty_cells() {
        let out = transformer().transform(&Row::new(["0", "ACME-42", "Widget"]));
        assert_eq!(out, Row::new(["ACME-42", "Widget", "", "", "", "", "", "", ""]));
    }

    #[test]
    fn test_serial_date_in_range_converts() {
        let t = transformer();
        assert_eq!(t.normalize_serial_date("45000"), Some("15.03.2023".to_string()));
    }

    #[test]
    fn test_serial_date_below_bound_is_kept() {
        assert_eq!(transformer().normalize_serial_date("5"), None);
    }

    #[test]
    fn test_serial_date_above_bound_is_kept() {
        assert_eq!(transformer().normalize_serial_date("99999"), None);
    }

    #[test]
    fn test_bounds_are_exclusive() {
        let t = transformer();
        assert_eq!(t.normalize_serial_date("10000"), None);
        assert_eq!(t.normalize_serial_date("50000"), None);
        assert!(t.normalize_serial_date("10001").is_some());
        assert!(t.normalize_serial_date("49999").is_some());
    }

    #[test]
    fn test_non_numeric_text_is_kept() {
        let t = transformer();
        assert_eq!(t.normalize_serial_date("27.03.2023 (утв.)"), None);
        assert_eq!(t.normalize_serial_date(""), None);
        assert_eq!(t.normalize_serial_date("45000 дней"), None);
    }

    #[test]
    fn test_dotted_date_string_is_kept() {
        // "27.03.2023" strips to digits but parses as f64 garbage; the
        // original text must survive.
        let t = transformer();
        assert_eq!(t.normalize_serial_date("27.03.2023"), None);
    }

    #[test]
    fn test_epoch_arithmetic() {
        assert_eq!(
            serial_to_date(45000),
            NaiveDate::from_ymd_opt(2023, 3, 15)
        );
        assert_eq!(serial_to_date(2), NaiveDate::from_ymd_opt(1900, 1, 1));
    }
}
