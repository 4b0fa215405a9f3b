//! Row sanitization for export targets
//!
//! Source text fields arrive with embedded NUL bytes, carriage returns and
//! runs of whitespace that break CSV consumers downstream. The sanitizer
//! normalizes every text field to a single-spaced, newline-free string and
//! renders missing values as empty strings.

use itertools::Itertools;
use rayon::prelude::*;

use crate::models::{CleanRow, FieldValue, RawRow};

/// Normalizes raw source rows into clean, exportable rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowSanitizer;

impl RowSanitizer {
    /// Create a sanitizer with default behavior.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Clean a single text value.
    ///
    /// Strips NUL bytes, then collapses every run of whitespace (including
    /// `\r\n` pairs and bare `\r` or `\n`) into a single space. Leading and
    /// trailing whitespace is removed as a consequence.
    #[must_use]
    pub fn clean_text(&self, value: &str) -> String {
        let stripped: String;
        let without_nul = if value.contains('\u{0}') {
            stripped = value.replace('\u{0}', "");
            stripped.as_str()
        } else {
            value
        };
        without_nul.split_whitespace().join(" ")
    }

    /// Render a field value as clean text. Missing values become `""`.
    #[must_use]
    pub fn clean_value(&self, value: &FieldValue) -> String {
        match value {
            FieldValue::Null => String::new(),
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Float(v) => v.to_string(),
            FieldValue::Text(text) => self.clean_text(text),
        }
    }

    /// Clean every field of a row, preserving the key.
    #[must_use]
    pub fn clean_row(&self, row: &RawRow) -> CleanRow {
        CleanRow {
            key: row.key,
            values: row.values.iter().map(|v| self.clean_value(v)).collect(),
        }
    }

    /// Clean a chunk of rows in parallel, preserving order.
    #[must_use]
    pub fn clean_chunk(&self, rows: &[RawRow]) -> Vec<CleanRow> {
        rows.par_iter().map(|row| self.clean_row(row)).collect()
    }
}
