//! CSV record sink
//!
//! Appends sanitized rows to a delimited file. The header is written
//! exactly once: only when the sink opens a file that does not exist yet
//! or is still empty, so resumed runs never repeat it.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, WriterBuilder};

use super::RecordSink;
use crate::error::{ExtractError, Result};
use crate::models::CleanRow;
use crate::schema::RecordSchema;
use crate::utils::ensure_parent_dir;

/// UTF-8 byte order mark, written before the header when requested.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

const WRITE_BUFFER_SIZE: usize = 65_536;

/// Quoting and line-ending convention of the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsvStyle {
    /// Quote only fields that need it, CRLF line endings. Matches the
    /// spreadsheet-oriented exports consumers already ingest.
    #[default]
    Minimal,
    /// Quote every field, LF line endings. Safer for downstream bulk
    /// loaders that split on raw newlines.
    QuoteAll,
}

/// Sink appending rows to one CSV file.
pub struct CsvSink {
    path: PathBuf,
    style: CsvStyle,
    bom: bool,
    writer: Option<csv::Writer<BufWriter<std::fs::File>>>,
}

impl CsvSink {
    /// Sink writing to `path` with [`CsvStyle::Minimal`] and no BOM.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            style: CsvStyle::default(),
            bom: false,
            writer: None,
        }
    }

    /// Select the quoting and line-ending style.
    #[must_use]
    pub const fn with_style(mut self, style: CsvStyle) -> Self {
        self.style = style;
        self
    }

    /// Write a UTF-8 BOM at the start of a freshly created file. Some
    /// spreadsheet tools need it to pick the right encoding.
    #[must_use]
    pub const fn with_bom(mut self, bom: bool) -> Self {
        self.bom = bom;
        self
    }

    /// Path of the output file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> Result<&mut csv::Writer<BufWriter<std::fs::File>>> {
        self.writer
            .as_mut()
            .ok_or_else(|| ExtractError::Config("CSV sink used before setup".to_string()))
    }
}

impl RecordSink for CsvSink {
    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }

    fn output_path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn setup(&mut self, schema: &RecordSchema) -> Result<()> {
        ensure_parent_dir(&self.path)?;
        let fresh = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if fresh && self.bom {
            file.write_all(UTF8_BOM)?;
        }

        let buffered = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
        let (quote_style, terminator) = match self.style {
            CsvStyle::Minimal => (QuoteStyle::Necessary, Terminator::CRLF),
            CsvStyle::QuoteAll => (QuoteStyle::Always, Terminator::Any(b'\n')),
        };
        let mut writer = WriterBuilder::new()
            .quote_style(quote_style)
            .terminator(terminator)
            .from_writer(buffered);

        if fresh {
            writer.write_record(schema.column_names())?;
        }
        self.writer = Some(writer);
        Ok(())
    }

    fn write_chunk(&mut self, rows: &[CleanRow]) -> Result<()> {
        let writer = self.writer()?;
        for row in rows {
            writer.write_record(&row.values)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}
