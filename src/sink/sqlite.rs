//! SQLite record sink
//!
//! Loads sanitized rows into a local, queryable database. The destination
//! table carries a unique index on the key column and rows are written
//! with `INSERT OR REPLACE`, so re-extracting a key range after a crash
//! converges on one row per key instead of accumulating duplicates.

use std::path::{Path, PathBuf};

use itertools::Itertools;
use rusqlite::Connection;
use rusqlite::types::Value;

use super::RecordSink;
use crate::error::{ExtractError, Result};
use crate::models::CleanRow;
use crate::schema::{ColumnType, RecordSchema};
use crate::utils::ensure_parent_dir;

/// Audit column added to every destination table.
const CREATED_AT_COLUMN: &str = "created_at";

/// Sink loading rows into one table of a SQLite database.
pub struct SqliteSink {
    path: PathBuf,
    conn: Option<Connection>,
    insert_sql: String,
    column_types: Vec<ColumnType>,
}

impl SqliteSink {
    /// Sink writing to the database file at `path`. The table name comes
    /// from the schema passed to [`RecordSink::setup`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: None,
            insert_sql: String::new(),
            column_types: Vec::new(),
        }
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for SqliteSink {
    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }

    fn output_path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn setup(&mut self, schema: &RecordSchema) -> Result<()> {
        if schema.is_empty() {
            return Err(ExtractError::Schema(
                "cannot create a table without columns".to_string(),
            ));
        }
        ensure_parent_dir(&self.path)?;
        let conn = Connection::open(&self.path)?;

        // journal_mode returns a result row, the others do not.
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = 10000;
             PRAGMA page_size = 4096;",
        )?;

        let table = schema.table_name().to_string();
        let column_defs = schema
            .columns()
            .iter()
            .map(|col| format!("\"{}\" {}", col.name, col.column_type.sql_name()))
            .join(", ");
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" ({column_defs}, \
             \"{CREATED_AT_COLUMN}\" TIMESTAMP DEFAULT CURRENT_TIMESTAMP)"
        ))?;

        let key = schema.key_column();
        conn.execute_batch(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_{} ON \"{table}\" (\"{key}\")",
            key.to_lowercase()
        ))?;

        let placeholders = (1..=schema.len()).map(|n| format!("?{n}")).join(", ");
        self.insert_sql = format!(
            "INSERT OR REPLACE INTO \"{table}\" ({}) VALUES ({placeholders})",
            schema.select_list()
        );
        self.column_types = schema.columns().iter().map(|c| c.column_type).collect();
        self.conn = Some(conn);
        Ok(())
    }

    fn write_chunk(&mut self, rows: &[CleanRow]) -> Result<()> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| ExtractError::Config("SQLite sink used before setup".to_string()))?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.insert_sql)?;
            for row in rows {
                let params = row
                    .values
                    .iter()
                    .zip(&self.column_types)
                    .map(|(value, ty)| bind_value(value, *ty));
                stmt.execute(rusqlite::params_from_iter(params))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.as_ref() {
            conn.query_row("PRAGMA wal_checkpoint(PASSIVE)", [], |_| Ok(()))?;
        }
        Ok(())
    }
}

/// Convert a cleaned text value into a bind parameter.
///
/// Empty strings become NULL so blank source fields do not masquerade as
/// values in numeric comparisons. Integer columns try a numeric parse and
/// fall back to text, leaving malformed source content visible rather
/// than silently zeroed.
fn bind_value(value: &str, column_type: ColumnType) -> Value {
    if value.is_empty() {
        return Value::Null;
    }
    match column_type {
        ColumnType::Integer => value
            .parse::<i64>()
            .map_or_else(|_| Value::Text(value.to_string()), Value::Integer),
        ColumnType::Timestamp | ColumnType::Text => Value::Text(value.to_string()),
    }
}
