//! SQLite-backed record source
//!
//! Reads a source table (or view) page by page with keyset pagination.
//! The database is opened read-only; busy and locked conditions are
//! classified as transient so the extractor reconnects instead of failing.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, OpenFlags};

use super::{RecordSource, SourceConnector};
use crate::error::{ExtractError, Result};
use crate::models::{FieldValue, RawRow};
use crate::schema::RecordSchema;

/// Record source reading one table of a SQLite database.
#[derive(Debug)]
pub struct SqliteSource {
    conn: Connection,
    schema: RecordSchema,
    path: PathBuf,
    page_sql: String,
    count_sql: String,
}

impl SqliteSource {
    /// Open a database read-only and prepare page queries for `schema`.
    ///
    /// # Errors
    /// Returns a transient [`ExtractError::Connection`] if the file cannot
    /// be opened or the database is locked, so callers may retry.
    pub fn open(path: impl AsRef<Path>, schema: RecordSchema) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&path, flags).map_err(classify)?;

        let key = schema.key_column();
        let page_sql = format!(
            "SELECT {} FROM \"{}\" WHERE \"{key}\" > ?1 ORDER BY \"{key}\" ASC LIMIT ?2",
            schema.select_list(),
            schema.table_name(),
        );
        let count_sql = format!("SELECT COUNT(*) FROM \"{}\"", schema.table_name());

        Ok(Self {
            conn,
            schema,
            path,
            page_sql,
            count_sql,
        })
    }

    /// Path of the underlying database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for SqliteSource {
    fn name(&self) -> String {
        format!("{} ({})", self.schema.table_name(), self.path.display())
    }

    fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    fn total_count(&mut self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row(&self.count_sql, [], |row| row.get(0))
            .map_err(classify)?;
        Ok(count.max(0) as u64)
    }

    fn fetch_page(&mut self, last_key: i64, limit: usize) -> Result<Vec<RawRow>> {
        let mut stmt = self.conn.prepare_cached(&self.page_sql).map_err(classify)?;
        let mut rows = stmt
            .query(rusqlite::params![last_key, limit as i64])
            .map_err(classify)?;

        let mut page = Vec::with_capacity(limit);
        while let Some(row) = rows.next().map_err(classify)? {
            page.push(row_to_raw(row, self.schema.key_index(), self.schema.len())?);
        }
        Ok(page)
    }
}

/// Connector that opens [`SqliteSource`] instances for one database file.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
    schema: RecordSchema,
}

impl SqliteConnector {
    /// Connector for `schema` stored in the database at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, schema: RecordSchema) -> Self {
        Self {
            path: path.into(),
            schema,
        }
    }
}

impl SourceConnector for SqliteConnector {
    type Source = SqliteSource;

    fn connect(&self) -> Result<SqliteSource> {
        SqliteSource::open(&self.path, self.schema.clone())
    }
}

/// Lift a database error, marking lock and open failures as transient.
fn classify(err: rusqlite::Error) -> ExtractError {
    match &err {
        rusqlite::Error::SqliteFailure(code, message) => match code.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen => {
                ExtractError::connection(
                    message
                        .clone()
                        .unwrap_or_else(|| format!("{:?}", code.code)),
                )
            }
            _ => ExtractError::Database(err),
        },
        _ => ExtractError::Database(err),
    }
}

fn row_to_raw(row: &rusqlite::Row<'_>, key_index: usize, width: usize) -> Result<RawRow> {
    let mut values = Vec::with_capacity(width);
    for idx in 0..width {
        values.push(field_from_ref(row.get_ref(idx)?));
    }
    let key = match values.get(key_index) {
        Some(FieldValue::Int(key)) => *key,
        other => {
            return Err(ExtractError::Schema(format!(
                "key column holds non-integer value: {other:?}"
            )));
        }
    };
    Ok(RawRow::new(key, values))
}

fn field_from_ref(value: ValueRef<'_>) -> FieldValue {
    match value {
        ValueRef::Null => FieldValue::Null,
        ValueRef::Integer(v) => FieldValue::Int(v),
        ValueRef::Real(v) => FieldValue::Float(v),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            FieldValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
