//! Record schema definitions for extraction sources and sinks.
//!
//! A [`RecordSchema`] names the key column and the full ordered column list
//! of a source table. Column storage types are inferred from naming
//! conventions via [`ColumnType::infer`], so sinks can create typed tables
//! without a round trip to the source catalog.

pub mod birth;

use itertools::Itertools;

/// Storage type assigned to a column in a typed sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Integer affinity. Keys, foreign keys and ages.
    Integer,
    /// Timestamp affinity. Event dates and audit times.
    Timestamp,
    /// Text affinity. Everything else.
    Text,
}

impl ColumnType {
    /// Infer a column type from its name.
    ///
    /// Age columns are matched before date columns so that
    /// `mother_age_at_birth` lands on `Integer` rather than `Timestamp`
    /// (the `_at` suffix would otherwise capture it). Typed ages matter:
    /// numeric comparisons against text-affinity columns are silently
    /// false in SQLite.
    #[must_use]
    pub fn infer(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.ends_with("_age_at_birth") || lower.ends_with("_age") {
            return Self::Integer;
        }
        if lower.contains("_date") || lower.starts_with("date_") || lower.ends_with("_at") {
            return Self::Timestamp;
        }
        if lower.contains("_id") {
            return Self::Integer;
        }
        Self::Text
    }

    /// SQL type name used in `CREATE TABLE` statements.
    #[must_use]
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Timestamp => "TIMESTAMP",
            Self::Text => "TEXT",
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name as it appears in the source table.
    pub name: String,
    /// Inferred storage type.
    pub column_type: ColumnType,
}

impl Column {
    /// Create a column, inferring its type from the name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let column_type = ColumnType::infer(&name);
        Self { name, column_type }
    }
}

/// Ordered column list for one source table, with a designated key column.
///
/// The key column must be part of the column list and is the pagination
/// cursor for chunked extraction.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    table_name: String,
    key_column: String,
    columns: Vec<Column>,
    key_index: usize,
}

impl RecordSchema {
    /// Build a schema from a table name, key column and ordered column names.
    ///
    /// # Panics
    ///
    /// Panics if `key_column` is not present in `column_names`. Schemas are
    /// constructed from static column lists, so a missing key is a
    /// programming error rather than a runtime condition.
    #[must_use]
    pub fn new<S: Into<String>>(
        table_name: impl Into<String>,
        key_column: impl Into<String>,
        column_names: impl IntoIterator<Item = S>,
    ) -> Self {
        let key_column = key_column.into();
        let columns = column_names
            .into_iter()
            .map(|name| Column::new(name.into()))
            .collect_vec();
        let key_index = columns
            .iter()
            .position(|c| c.name == key_column)
            .unwrap_or_else(|| panic!("key column `{key_column}` missing from schema"));
        Self {
            table_name: table_name.into(),
            key_column,
            columns,
            key_index,
        }
    }

    /// Source table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Pagination key column name.
    #[must_use]
    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    /// Position of the key column within [`Self::columns`].
    #[must_use]
    pub const fn key_index(&self) -> usize {
        self.key_index
    }

    /// All columns in source order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in source order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect_vec()
    }

    /// Position of a column by name, if present.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Whether the schema contains a column with this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Comma-separated, quoted column list for SELECT statements.
    #[must_use]
    pub fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("\"{}\"", c.name))
            .join(", ")
    }
}
