//! Core data types shared across the extraction pipeline.

/// A single typed value read from the record source
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// SQL NULL
    Null,
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
}

impl FieldValue {
    /// True when the value is SQL NULL
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Render the value as unsanitized text. NULL renders as the empty
    /// string, matching the flat-file convention of the outputs.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Int(n) => n.to_string(),
            Self::Float(x) => x.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// One row fetched from the record source, keyed by its primary identifier
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Value of the primary key column, duplicated from `values[0]` for
    /// cursor arithmetic
    pub key: i64,
    /// Column values in schema order (the key column included)
    pub values: Vec<FieldValue>,
}

impl RawRow {
    /// Build a row from its key and values
    #[must_use]
    pub fn new(key: i64, values: Vec<FieldValue>) -> Self {
        Self { key, values }
    }
}

/// A sanitized row ready for any sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanRow {
    /// Value of the primary key column
    pub key: i64,
    /// Cleaned column values in schema order
    pub values: Vec<String>,
}
