//! Error handling for the extraction and validation pipeline.

/// Specialized error type for extraction and validation operations
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Error opening, reading or writing a file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the embedded database (source table, sink table or
    /// validation queries)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Error writing delimited output
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Lost or unusable connection to the record source. Retried with a
    /// reconnect, reusing the last committed key.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the underlying connectivity failure
        message: String,
    },

    /// Error in rule or pipeline configuration (unknown category, bad
    /// threshold file, invalid selector)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error with the record schema (unknown column, empty column list)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Any other error, usually carrying call-site context
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExtractError {
    /// Whether a reconnect-and-retry with the same cursor position can
    /// plausibly succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Shorthand for a connection loss
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

/// Result type for extraction and validation operations
pub type Result<T> = std::result::Result<T, ExtractError>;
