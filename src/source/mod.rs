//! Record sources for chunked extraction
//!
//! A [`RecordSource`] serves rows in ascending key order, one page at a
//! time, using keyset pagination: every page asks for rows with a key
//! strictly greater than the last key the caller has seen. Sources are
//! created through a [`SourceConnector`] so a lost connection can be
//! replaced mid-run without losing the cursor position.

pub mod memory;
pub mod sqlite;

use crate::error::Result;
use crate::models::RawRow;
use crate::schema::RecordSchema;

/// A paged record source ordered by its key column.
pub trait RecordSource {
    /// Human-readable source name for logs.
    fn name(&self) -> String;

    /// Schema of the records this source yields.
    fn schema(&self) -> &RecordSchema;

    /// Total number of rows in the source, for progress reporting.
    ///
    /// # Errors
    /// Returns an error if the count query fails.
    fn total_count(&mut self) -> Result<u64>;

    /// Fetch up to `limit` rows whose key is strictly greater than
    /// `last_key`, in ascending key order. An empty page means the source
    /// is exhausted.
    ///
    /// # Errors
    /// Returns an error if the page query fails. Transient errors should be
    /// surfaced as [`crate::error::ExtractError::Connection`] so callers
    /// can reconnect and retry.
    fn fetch_page(&mut self, last_key: i64, limit: usize) -> Result<Vec<RawRow>>;
}

/// Factory for [`RecordSource`] connections.
///
/// The extractor connects once at startup and reconnects through the same
/// connector after a transient failure, resuming from the last committed
/// key.
pub trait SourceConnector {
    /// Source type produced by this connector.
    type Source: RecordSource;

    /// Open a fresh connection to the source.
    ///
    /// # Errors
    /// Returns an error if the source cannot be reached or opened.
    fn connect(&self) -> Result<Self::Source>;
}
