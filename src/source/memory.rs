//! In-memory record source
//!
//! Backs tests and embedded use with the same paging contract as the
//! database sources. Rows live in a shared ordered map, so cloned
//! connections observe the same data. An optional overlap mode replays the
//! tail of the previous page, mimicking sources with at-least-once
//! delivery.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use super::{RecordSource, SourceConnector};
use crate::error::Result;
use crate::models::RawRow;
use crate::schema::RecordSchema;

/// Record source serving rows from memory in key order.
#[derive(Debug, Clone)]
pub struct MemorySource {
    rows: Arc<BTreeMap<i64, RawRow>>,
    schema: RecordSchema,
    overlap: usize,
}

impl MemorySource {
    /// Source over `rows`, keyed and ordered by [`RawRow::key`].
    #[must_use]
    pub fn new(schema: RecordSchema, rows: impl IntoIterator<Item = RawRow>) -> Self {
        let rows = rows.into_iter().map(|row| (row.key, row)).collect();
        Self {
            rows: Arc::new(rows),
            schema,
            overlap: 0,
        }
    }

    /// Replay the last `overlap` already-served rows at the front of every
    /// page that has fresh rows. Exhausted cursors still yield an empty
    /// page so extraction terminates.
    #[must_use]
    pub const fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    /// Number of rows in the source.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the source holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RecordSource for MemorySource {
    fn name(&self) -> String {
        format!("{} (memory)", self.schema.table_name())
    }

    fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    fn total_count(&mut self) -> Result<u64> {
        Ok(self.rows.len() as u64)
    }

    fn fetch_page(&mut self, last_key: i64, limit: usize) -> Result<Vec<RawRow>> {
        let fresh: Vec<RawRow> = self
            .rows
            .range((Bound::Excluded(last_key), Bound::Unbounded))
            .take(limit)
            .map(|(_, row)| row.clone())
            .collect();
        if fresh.is_empty() {
            return Ok(Vec::new());
        }

        let mut page: Vec<RawRow> = self
            .rows
            .range(..=last_key)
            .rev()
            .take(self.overlap)
            .map(|(_, row)| row.clone())
            .collect();
        page.reverse();
        page.extend(fresh);
        Ok(page)
    }
}

/// Connector handing out clones of a template [`MemorySource`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    template: MemorySource,
}

impl MemoryConnector {
    /// Connector for a shared in-memory source.
    #[must_use]
    pub const fn new(template: MemorySource) -> Self {
        Self { template }
    }
}

impl SourceConnector for MemoryConnector {
    type Source = MemorySource;

    fn connect(&self) -> Result<MemorySource> {
        Ok(self.template.clone())
    }
}
