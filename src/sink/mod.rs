//! Record sinks for extraction output
//!
//! A [`RecordSink`] receives sanitized rows chunk by chunk. Sinks are set
//! up once with the source schema, then written in extraction order. The
//! [`FanoutSink`] composes several sinks so one extraction pass can feed a
//! flat file and a queryable database at the same time.

pub mod csv;
pub mod sqlite;

use std::path::Path;

use crate::error::Result;
use crate::models::CleanRow;
use crate::schema::RecordSchema;

/// Destination for sanitized record chunks.
pub trait RecordSink {
    /// Short description of the destination for logs.
    fn describe(&self) -> String;

    /// Primary output path when the destination is a file. Checkpoints
    /// record it as their output identity; non-file sinks return `None`.
    fn output_path(&self) -> Option<&Path> {
        None
    }

    /// Prepare the destination for rows of `schema`. Called once before
    /// the first chunk; must be safe to call on an output that already has
    /// rows from a previous run.
    ///
    /// # Errors
    /// Returns an error if the destination cannot be prepared.
    fn setup(&mut self, schema: &RecordSchema) -> Result<()>;

    /// Append one chunk of rows.
    ///
    /// # Errors
    /// Returns an error if the chunk cannot be written.
    fn write_chunk(&mut self, rows: &[CleanRow]) -> Result<()>;

    /// Flush buffered rows to durable storage.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    fn flush(&mut self) -> Result<()>;
}

/// Sink that forwards every call to a list of inner sinks, in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn RecordSink>>,
}

impl FanoutSink {
    /// Fanout over `sinks`. Chunks are written to each in the given order.
    #[must_use]
    pub fn new(sinks: Vec<Box<dyn RecordSink>>) -> Self {
        Self { sinks }
    }

    /// Add another destination.
    pub fn push(&mut self, sink: Box<dyn RecordSink>) {
        self.sinks.push(sink);
    }

    /// Number of inner sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether the fanout has no destinations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl RecordSink for FanoutSink {
    fn describe(&self) -> String {
        use itertools::Itertools;
        self.sinks.iter().map(|s| s.describe()).join(" + ")
    }

    fn output_path(&self) -> Option<&Path> {
        self.sinks.iter().find_map(|s| s.output_path())
    }

    fn setup(&mut self, schema: &RecordSchema) -> Result<()> {
        for sink in &mut self.sinks {
            sink.setup(schema)?;
        }
        Ok(())
    }

    fn write_chunk(&mut self, rows: &[CleanRow]) -> Result<()> {
        for sink in &mut self.sinks {
            sink.write_chunk(rows)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}
