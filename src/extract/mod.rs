//! Chunked, resumable record extraction
//!
//! The extractor pulls pages from a [`RecordSource`] with keyset
//! pagination, sanitizes them, filters duplicate keys and appends the
//! remainder to a [`RecordSink`]. After every page it persists a
//! [`ResumeState`], so the next run continues behind the last committed
//! key. The loop terminates only when the source returns an empty page;
//! pages that dedup down to nothing still advance the cursor.
//!
//! Transient source failures are retried with a fresh connection from the
//! [`SourceConnector`], reusing the last committed key. The retry budget
//! resets after every successful fetch, so a long run survives many
//! isolated drops while a persistently dead source still fails fast.

use std::time::{Duration, Instant};

use itertools::Itertools;
use rustc_hash::FxHashSet;

use crate::checkpoint::{CheckpointFile, ResumeState};
use crate::config::ExtractConfig;
use crate::error::{ExtractError, Result};
use crate::sanitize::RowSanitizer;
use crate::sink::RecordSink;
use crate::source::{RecordSource, SourceConnector};
use crate::utils::progress::{create_main_progress_bar, finish_progress_bar};

/// Outcome of one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    /// Rows written across all runs, including previous resumed ones.
    pub total_rows: u64,
    /// Rows written by this run alone.
    pub rows_this_run: u64,
    /// Key the run resumed behind. `0` for a fresh extraction.
    pub resumed_from: i64,
    /// Highest key committed when the source was exhausted.
    pub last_key: i64,
    /// Non-empty pages fetched by this run.
    pub pages: u64,
    /// Wall-clock duration of this run.
    pub elapsed: Duration,
}

/// Drives a source-to-sink extraction with checkpointed resume.
pub struct ChunkedExtractor<C: SourceConnector, S: RecordSink> {
    connector: C,
    sink: S,
    checkpoint: CheckpointFile,
    config: ExtractConfig,
    sanitizer: RowSanitizer,
    committed_key: i64,
    total_rows: u64,
    rows_this_run: u64,
}

impl<C: SourceConnector, S: RecordSink> ChunkedExtractor<C, S> {
    /// Build an extractor over a connector, sink and checkpoint file.
    #[must_use]
    pub fn new(connector: C, sink: S, checkpoint: CheckpointFile, config: ExtractConfig) -> Self {
        Self {
            connector,
            sink,
            checkpoint,
            config,
            sanitizer: RowSanitizer::new(),
            committed_key: 0,
            total_rows: 0,
            rows_this_run: 0,
        }
    }

    /// Run the extraction to source exhaustion.
    ///
    /// # Errors
    /// Returns an error when the sink fails, the checkpoint cannot be
    /// persisted or the retry budget for transient source errors is
    /// exhausted. The checkpoint keeps the last committed position either
    /// way, and the run summary is logged with the best-known totals even
    /// when the run fails.
    pub fn run(&mut self) -> Result<ExtractionReport> {
        let started = Instant::now();
        let outcome = self.run_loop(started);
        match &outcome {
            Ok(report) => {
                log::info!(
                    "Extraction complete: {} rows total ({} this run, {} pages) in {:.1?}",
                    report.total_rows,
                    report.rows_this_run,
                    report.pages,
                    report.elapsed
                );
            }
            Err(err) => {
                let elapsed = started.elapsed();
                let rate = if elapsed.as_secs_f64() > 0.0 {
                    self.rows_this_run as f64 / elapsed.as_secs_f64()
                } else {
                    0.0
                };
                log::error!(
                    "Extraction aborted: {err}. Last successful key: {}. \
                     {} rows total ({} this run, {rate:.0} rows/sec) in {elapsed:.1?}",
                    self.committed_key,
                    self.total_rows,
                    self.rows_this_run
                );
            }
        }
        outcome
    }

    /// Highest key committed to the checkpoint. After a failed run this is
    /// the position a retry resumes from.
    #[must_use]
    pub const fn committed_key(&self) -> i64 {
        self.committed_key
    }

    /// Rows written across all runs, best known at this point even when
    /// the last run failed.
    #[must_use]
    pub const fn total_rows(&self) -> u64 {
        self.total_rows
    }

    /// Rows written by the most recent run.
    #[must_use]
    pub const fn rows_this_run(&self) -> u64 {
        self.rows_this_run
    }

    fn run_loop(&mut self, started: Instant) -> Result<ExtractionReport> {
        if self.config.chunk_size == 0 {
            return Err(ExtractError::Config(
                "chunk size must be positive".to_string(),
            ));
        }

        let label = self.sink.describe();
        // Checkpoint identity follows the primary output file; sinks
        // without one fall back to their description.
        let output = self
            .sink
            .output_path()
            .map_or_else(|| label.clone(), |path| path.display().to_string());

        if !self.config.resume {
            log::info!("Resume disabled, discarding any previous checkpoint");
            self.checkpoint.remove()?;
        }
        let state = self.checkpoint.load(&output);
        let resumed_from = state.last_id;
        let mut last_key = state.last_id;
        self.total_rows = state.total_rows;
        self.rows_this_run = 0;
        self.committed_key = last_key;

        let mut source = self.connector.connect()?;
        let source_total = source.total_count()?;
        self.sink.setup(source.schema())?;
        log::info!(
            "Extracting {} into {label} ({source_total} source rows, chunks of {}, {} sanitizer workers)",
            source.name(),
            self.config.chunk_size,
            self.config.effective_workers()
        );

        let pool = if self.config.workers > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(self.config.workers)
                    .build()
                    .map_err(|err| ExtractError::Config(err.to_string()))?,
            )
        } else {
            None
        };

        let bar = self
            .config
            .progress
            .then(|| create_main_progress_bar(source_total, Some("Extracting records")));
        if let Some(bar) = &bar {
            bar.set_position(self.total_rows.min(source_total));
        }

        let mut seen: FxHashSet<i64> = FxHashSet::default();
        let mut pages: u64 = 0;
        let mut attempts: u32 = 0;

        loop {
            let page = match source.fetch_page(last_key, self.config.chunk_size) {
                Ok(page) => {
                    attempts = 0;
                    page
                }
                Err(err) if err.is_transient() => {
                    attempts += 1;
                    if attempts > self.config.max_retries {
                        return Err(err);
                    }
                    log::warn!(
                        "Transient source error (attempt {attempts}/{}): {err}. Reconnecting at key {last_key}",
                        self.config.max_retries
                    );
                    std::thread::sleep(Duration::from_secs(self.config.retry_delay_secs));
                    match self.connector.connect() {
                        Ok(fresh) => source = fresh,
                        Err(connect_err) if connect_err.is_transient() => {
                            log::warn!("Reconnect failed: {connect_err}");
                        }
                        Err(connect_err) => return Err(connect_err),
                    }
                    continue;
                }
                Err(err) => return Err(err),
            };

            if page.is_empty() {
                log::info!("Source exhausted at key {last_key}");
                break;
            }
            pages += 1;

            let page_max = page.iter().map(|row| row.key).fold(i64::MIN, i64::max);
            let cleaned = match &pool {
                Some(pool) => pool.install(|| self.sanitizer.clean_chunk(&page)),
                None => self.sanitizer.clean_chunk(&page),
            };
            let fresh = cleaned
                .into_iter()
                .filter(|row| seen.insert(row.key))
                .collect_vec();

            if !fresh.is_empty() {
                self.sink.write_chunk(&fresh)?;
                let written = fresh.len() as u64;
                self.rows_this_run += written;
                self.total_rows += written;
            }

            // The cursor follows the page even when every row was a
            // duplicate, otherwise a stuttering source would loop forever.
            last_key = last_key.max(page_max);
            self.checkpoint
                .save(&ResumeState::new(last_key, self.total_rows, &output))?;
            self.committed_key = last_key;

            if let Some(bar) = &bar {
                bar.set_position(self.total_rows.min(source_total));
            }
            let elapsed = started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                self.rows_this_run as f64 / elapsed
            } else {
                0.0
            };
            let remaining = source_total.saturating_sub(self.total_rows);
            let eta_secs = if rate > 0.0 {
                remaining as f64 / rate
            } else {
                0.0
            };
            log::debug!(
                "Extracted {}/{source_total} rows, key {last_key} ({rate:.0} rows/sec, ETA {eta_secs:.0}s)",
                self.total_rows
            );
        }

        self.sink.flush()?;
        if let Some(bar) = &bar {
            finish_progress_bar(bar, Some(&format!("{} rows extracted", self.total_rows)));
        }

        Ok(ExtractionReport {
            total_rows: self.total_rows,
            rows_this_run: self.rows_this_run,
            resumed_from,
            last_key,
            pages,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::models::{CleanRow, FieldValue, RawRow};
    use crate::schema::RecordSchema;
    use crate::source::memory::{MemoryConnector, MemorySource};

    #[derive(Clone, Default)]
    struct VecSink {
        rows: Arc<Mutex<Vec<CleanRow>>>,
    }

    impl RecordSink for VecSink {
        fn describe(&self) -> String {
            "vec".to_string()
        }

        fn setup(&mut self, _schema: &RecordSchema) -> Result<()> {
            Ok(())
        }

        fn write_chunk(&mut self, rows: &[CleanRow]) -> Result<()> {
            self.rows.lock().unwrap().extend_from_slice(rows);
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn test_schema() -> RecordSchema {
        RecordSchema::new("records", "id", ["id", "name"])
    }

    fn row(key: i64) -> RawRow {
        RawRow::new(key, vec![FieldValue::Int(key), FieldValue::from("x ")])
    }

    fn quiet_config(chunk_size: usize) -> ExtractConfig {
        ExtractConfig {
            chunk_size,
            progress: false,
            retry_delay_secs: 0,
            ..ExtractConfig::default()
        }
    }

    #[test]
    fn extracts_everything_in_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = CheckpointFile::new(dir.path().join(".resume_state.json"));
        let sink = VecSink::default();
        let connector = MemoryConnector::new(MemorySource::new(test_schema(), (1..=25).map(row)));

        let report = ChunkedExtractor::new(connector, sink.clone(), checkpoint, quiet_config(10))
            .run()
            .unwrap();

        assert_eq!(report.rows_this_run, 25);
        assert_eq!(report.total_rows, 25);
        assert_eq!(report.pages, 3);
        assert_eq!(report.last_key, 25);
        let keys: Vec<i64> = sink.rows.lock().unwrap().iter().map(|r| r.key).collect();
        assert_eq!(keys, (1..=25).collect::<Vec<i64>>());
    }

    /// A finished extraction reruns as a no-op.
    #[test]
    fn rerun_after_completion_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = CheckpointFile::new(dir.path().join(".resume_state.json"));
        let connector = MemoryConnector::new(MemorySource::new(test_schema(), (1..=9).map(row)));

        let first = VecSink::default();
        ChunkedExtractor::new(
            connector.clone(),
            first.clone(),
            checkpoint.clone(),
            quiet_config(4),
        )
        .run()
        .unwrap();

        let second = VecSink::default();
        let report = ChunkedExtractor::new(connector, second.clone(), checkpoint, quiet_config(4))
            .run()
            .unwrap();

        assert_eq!(report.rows_this_run, 0);
        assert_eq!(report.total_rows, 9);
        assert_eq!(report.resumed_from, 9);
        assert!(second.rows.lock().unwrap().is_empty());
    }

    /// Sources that replay rows must not produce duplicate output.
    #[test]
    fn replayed_rows_are_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = CheckpointFile::new(dir.path().join(".resume_state.json"));
        let sink = VecSink::default();
        let source = MemorySource::new(test_schema(), (1..=20).map(row)).with_overlap(3);
        let connector = MemoryConnector::new(source);

        let report = ChunkedExtractor::new(connector, sink.clone(), checkpoint, quiet_config(5))
            .run()
            .unwrap();

        assert_eq!(report.rows_this_run, 20);
        let keys: Vec<i64> = sink.rows.lock().unwrap().iter().map(|r| r.key).collect();
        assert_eq!(keys, (1..=20).collect::<Vec<i64>>());
    }

    #[test]
    fn disabling_resume_starts_over() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = CheckpointFile::new(dir.path().join(".resume_state.json"));
        let connector = MemoryConnector::new(MemorySource::new(test_schema(), (1..=6).map(row)));

        ChunkedExtractor::new(
            connector.clone(),
            VecSink::default(),
            checkpoint.clone(),
            quiet_config(3),
        )
        .run()
        .unwrap();

        let sink = VecSink::default();
        let config = ExtractConfig {
            resume: false,
            ..quiet_config(3)
        };
        let report = ChunkedExtractor::new(connector, sink.clone(), checkpoint, config)
            .run()
            .unwrap();

        assert_eq!(report.resumed_from, 0);
        assert_eq!(report.rows_this_run, 6);
        assert_eq!(sink.rows.lock().unwrap().len(), 6);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = CheckpointFile::new(dir.path().join(".resume_state.json"));
        let connector = MemoryConnector::new(MemorySource::new(test_schema(), (1..=3).map(row)));

        let err = ChunkedExtractor::new(connector, VecSink::default(), checkpoint, quiet_config(0))
            .run()
            .unwrap_err();
        assert!(matches!(err, ExtractError::Config(_)));
    }

    /// Sanitization happens between source and sink.
    #[test]
    fn rows_reach_the_sink_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = CheckpointFile::new(dir.path().join(".resume_state.json"));
        let sink = VecSink::default();
        let raw = RawRow::new(
            1,
            vec![FieldValue::Int(1), FieldValue::from("a\r\nb\u{0}c")],
        );
        let connector = MemoryConnector::new(MemorySource::new(test_schema(), [raw]));

        ChunkedExtractor::new(connector, sink.clone(), checkpoint, quiet_config(10))
            .run()
            .unwrap();

        let rows = sink.rows.lock().unwrap();
        assert_eq!(rows[0].values[1], "a bc");
    }

    /// Sink that refuses its nth chunk.
    #[derive(Default)]
    struct TrippingSink {
        chunks: u32,
        fail_on: u32,
    }

    impl RecordSink for TrippingSink {
        fn describe(&self) -> String {
            "tripping".to_string()
        }

        fn setup(&mut self, _schema: &RecordSchema) -> Result<()> {
            Ok(())
        }

        fn write_chunk(&mut self, _rows: &[CleanRow]) -> Result<()> {
            self.chunks += 1;
            if self.chunks == self.fail_on {
                return Err(ExtractError::Config("write refused".to_string()));
            }
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }

    /// A failed run still surfaces the totals committed before the
    /// failure, so the summary covers partial progress.
    #[test]
    fn failed_run_keeps_best_known_totals() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = CheckpointFile::new(dir.path().join(".resume_state.json"));
        let connector = MemoryConnector::new(MemorySource::new(test_schema(), (1..=30).map(row)));
        let sink = TrippingSink {
            fail_on: 3,
            ..TrippingSink::default()
        };
        let mut extractor = ChunkedExtractor::new(connector, sink, checkpoint, quiet_config(10));

        let err = extractor.run().unwrap_err();
        assert!(matches!(err, ExtractError::Config(_)));
        // two pages of ten rows committed before the sink gave out
        assert_eq!(extractor.committed_key(), 20);
        assert_eq!(extractor.total_rows(), 20);
        assert_eq!(extractor.rows_this_run(), 20);
    }
}
