//! Resume checkpoints for interruptible extractions
//!
//! A checkpoint records how far an extraction got: the last key written and
//! the running row total. It is persisted as a small JSON file next to the
//! output after every page, so a crashed or killed run can pick up where it
//! left off instead of starting over.
//!
//! Loading is deliberately tolerant. A missing or unreadable checkpoint
//! downgrades to a fresh start with a warning, never an error, because the
//! worst outcome of a lost checkpoint is re-extracting rows the sinks
//! already know how to overwrite.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::utils::ensure_parent_dir;

/// File name used for checkpoints, hidden next to the extraction output.
pub const RESUME_FILE_NAME: &str = ".resume_state.json";

/// Persisted extraction position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    /// Highest key already extracted. `0` means nothing was extracted yet.
    pub last_id: i64,
    /// Total rows written across all runs of this extraction.
    pub total_rows: u64,
    /// When this state was recorded, RFC 3339.
    pub timestamp: String,
    /// Output file the state belongs to. Informational; a mismatch is
    /// logged but does not invalidate the state.
    pub output_file: String,
}

impl ResumeState {
    /// State recording progress up to `last_id`, stamped with the current time.
    #[must_use]
    pub fn new(last_id: i64, total_rows: u64, output_file: impl Into<String>) -> Self {
        Self {
            last_id,
            total_rows,
            timestamp: Utc::now().to_rfc3339(),
            output_file: output_file.into(),
        }
    }

    /// Fresh state for an extraction that has not produced anything yet.
    #[must_use]
    pub fn start(output_file: impl Into<String>) -> Self {
        Self::new(0, 0, output_file)
    }

    /// Whether this state represents an extraction with no progress.
    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        self.last_id == 0 && self.total_rows == 0
    }
}

/// Handle to one checkpoint file on disk.
#[derive(Debug, Clone)]
pub struct CheckpointFile {
    path: PathBuf,
}

impl CheckpointFile {
    /// Checkpoint stored at an explicit path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Checkpoint stored next to an output file, named [`RESUME_FILE_NAME`].
    #[must_use]
    pub fn for_output(output: &Path) -> Self {
        let dir = output.parent().unwrap_or_else(|| Path::new(""));
        Self::new(dir.join(RESUME_FILE_NAME))
    }

    /// Path of the checkpoint file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpoint, falling back to a fresh state when the file is
    /// missing, unreadable or malformed.
    ///
    /// `output_file` is the output the caller is about to write. If the
    /// stored state names a different output, the state is still used but a
    /// warning is logged so operators can spot crossed-over runs.
    #[must_use]
    pub fn load(&self, output_file: &str) -> ResumeState {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return ResumeState::start(output_file);
            }
            Err(err) => {
                log::warn!(
                    "Could not read resume state {}: {err}. Starting fresh",
                    self.path.display()
                );
                return ResumeState::start(output_file);
            }
        };

        match serde_json::from_str::<ResumeState>(&raw) {
            Ok(state) => {
                if state.output_file != output_file {
                    log::warn!(
                        "Resume state was recorded for `{}` but this run writes `{output_file}`",
                        state.output_file
                    );
                }
                log::info!(
                    "Resuming from key {} ({} rows already extracted)",
                    state.last_id,
                    state.total_rows
                );
                state
            }
            Err(err) => {
                log::warn!(
                    "Resume state {} is malformed: {err}. Starting fresh",
                    self.path.display()
                );
                ResumeState::start(output_file)
            }
        }
    }

    /// Persist the state atomically: write a temp file, then rename over
    /// the checkpoint path.
    ///
    /// # Errors
    /// Returns an error if the temp file cannot be written or renamed.
    pub fn save(&self, state: &ResumeState) -> Result<()> {
        ensure_parent_dir(&self.path)?;
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(state)
            .map_err(|err| anyhow::anyhow!("could not serialize resume state: {err}"))?;
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Delete the checkpoint so the next run starts from the beginning.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be removed.
    pub fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
