//! Configuration for extraction runs.

use crate::utils::DEFAULT_CHUNK_SIZE;

/// Configuration for the `ChunkedExtractor`
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Number of rows requested per source page
    pub chunk_size: usize,
    /// Whether to continue from an existing checkpoint or start over
    pub resume: bool,
    /// Maximum consecutive reconnect attempts after a transient source error
    pub max_retries: u32,
    /// Seconds to wait between reconnect attempts
    pub retry_delay_secs: u64,
    /// Worker threads for row sanitization (0 = one per available CPU)
    pub workers: usize,
    /// Render an interactive progress bar in addition to log output
    pub progress: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            resume: true,
            max_retries: 5,
            retry_delay_secs: 5,
            workers: 0,
            progress: true,
        }
    }
}

impl ExtractConfig {
    /// Effective sanitizer pool size
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}
