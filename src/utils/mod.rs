//! Utility functions shared across extraction and reporting

pub mod progress;

use std::path::Path;

use crate::error::Result;

/// Default page size for keyset pagination
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Helper function to get chunk size from environment
#[must_use]
pub fn get_chunk_size() -> Option<usize> {
    std::env::var("CRVS_CHUNK_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
}

/// Create the parent directory of a path if it does not exist yet
///
/// # Arguments
/// * `path` - File path whose parent directory should exist
///
/// # Errors
/// Returns an error if the directory cannot be created
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
