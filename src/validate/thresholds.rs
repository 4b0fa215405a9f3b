//! Configurable thresholds for validation rules
//!
//! Every bound the default rules compare against lives here, so deployments
//! can override them from a JSON file instead of editing rule definitions.
//! The outside-hours cutover date is deployment metadata: it marks when the
//! source system started recording the initiation timestamp, and records
//! from before it must not be judged on a field that did not exist.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};

/// Bounds and dates used by [`crate::validate::RuleSet::with_defaults`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum plausible mother age; strictly below flags `mother_underage`.
    pub mother_min_age: i64,
    /// Maximum plausible mother age; strictly above flags `mother_overage`.
    pub mother_max_age: i64,
    /// Minimum plausible father age; strictly below flags `father_underage`.
    pub father_min_age: i64,
    /// Maximum plausible father age; strictly above flags `father_overage`.
    pub father_max_age: i64,
    /// Mother minus father age difference; strictly above flags `age_gap`.
    pub mother_father_age_gap: i64,
    /// Registrations per registrar per day; strictly above flags
    /// `high_daily_activity`.
    pub high_activity_threshold: i64,
    /// First hour of the working day, inclusive.
    pub work_hours_start: u32,
    /// Last hour of the working day, inclusive.
    pub work_hours_end: u32,
    /// Days from birth to registration; strictly above flags
    /// `registration_delay`.
    pub registration_delay_days: i64,
    /// Date the initiation timestamp was introduced upstream. Records from
    /// before it are exempt from `outside_hours`; `None` disables the gate
    /// and judges every record.
    pub outside_hours_start_date: Option<NaiveDate>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            mother_min_age: 16,
            mother_max_age: 50,
            father_min_age: 20,
            father_max_age: 55,
            mother_father_age_gap: 3,
            high_activity_threshold: 50,
            work_hours_start: 7,
            work_hours_end: 19,
            registration_delay_days: 365,
            outside_hours_start_date: NaiveDate::from_ymd_opt(2023, 10, 2),
        }
    }
}

impl Thresholds {
    /// Load overrides from a JSON file. Fields absent from the file keep
    /// their defaults.
    ///
    /// # Errors
    /// Returns a configuration error when the file cannot be read or parsed.
    /// Unlike a checkpoint, a malformed threshold file is not recoverable:
    /// silently falling back to defaults would validate with the wrong
    /// bounds.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            ExtractError::Config(format!(
                "could not read thresholds from {}: {err}",
                path.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|err| {
            ExtractError::Config(format!(
                "invalid thresholds in {}: {err}",
                path.display()
            ))
        })
    }
}
