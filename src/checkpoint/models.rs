use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::CheckpointError;
use crate::translation::verifier::Issue;

/// Terminal status of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitStatus {
    /// Transformed (possibly with unresolved issues recorded)
    Succeeded,
    /// Refused by the service on every attempt; the job moved on
    SkippedPermanentFailure,
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::SkippedPermanentFailure => write!(f, "skipped (permanent failure)"),
        }
    }
}

/// Final result for one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResult {
    pub ordinal: usize,
    /// Final text; empty for skipped units
    pub text: String,
    pub status: UnitStatus,
    /// Issues cleared by the corrective call
    #[serde(default)]
    pub issues_fixed: Vec<Issue>,
    /// Issues still present in `text`, for operator review
    #[serde(default)]
    pub unresolved_issues: Vec<Issue>,
    /// Whether `text` came from a corrective call
    #[serde(default)]
    pub corrected: bool,
    /// Transform attempts spent, across all chunks
    pub attempts: u32,
}

impl TransformResult {
    pub fn succeeded(ordinal: usize, text: impl Into<String>, attempts: u32) -> Self {
        Self {
            ordinal,
            text: text.into(),
            status: UnitStatus::Succeeded,
            issues_fixed: Vec::new(),
            unresolved_issues: Vec::new(),
            corrected: false,
            attempts,
        }
    }

    pub fn skipped(ordinal: usize, attempts: u32) -> Self {
        Self {
            ordinal,
            text: String::new(),
            status: UnitStatus::SkippedPermanentFailure,
            issues_fixed: Vec::new(),
            unresolved_issues: Vec::new(),
            corrected: false,
            attempts,
        }
    }

    pub fn needs_review(&self) -> bool {
        !self.unresolved_issues.is_empty()
    }
}

/// Counters carried across runs of one job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub total_units: usize,
    pub succeeded: usize,
    pub skipped: usize,
    /// Units whose text came from a corrective call
    pub corrected: usize,
    /// Units recorded with unresolved issues
    pub needs_review: usize,
    /// Transform calls, retries included
    pub transform_calls: u64,
    /// Corrective calls
    pub correction_calls: u64,
    /// Failed attempts that were retried
    pub retries: u64,
}

impl JobStats {
    pub fn new(total_units: usize) -> Self {
        Self {
            total_units,
            ..Self::default()
        }
    }

    pub fn completed(&self) -> usize {
        self.succeeded + self.skipped
    }

    pub fn progress_percentage(&self) -> f64 {
        if self.total_units == 0 {
            return 100.0;
        }
        (self.completed() as f64 / self.total_units as f64) * 100.0
    }

    /// All external calls made so far
    pub fn total_calls(&self) -> u64 {
        self.transform_calls + self.correction_calls
    }
}

/// Durable progress of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub job_id: String,
    /// Highest ordinal with a terminal result
    pub last_completed_index: usize,
    pub results: BTreeMap<usize, TransformResult>,
    pub stats: JobStats,
    pub updated_at: DateTime<Utc>,
    /// Fingerprint of the job the results belong to
    #[serde(default)]
    pub source_fingerprint: String,
}

impl Checkpoint {
    /// Empty progress for a job; not persisted until the first result
    pub fn new(job_id: impl Into<String>, source_fingerprint: impl Into<String>, total_units: usize) -> Self {
        Self {
            job_id: job_id.into(),
            last_completed_index: 0,
            results: BTreeMap::new(),
            stats: JobStats::new(total_units),
            updated_at: Utc::now(),
            source_fingerprint: source_fingerprint.into(),
        }
    }

    /// Ordinal the next result must carry
    pub fn next_ordinal(&self) -> usize {
        if self.results.is_empty() {
            0
        } else {
            self.last_completed_index + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Append the terminal result of the next unit
    pub fn record(&mut self, result: TransformResult) -> Result<(), CheckpointError> {
        let expected = self.next_ordinal();
        if result.ordinal != expected {
            return Err(CheckpointError::OutOfOrder {
                job_id: self.job_id.clone(),
                expected,
                found: result.ordinal,
            });
        }

        match result.status {
            UnitStatus::Succeeded => self.stats.succeeded += 1,
            UnitStatus::SkippedPermanentFailure => self.stats.skipped += 1,
        }
        if result.corrected {
            self.stats.corrected += 1;
        }
        if result.needs_review() {
            self.stats.needs_review += 1;
        }

        self.last_completed_index = result.ordinal;
        self.results.insert(result.ordinal, result);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Results in ordinal order
    pub fn ordered_results(&self) -> Vec<TransformResult> {
        self.results.values().cloned().collect()
    }
}
