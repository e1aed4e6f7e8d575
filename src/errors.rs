/*!
 * Error types for the pagewright pipeline.
 *
 * This module contains the error types for the seams of the library,
 * using the thiserror crate for ergonomic error definitions:
 * - `ProviderError`: a failed call to the transform service
 * - `CheckpointError`: a failed read or write of durable job progress
 * - `PipelineError`: anything that stops the engine outright
 */

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when calling a transform service
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Explicit quota or rate-limit signal
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Message from the service
        message: String,
        /// Server-provided hint for when to try again
        retry_after_secs: Option<u64>,
    },

    /// Transient capacity signal from the service
    #[error("Service overloaded: {0}")]
    Overloaded(String),

    /// The call exceeded its deadline
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The service declined to produce output for policy reasons
    #[error("Content refused: {0}")]
    ContentRefused(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Server-provided retry hint, if the failure carried one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded {
                retry_after_secs: Some(secs),
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

/// Errors raised by the checkpoint store
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// Reading, writing or renaming the checkpoint file failed
    #[error("Checkpoint I/O error at {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The checkpoint file exists but cannot be decoded
    #[error("Checkpoint at {path} is corrupt: {source}")]
    Corrupt {
        /// Offending file
        path: PathBuf,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// A save would move `lastCompletedIndex` backwards
    #[error("Checkpoint for job {job_id} would regress from {previous} to {attempted}")]
    Regression {
        /// Job identifier
        job_id: String,
        /// Index already persisted
        previous: usize,
        /// Index of the rejected save
        attempted: usize,
    },

    /// A result was recorded for anything but the next ordinal
    #[error("Job {job_id} expected a result for unit {expected}, got {found}")]
    OutOfOrder {
        /// Job identifier
        job_id: String,
        /// Next ordinal the checkpoint accepts
        expected: usize,
        /// Ordinal of the rejected result
        found: usize,
    },

    /// The job id cannot be turned into a file name
    #[error("Invalid job id for checkpointing: {0:?}")]
    InvalidJobId(String),
}

/// Errors that stop the pipeline engine
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The job handed to the engine violates its invariants
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    /// Durable progress could not be read or written
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// The finished output could not be delivered
    #[error("Failed to write output to {path}: {message}")]
    Output {
        /// Target path of the job
        path: PathBuf,
        /// Description of the failure
        message: String,
    },
}
