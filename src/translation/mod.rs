/*!
 * The transformation pipeline.
 *
 * This module contains everything between a job and its finished output.
 * It is split into several submodules:
 *
 * - `rate_limiter`: Burst-safe gate shared by all jobs on one service account
 * - `retry`: Failure classes and the per-class retry table
 * - `segmenter`: Splitting oversized units, merging short ones
 * - `prompts`: Instructions for transform and corrective calls
 * - `gate`: Rate-limited, deadline-bounded access to the transform client
 * - `verifier`: Local checks and the single corrective round
 * - `engine`: The sequential, checkpointed job driver
 */

// Re-export main types for easier usage
pub use self::engine::{JobOutcome, JobOutput, JobReport, JobState, PipelineEngine, UnitState};
pub use self::gate::CallGate;
pub use self::rate_limiter::{RateLimiter, RateLimiterStats};
pub use self::retry::{Backoff, ClassPolicy, ErrorClass, Exhaustion, RetryDecision, RetryPolicy};
pub use self::segmenter::{Chunk, Segmenter, WorkItem};
pub use self::verifier::{Correction, Issue, Verdict, Verifier};

// Submodules
pub mod engine;
pub mod gate;
pub mod prompts;
pub mod rate_limiter;
pub mod retry;
pub mod segmenter;
pub mod verifier;
