/*!
 * Durable per-job progress.
 *
 * This module provides:
 * - `Checkpoint`: the last completed unit index, per-unit results and counters
 * - `CheckpointStore`: atomic JSON files, one per job, removed on completion
 *
 * A missing checkpoint means the job finished cleanly or never started; a
 * present one means it was paused or interrupted and will be resumed.
 */

pub mod models;
pub mod store;

// Re-export main types
pub use models::{Checkpoint, JobStats, TransformResult, UnitStatus};
pub use store::CheckpointStore;
