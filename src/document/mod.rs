/*!
 * Document model for the transformation pipeline.
 *
 * A document arrives from the extraction step as an ordered list of units
 * (titles, body passages, footers). The pipeline never mutates units; it
 * only reads them and records results against their ordinals.
 */

pub mod model;

// Re-export types used by other modules
pub use model::{Job, SizeConstraint, Unit, UnitKind};
