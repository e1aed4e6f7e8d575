/*!
 * Local validation of drafts returned by the transform service.
 *
 * Nothing in this module performs I/O; every check is a pure function of
 * the source text, the draft and configuration.
 *
 * # Architecture
 *
 * - `script`: Script contract checks (foreign scripts, disallowed code points, joiners)
 * - `completeness`: Structural density comparison between source and draft
 * - `markers`: Boundary markers for merged calls
 */

pub mod completeness;
pub mod markers;
pub mod script;

// Re-export main types
pub use completeness::{CompletenessChecker, CompletenessConfig, CompletenessIssue};
pub use markers::{MarkerError, MarkerValidator};
pub use script::{IssueKind, ScriptRegistry, ScriptSpec, ScriptValidator, ValidationIssue};
