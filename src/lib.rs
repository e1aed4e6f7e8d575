/*!
 * # Pagewright - rate-limited, checkpointed document transformation
 *
 * A Rust library that turns an ordered list of text units (titles, body
 * passages, footers of one document) into target-language counterparts
 * through an external, rate-limited generation service.
 *
 * ## Features
 *
 * - Burst-safe rate limiting shared across concurrently running jobs
 * - Per-failure-class retries: throttled, overloaded, timed out, refused, unknown
 * - Atomic checkpoints after every unit; interrupted jobs resume, never restart
 * - Local script and completeness checks with a single corrective call
 * - Splitting of oversized units and merging of short ones
 * - Transform clients:
 *   - Anthropic API
 *   - Ollama (local LLM)
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `document`: Units and jobs handed over by the extraction step
 * - `validation`: Pure checks on drafts:
 *   - `validation::script`: Script contracts
 *   - `validation::completeness`: Structural density comparison
 *   - `validation::markers`: Boundary markers for merged calls
 * - `providers`: The `TransformClient` seam and its implementations
 * - `translation`: The pipeline itself:
 *   - `translation::rate_limiter`: Shared call gate
 *   - `translation::retry`: Error classes and retry table
 *   - `translation::segmenter`: Split and merge planning
 *   - `translation::verifier`: Verification and correction
 *   - `translation::engine`: Job driver
 * - `checkpoint`: Durable job progress
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the library
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod checkpoint;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;
pub mod validation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use checkpoint::{Checkpoint, CheckpointStore, TransformResult, UnitStatus};
pub use document::{Job, SizeConstraint, Unit, UnitKind};
pub use errors::{CheckpointError, PipelineError, ProviderError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use providers::{TransformClient, TransformRequest};
pub use translation::{ErrorClass, JobOutcome, JobReport, PipelineEngine, RateLimiter, RetryPolicy, Verifier};
pub use validation::{ScriptSpec, ScriptValidator, ValidationIssue};
