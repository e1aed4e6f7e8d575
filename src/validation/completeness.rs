/*!
 * Completeness check for drafts.
 *
 * Compares the structural density of a draft with its source:
 * - Character length ratio between draft and source
 * - Clause count ratio (text between sentence/clause punctuation)
 * - Empty drafts for non-empty sources
 *
 * This can only flag gross omissions or additions. A draft that passes may
 * still drop or invent content.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Clause and sentence breaks across the scripts we handle:
/// ASCII punctuation, danda/double danda, Sinhala kunddaliya, ideographic full stop
static CLAUSE_BREAK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[.!?;:,\x{0964}\x{0965}\x{0DF4}\x{3002}\x{FF0C}]+").expect("Invalid clause break regex")
});

/// Default minimum length ratio (draft / source)
const DEFAULT_MIN_CHAR_RATIO: f64 = 0.3;

/// Default maximum length ratio (draft / source)
const DEFAULT_MAX_CHAR_RATIO: f64 = 3.0;

/// Types of completeness issues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CompletenessIssue {
    /// Draft is empty but the source is not
    EmptyDraft,
    /// Source is empty but the draft is not
    UnexpectedText { draft_chars: usize },
    /// Draft is implausibly short (likely omission)
    TooShort { ratio: f64, min_ratio: f64 },
    /// Draft is implausibly long (likely addition)
    TooLong { ratio: f64, max_ratio: f64 },
    /// Draft has far fewer clauses than the source
    MissingClauses { source_clauses: usize, draft_clauses: usize },
    /// Draft has far more clauses than the source
    ExtraClauses { source_clauses: usize, draft_clauses: usize },
}

impl CompletenessIssue {
    /// Whether the issue points at dropped content
    pub fn is_omission(&self) -> bool {
        matches!(
            self,
            Self::EmptyDraft | Self::TooShort { .. } | Self::MissingClauses { .. }
        )
    }
}

impl fmt::Display for CompletenessIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDraft => write!(f, "draft is empty"),
            Self::UnexpectedText { draft_chars } => {
                write!(f, "draft has {} chars for an empty source", draft_chars)
            }
            Self::TooShort { ratio, min_ratio } => {
                write!(f, "draft too short: length ratio {:.2} < {:.2}", ratio, min_ratio)
            }
            Self::TooLong { ratio, max_ratio } => {
                write!(f, "draft too long: length ratio {:.2} > {:.2}", ratio, max_ratio)
            }
            Self::MissingClauses {
                source_clauses,
                draft_clauses,
            } => write!(
                f,
                "draft has {} clauses where the source has {}",
                draft_clauses, source_clauses
            ),
            Self::ExtraClauses {
                source_clauses,
                draft_clauses,
            } => write!(
                f,
                "draft has {} clauses where the source has only {}",
                draft_clauses, source_clauses
            ),
        }
    }
}

/// Configuration for the completeness check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletenessConfig {
    /// Minimum acceptable length ratio (draft / source)
    #[serde(default = "default_min_char_ratio")]
    pub min_char_ratio: f64,
    /// Maximum acceptable length ratio (draft / source)
    #[serde(default = "default_max_char_ratio")]
    pub max_char_ratio: f64,
    /// Minimum acceptable clause count ratio
    #[serde(default = "default_min_clause_ratio")]
    pub min_clause_ratio: f64,
    /// Maximum acceptable clause count ratio
    #[serde(default = "default_max_clause_ratio")]
    pub max_clause_ratio: f64,
    /// Sources shorter than this skip the length ratio check
    #[serde(default = "default_min_source_chars")]
    pub min_source_chars: usize,
    /// Sources with fewer clauses skip the clause ratio check
    #[serde(default = "default_min_source_clauses")]
    pub min_source_clauses: usize,
}

fn default_min_char_ratio() -> f64 {
    DEFAULT_MIN_CHAR_RATIO
}

fn default_max_char_ratio() -> f64 {
    DEFAULT_MAX_CHAR_RATIO
}

fn default_min_clause_ratio() -> f64 {
    0.5
}

fn default_max_clause_ratio() -> f64 {
    2.0
}

fn default_min_source_chars() -> usize {
    20
}

fn default_min_source_clauses() -> usize {
    3
}

impl Default for CompletenessConfig {
    fn default() -> Self {
        Self {
            min_char_ratio: default_min_char_ratio(),
            max_char_ratio: default_max_char_ratio(),
            min_clause_ratio: default_min_clause_ratio(),
            max_clause_ratio: default_max_clause_ratio(),
            min_source_chars: default_min_source_chars(),
            min_source_clauses: default_min_source_clauses(),
        }
    }
}

/// Result of checking one draft
#[derive(Debug, Clone)]
pub struct CompletenessReport {
    /// Draft length / source length, in chars
    pub char_ratio: f64,
    /// Clause counts of source and draft
    pub source_clauses: usize,
    pub draft_clauses: usize,
    /// Issues found
    pub issues: Vec<CompletenessIssue>,
}

impl CompletenessReport {
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Completeness checker comparing a draft with its source
#[derive(Debug, Clone, Default)]
pub struct CompletenessChecker {
    config: CompletenessConfig,
}

impl CompletenessChecker {
    /// Create a new checker with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new checker with custom configuration
    pub fn with_config(config: CompletenessConfig) -> Self {
        Self { config }
    }

    /// Number of non-blank clauses in `text`
    pub fn count_clauses(text: &str) -> usize {
        CLAUSE_BREAK_REGEX
            .split(text)
            .filter(|segment| segment.chars().any(|c| c.is_alphanumeric()))
            .count()
    }

    /// Calculate length ratio between draft and source text
    pub fn calculate_ratio(source: &str, draft: &str) -> f64 {
        let source_len = source.chars().count();
        let draft_len = draft.chars().count();

        if source_len == 0 {
            if draft_len == 0 { 1.0 } else { f64::INFINITY }
        } else {
            draft_len as f64 / source_len as f64
        }
    }

    /// Check a draft against its source
    pub fn check(&self, source_text: &str, draft_text: &str) -> CompletenessReport {
        let source = source_text.trim();
        let draft = draft_text.trim();

        let source_len = source.chars().count();
        let draft_len = draft.chars().count();
        let char_ratio = Self::calculate_ratio(source, draft);
        let source_clauses = Self::count_clauses(source);
        let draft_clauses = Self::count_clauses(draft);

        let mut issues = Vec::new();

        if source_len > 0 && draft_len == 0 {
            issues.push(CompletenessIssue::EmptyDraft);
        } else if source_len == 0 && draft_len > 0 {
            issues.push(CompletenessIssue::UnexpectedText { draft_chars: draft_len });
        } else if source_len > 0 {
            if source_len >= self.config.min_source_chars {
                if char_ratio < self.config.min_char_ratio {
                    issues.push(CompletenessIssue::TooShort {
                        ratio: char_ratio,
                        min_ratio: self.config.min_char_ratio,
                    });
                } else if char_ratio > self.config.max_char_ratio {
                    issues.push(CompletenessIssue::TooLong {
                        ratio: char_ratio,
                        max_ratio: self.config.max_char_ratio,
                    });
                }
            }

            if source_clauses >= self.config.min_source_clauses {
                let clause_ratio = draft_clauses as f64 / source_clauses as f64;
                if clause_ratio < self.config.min_clause_ratio {
                    issues.push(CompletenessIssue::MissingClauses {
                        source_clauses,
                        draft_clauses,
                    });
                } else if clause_ratio > self.config.max_clause_ratio {
                    issues.push(CompletenessIssue::ExtraClauses {
                        source_clauses,
                        draft_clauses,
                    });
                }
            }
        }

        debug!(
            "Completeness: ratio {:.2}, clauses {} -> {}, {} issue(s)",
            char_ratio,
            source_clauses,
            draft_clauses,
            issues.len()
        );

        CompletenessReport {
            char_ratio,
            source_clauses,
            draft_clauses,
            issues,
        }
    }
}
