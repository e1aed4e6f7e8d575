/*!
 * Two-tier draft verification with a single corrective round.
 *
 * `verify` is local and free: a completeness comparison and the script
 * contract of the target language. Only when it finds something does
 * `correct` spend one external call, bundling every issue into a single
 * instruction. The corrected text is re-checked locally and never
 * resubmitted; whatever is still wrong is recorded for operator review.
 */

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::app_config::VerificationConfig;
use crate::document::UnitKind;
use crate::providers::TransformRequest;
use crate::validation::{CompletenessChecker, CompletenessIssue, IssueKind, ScriptRegistry, ScriptValidator, ValidationIssue};

use super::gate::CallGate;
use super::prompts;

/// Anything the local checks can find in a draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Issue {
    Script(ValidationIssue),
    Completeness(CompletenessIssue),
}

impl Issue {
    /// Coarse category used to tell which issues a correction cleared
    pub fn category(&self) -> &'static str {
        match self {
            Self::Script(issue) => match issue.kind {
                IssueKind::ForeignScript => "foreignScript",
                IssueKind::MissingJoiner => "missingJoiner",
                IssueKind::DisallowedCodepoint => "disallowedCodepoint",
            },
            Self::Completeness(issue) => match issue {
                CompletenessIssue::EmptyDraft => "emptyDraft",
                CompletenessIssue::UnexpectedText { .. } => "unexpectedText",
                CompletenessIssue::TooShort { .. } => "tooShort",
                CompletenessIssue::TooLong { .. } => "tooLong",
                CompletenessIssue::MissingClauses { .. } => "missingClauses",
                CompletenessIssue::ExtraClauses { .. } => "extraClauses",
            },
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Script(issue) => issue.fmt(f),
            Self::Completeness(issue) => issue.fmt(f),
        }
    }
}

/// Result of the local checks
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub accepted: bool,
    pub issues: Vec<Issue>,
}

impl Verdict {
    fn from_issues(issues: Vec<Issue>) -> Self {
        Self {
            accepted: issues.is_empty(),
            issues,
        }
    }
}

/// Outcome of verification plus the optional corrective call
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    /// Best available text
    pub text: String,
    /// Whether `text` came from the corrective call
    pub corrected: bool,
    /// Whether a corrective call was issued
    pub called: bool,
    /// Issues the correction cleared
    pub issues_fixed: Vec<Issue>,
    /// Issues still present in `text`
    pub unresolved: Vec<Issue>,
}

impl Correction {
    fn untouched(draft: &str, unresolved: Vec<Issue>, called: bool) -> Self {
        Self {
            text: draft.to_string(),
            corrected: false,
            called,
            issues_fixed: Vec::new(),
            unresolved,
        }
    }
}

/// Draft verifier
#[derive(Debug, Clone)]
pub struct Verifier {
    enabled: bool,
    completeness: CompletenessChecker,
    scripts: ScriptRegistry,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::from_config(&VerificationConfig::default())
    }
}

impl Verifier {
    pub fn new(enabled: bool, completeness: CompletenessChecker, scripts: ScriptRegistry) -> Self {
        Self {
            enabled,
            completeness,
            scripts,
        }
    }

    pub fn from_config(config: &VerificationConfig) -> Self {
        Self::new(
            config.enabled,
            CompletenessChecker::with_config(config.completeness.clone()),
            config.script_registry(),
        )
    }

    /// A verifier that accepts every draft
    pub fn disabled() -> Self {
        Self::new(false, CompletenessChecker::new(), ScriptRegistry::new())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run the local checks. Never calls the transform service.
    pub fn verify(&self, source_text: &str, draft_text: &str, target_language: &str) -> Verdict {
        if !self.enabled {
            return Verdict::from_issues(Vec::new());
        }

        let mut issues: Vec<Issue> = self
            .completeness
            .check(source_text, draft_text)
            .issues
            .into_iter()
            .map(Issue::Completeness)
            .collect();

        match self.scripts.get(target_language) {
            Some(spec) => issues.extend(
                ScriptValidator::validate(draft_text, spec)
                    .into_iter()
                    .map(Issue::Script),
            ),
            None => debug!("No script contract for '{}', skipping script check", target_language),
        }

        Verdict::from_issues(issues)
    }

    /// Issue one corrective call for `issues` and keep the better text.
    ///
    /// The call is made once. If it fails, the draft is kept and every issue
    /// is reported as unresolved.
    pub async fn correct(
        &self,
        gate: &CallGate,
        kind: UnitKind,
        source_text: &str,
        draft_text: &str,
        target_language: &str,
        issues: Vec<Issue>,
    ) -> Correction {
        let request = TransformRequest::new(
            prompts::correction_input(source_text, draft_text),
            target_language,
            prompts::correction_instructions(target_language, kind, &issues),
        );

        let candidate = match gate.call(&request).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Corrective call failed, keeping draft with {} issue(s): {}", issues.len(), e);
                return Correction::untouched(draft_text, issues, true);
            }
        };

        let recheck = self.verify(source_text, &candidate, target_language);
        if recheck.issues.len() > issues.len() {
            warn!(
                "Correction made things worse ({} -> {} issues), keeping draft",
                issues.len(),
                recheck.issues.len()
            );
            return Correction::untouched(draft_text, issues, true);
        }

        let (issues_fixed, _): (Vec<Issue>, Vec<Issue>) = issues
            .into_iter()
            .partition(|issue| !recheck.issues.iter().any(|left| left.category() == issue.category()));

        if !recheck.accepted {
            warn!(
                "{} issue(s) remain after correction: {}",
                recheck.issues.len(),
                recheck
                    .issues
                    .iter()
                    .map(|i| i.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            );
        }

        Correction {
            text: candidate,
            corrected: true,
            called: true,
            issues_fixed,
            unresolved: recheck.issues,
        }
    }

    /// Verify a draft and correct it only if something was found.
    ///
    /// A clean draft costs no external call.
    pub async fn review(
        &self,
        gate: &CallGate,
        kind: UnitKind,
        source_text: &str,
        draft_text: &str,
        target_language: &str,
    ) -> Correction {
        let verdict = self.verify(source_text, draft_text, target_language);
        if verdict.accepted {
            return Correction::untouched(draft_text, Vec::new(), false);
        }

        debug!("Draft has {} issue(s), requesting one correction", verdict.issues.len());
        self.correct(gate, kind, source_text, draft_text, target_language, verdict.issues)
            .await
    }
}
