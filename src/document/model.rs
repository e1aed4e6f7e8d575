/*!
 * Unit and job types.
 *
 * Resume correctness depends on a job's unit order being stable across runs,
 * so `Job::new` insists that ordinals are exactly `0..len` in order and the
 * job carries a fingerprint of everything that would change a result.
 */

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::errors::PipelineError;

/// Structural role of a unit within its document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Chapter or section heading
    Title,
    /// Running body passage
    #[default]
    Body,
    /// Footnote or page footer
    Footer,
}

impl UnitKind {
    /// Lowercase identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Body => "body",
            Self::Footer => "footer",
        }
    }
}

/// Per-unit size limits, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeConstraint {
    /// Largest text sent in a single call
    pub max_chars: usize,
    /// Units shorter than this may be merged with their neighbours
    pub min_chars: usize,
}

impl SizeConstraint {
    /// Create a constraint; `max_chars` is clamped to at least 1
    pub fn new(max_chars: usize, min_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
            min_chars,
        }
    }
}

impl Default for SizeConstraint {
    fn default() -> Self {
        Self::new(4000, 200)
    }
}

/// One atomic piece of source text. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    id: String,
    ordinal: usize,
    kind: UnitKind,
    source_text: String,
    target_language: String,
    size_constraint: SizeConstraint,
}

impl Unit {
    /// Create a new unit
    pub fn new(
        id: impl Into<String>,
        ordinal: usize,
        kind: UnitKind,
        source_text: impl Into<String>,
        target_language: impl Into<String>,
        size_constraint: SizeConstraint,
    ) -> Self {
        Self {
            id: id.into(),
            ordinal,
            kind,
            source_text: source_text.into(),
            target_language: target_language.into(),
            size_constraint,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    pub fn size_constraint(&self) -> SizeConstraint {
        self.size_constraint
    }

    /// Length of the source text in characters
    pub fn char_len(&self) -> usize {
        self.source_text.chars().count()
    }
}

/// An ordered collection of units representing one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    job_id: String,
    units: Vec<Unit>,
    target_path: PathBuf,
}

impl Job {
    /// Create a job, checking that ordinals run `0..len` in order
    pub fn new(
        job_id: impl Into<String>,
        units: Vec<Unit>,
        target_path: impl Into<PathBuf>,
    ) -> Result<Self, PipelineError> {
        let job_id = job_id.into();
        if job_id.trim().is_empty() {
            return Err(PipelineError::InvalidJob("job id is empty".to_string()));
        }

        for (index, unit) in units.iter().enumerate() {
            if unit.ordinal != index {
                return Err(PipelineError::InvalidJob(format!(
                    "unit {} has ordinal {} at position {}",
                    unit.id, unit.ordinal, index
                )));
            }
        }

        Ok(Self {
            job_id,
            units,
            target_path: target_path.into(),
        })
    }

    /// Build a job from plain texts, assigning ordinals and random unit ids
    pub fn from_texts<I, S>(
        job_id: impl Into<String>,
        texts: I,
        target_language: &str,
        size_constraint: SizeConstraint,
        target_path: impl Into<PathBuf>,
    ) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (UnitKind, S)>,
        S: Into<String>,
    {
        let units = texts
            .into_iter()
            .enumerate()
            .map(|(ordinal, (kind, text))| {
                Unit::new(
                    Uuid::new_v4().to_string(),
                    ordinal,
                    kind,
                    text,
                    target_language,
                    size_constraint,
                )
            })
            .collect();

        Self::new(job_id, units, target_path)
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// SHA-256 over everything that determines the job's results.
    ///
    /// Unit ids are excluded: upstream may regenerate them between runs
    /// without changing the content.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.job_id.as_bytes());
        hasher.update([0u8]);

        for unit in &self.units {
            hasher.update((unit.ordinal as u64).to_le_bytes());
            hasher.update(unit.kind.as_str().as_bytes());
            hasher.update([0u8]);
            hasher.update(unit.target_language.as_bytes());
            hasher.update([0u8]);
            hasher.update((unit.size_constraint.max_chars as u64).to_le_bytes());
            hasher.update((unit.size_constraint.min_chars as u64).to_le_bytes());
            hasher.update((unit.source_text.len() as u64).to_le_bytes());
            hasher.update(unit.source_text.as_bytes());
        }

        format!("{:x}", hasher.finalize())
    }
}
