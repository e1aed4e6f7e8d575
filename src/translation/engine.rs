/*!
 * Sequential, resumable job driver.
 *
 * For one job the engine:
 * 1. Loads the job's checkpoint and skips every unit already recorded
 * 2. Plans the remaining units (merging short neighbours)
 * 3. Sends each text through the call gate, retrying per failure class
 * 4. Verifies each draft and issues at most one corrective call
 * 5. Records and atomically saves the checkpoint after every unit
 * 6. Writes the ordered results to the job's target path and clears the checkpoint
 *
 * Units are strictly sequential within a job. Several jobs may run at once
 * (`run_all`); they share nothing but the rate limiter and the store.
 */

use futures::future::join_all;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crate::app_config::Config;
use crate::checkpoint::{Checkpoint, CheckpointStore, JobStats, TransformResult, UnitStatus};
use crate::document::{Job, Unit, UnitKind};
use crate::errors::PipelineError;
use crate::file_utils::FileManager;
use crate::providers::{self, TransformClient, TransformRequest};
use crate::validation::MarkerValidator;

use super::gate::CallGate;
use super::prompts;
use super::rate_limiter::RateLimiter;
use super::retry::{ErrorClass, Exhaustion, RetryPolicy};
use super::segmenter::{Segmenter, WorkItem};
use super::verifier::{Issue, Verifier};

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    InProgress,
    Completed,
    Paused,
}

/// Lifecycle of a unit within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Pending,
    Transforming,
    RetryScheduled,
    Transformed,
    Validating,
    Correcting,
    SkippedPermanentFailure,
    Done,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Finished job
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub job_id: String,
    /// One result per unit, in ordinal order
    pub results: Vec<TransformResult>,
    pub stats: JobStats,
    /// Where the results were written
    pub output_path: PathBuf,
}

impl JobReport {
    pub fn result(&self, ordinal: usize) -> Option<&TransformResult> {
        self.results.get(ordinal)
    }

    /// Units whose text still has issues after correction
    pub fn needs_review(&self) -> Vec<&TransformResult> {
        self.results.iter().filter(|r| r.needs_review()).collect()
    }
}

/// How a run of a job ended
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Every unit reached a terminal status and the output was written
    Completed(JobReport),
    /// A unit exhausted its retries; the checkpoint is intact
    Paused {
        job_id: String,
        /// Unit that failed
        ordinal: usize,
        class: ErrorClass,
        /// First ordinal the next run will process
        resume_at: usize,
        message: String,
    },
    /// The operator stopped the run
    Aborted { job_id: String, resume_at: usize },
}

impl JobOutcome {
    pub fn job_id(&self) -> &str {
        match self {
            Self::Completed(report) => &report.job_id,
            Self::Paused { job_id, .. } | Self::Aborted { job_id, .. } => job_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn state(&self) -> JobState {
        match self {
            Self::Completed(_) => JobState::Completed,
            Self::Paused { .. } | Self::Aborted { .. } => JobState::Paused,
        }
    }
}

/// Document written to a job's target path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutput {
    pub job_id: String,
    pub source_fingerprint: String,
    pub results: Vec<TransformResult>,
}

/// A failure that escalated past the retry policy
#[derive(Debug, Clone)]
struct CallFailure {
    class: ErrorClass,
    attempts: u32,
    message: String,
}

/// A unit that stops the job
#[derive(Debug, Clone)]
struct Stop {
    ordinal: usize,
    class: ErrorClass,
    message: String,
}

/// Drives jobs through segmentation, gated calls, verification and checkpoints
#[derive(Debug)]
pub struct PipelineEngine {
    gate: CallGate,
    policy: RetryPolicy,
    segmenter: Segmenter,
    verifier: Verifier,
    store: Arc<CheckpointStore>,
}

impl PipelineEngine {
    /// Create an engine around an existing client, limiter and store
    pub fn new(
        client: Arc<dyn TransformClient>,
        limiter: Arc<RateLimiter>,
        store: Arc<CheckpointStore>,
        config: &Config,
    ) -> Self {
        Self {
            gate: CallGate::new(client, limiter, config.transform.call_timeout()),
            policy: config.retry.clone(),
            segmenter: Segmenter::from_config(&config.segmenter),
            verifier: Verifier::from_config(&config.verification),
            store,
        }
    }

    /// Build everything from configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;
        let client = providers::build_client(&config.transform)?;
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        let store = Arc::new(CheckpointStore::from_config(&config.checkpoint));
        info!(
            "Pipeline using {} with at most {} calls per {:?}, {:?} apart",
            client.name(),
            limiter.max_calls(),
            limiter.window(),
            limiter.min_spacing()
        );
        Ok(Self::new(client, limiter, store, config))
    }

    pub fn with_verifier(mut self, verifier: Verifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_segmenter(mut self, segmenter: Segmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        self.gate.limiter()
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Run a job to completion or pause
    pub async fn run(&self, job: &Job) -> Result<JobOutcome, PipelineError> {
        self.run_until(job, std::future::pending::<()>()).await
    }

    /// Run a job until it finishes, pauses, or `abort` resolves.
    ///
    /// Aborting drops the in-flight unit; it is retried on the next run.
    pub async fn run_until<F>(&self, job: &Job, abort: F) -> Result<JobOutcome, PipelineError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = abort => {
                let resume_at = self
                    .store
                    .load(job.job_id())?
                    .map(|checkpoint| checkpoint.next_ordinal())
                    .unwrap_or(0);
                warn!("Job {} aborted; next run resumes at unit {}", job.job_id(), resume_at);
                Ok(JobOutcome::Aborted {
                    job_id: job.job_id().to_string(),
                    resume_at,
                })
            }
            outcome = self.drive(job) => outcome,
        }
    }

    /// Run several jobs concurrently, sharing this engine's rate limiter
    pub async fn run_all(&self, jobs: &[Job]) -> Vec<Result<JobOutcome, PipelineError>> {
        info!("Running {} job(s) concurrently", jobs.len());
        join_all(jobs.iter().map(|job| self.run(job))).await
    }

    async fn drive(&self, job: &Job) -> Result<JobOutcome, PipelineError> {
        let fingerprint = job.fingerprint();
        let mut checkpoint = match self.store.load(job.job_id())? {
            Some(existing) if existing.source_fingerprint == fingerprint => {
                info!(
                    "Job {}: resuming at unit {} of {}",
                    job.job_id(),
                    existing.next_ordinal(),
                    job.len()
                );
                existing
            }
            Some(stale) => {
                warn!(
                    "Job {}: units changed since the checkpoint was written, discarding {} result(s)",
                    job.job_id(),
                    stale.results.len()
                );
                self.store.clear(job.job_id())?;
                Checkpoint::new(job.job_id(), fingerprint.as_str(), job.len())
            }
            None => {
                if let Some(output) = self.finished_output(job, &fingerprint) {
                    info!("Job {}: output already complete, nothing to do", job.job_id());
                    return Ok(JobOutcome::Completed(self.report_from_output(job, output)));
                }
                Checkpoint::new(job.job_id(), fingerprint.as_str(), job.len())
            }
        };

        info!("Job {}: {} -> {}", job.job_id(), JobState::Pending, JobState::InProgress);

        let start = checkpoint.next_ordinal().min(job.len());
        let remaining = &job.units()[start..];
        for item in self.segmenter.plan(remaining) {
            let stop = match item {
                WorkItem::Single(unit) => self.run_unit(unit, &mut checkpoint).await?,
                WorkItem::Merged(units) => self.run_merged(&units, &mut checkpoint).await?,
            };

            if let Some(stop) = stop {
                // Saved even with no results so the calls spent are counted on resume
                self.store.save(&checkpoint)?;
                let resume_at = checkpoint.next_ordinal();
                error!(
                    "Job {}: {} -> {} at unit {} ({}): {}. Resume at unit {}",
                    job.job_id(),
                    JobState::InProgress,
                    JobState::Paused,
                    stop.ordinal,
                    stop.class,
                    stop.message,
                    resume_at
                );
                return Ok(JobOutcome::Paused {
                    job_id: job.job_id().to_string(),
                    ordinal: stop.ordinal,
                    class: stop.class,
                    resume_at,
                    message: stop.message,
                });
            }
        }

        let report = self.finish(job, checkpoint, fingerprint)?;
        info!(
            "Job {}: {} -> {} ({} succeeded, {} skipped, {} need review, {} call(s))",
            job.job_id(),
            JobState::InProgress,
            JobState::Completed,
            report.stats.succeeded,
            report.stats.skipped,
            report.stats.needs_review,
            report.stats.total_calls()
        );
        Ok(JobOutcome::Completed(report))
    }

    /// Record a terminal result and persist the checkpoint
    fn commit(&self, checkpoint: &mut Checkpoint, result: TransformResult) -> Result<(), PipelineError> {
        let state = match result.status {
            UnitStatus::Succeeded => UnitState::Done,
            UnitStatus::SkippedPermanentFailure => UnitState::SkippedPermanentFailure,
        };
        debug!("Unit {}: {}", result.ordinal, state);
        checkpoint.record(result)?;
        self.store.save(checkpoint)?;
        Ok(())
    }

    async fn run_unit(&self, unit: &Unit, checkpoint: &mut Checkpoint) -> Result<Option<Stop>, PipelineError> {
        match self.transform_unit(unit, &mut checkpoint.stats).await {
            Ok(result) => {
                self.commit(checkpoint, result)?;
                Ok(None)
            }
            Err(stop) => Ok(Some(stop)),
        }
    }

    async fn run_merged(
        &self,
        units: &[&Unit],
        checkpoint: &mut Checkpoint,
    ) -> Result<Option<Stop>, PipelineError> {
        let Some(first) = units.first() else {
            return Ok(None);
        };
        let texts: Vec<&str> = units.iter().map(|u| u.source_text().trim()).collect();
        let request = TransformRequest::new(
            MarkerValidator::join(&texts),
            first.target_language(),
            prompts::merged_instructions(first.target_language(), first.kind()),
        );
        debug!("Units {}..={}: merged call", first.ordinal(), first.ordinal() + units.len() - 1);

        match self.call_with_retry(&request, first.ordinal(), &mut checkpoint.stats).await {
            Ok((response, attempts)) => match MarkerValidator::split(&response, units.len()) {
                Ok(drafts) => {
                    for (unit, draft) in units.iter().zip(drafts) {
                        let result = self.review_unit(unit, &draft, attempts, &mut checkpoint.stats).await;
                        self.commit(checkpoint, result)?;
                    }
                    return Ok(None);
                }
                Err(e) => warn!(
                    "Merged response for units starting at {} unusable ({}), falling back to single calls",
                    first.ordinal(),
                    e
                ),
            },
            Err(failure) if failure.class == ErrorClass::ContentRefused => warn!(
                "Merged call starting at unit {} refused, falling back to single calls",
                first.ordinal()
            ),
            Err(failure) => {
                return Ok(Some(Stop {
                    ordinal: first.ordinal(),
                    class: failure.class,
                    message: failure.message,
                }));
            }
        }

        for unit in units {
            if let Some(stop) = self.run_unit(unit, checkpoint).await? {
                return Ok(Some(stop));
            }
        }
        Ok(None)
    }

    /// Transform one unit chunk by chunk, verifying each chunk
    async fn transform_unit(&self, unit: &Unit, stats: &mut JobStats) -> Result<TransformResult, Stop> {
        if unit.source_text().trim().is_empty() {
            return Ok(TransformResult::succeeded(unit.ordinal(), unit.source_text(), 0));
        }

        let chunks = Segmenter::segment_unit(unit);
        let instructions = prompts::transform_instructions(unit.target_language(), unit.kind());
        let mut outputs = Vec::with_capacity(chunks.len());
        let mut attempts = 0;
        let mut issues_fixed = Vec::new();
        let mut unresolved = Vec::new();
        let mut corrected = false;

        for chunk in &chunks {
            if chunk.body.trim().is_empty() {
                outputs.push(chunk.body.clone());
                continue;
            }

            let (lead, core, tail) = split_padding(&chunk.body);
            let request = TransformRequest::new(core, unit.target_language(), instructions.as_str());
            let draft = match self.call_with_retry(&request, unit.ordinal(), stats).await {
                Ok((draft, spent)) => {
                    attempts += spent;
                    draft
                }
                Err(failure) => {
                    attempts += failure.attempts;
                    return match RetryPolicy::on_exhausted(failure.class) {
                        Exhaustion::SkipUnit => {
                            warn!(
                                "Unit {}: {} after {} attempt(s), skipping it",
                                unit.ordinal(),
                                failure.class,
                                failure.attempts
                            );
                            Ok(TransformResult::skipped(unit.ordinal(), attempts))
                        }
                        Exhaustion::PauseJob => Err(Stop {
                            ordinal: unit.ordinal(),
                            class: failure.class,
                            message: failure.message,
                        }),
                    };
                }
            };

            let review = self
                .check_draft(unit.kind(), core, draft.trim(), unit.target_language(), unit.ordinal(), stats)
                .await;
            corrected |= review.corrected;
            issues_fixed.extend(review.issues_fixed);
            unresolved.extend(review.unresolved);
            outputs.push(format!("{}{}{}", lead, review.text, tail));
        }

        Ok(TransformResult {
            ordinal: unit.ordinal(),
            text: Segmenter::reassemble(&chunks, &outputs),
            status: UnitStatus::Succeeded,
            issues_fixed,
            unresolved_issues: unresolved,
            corrected,
            attempts,
        })
    }

    /// Verify a draft that came out of a merged call
    async fn review_unit(&self, unit: &Unit, draft: &str, attempts: u32, stats: &mut JobStats) -> TransformResult {
        let (lead, core, tail) = split_padding(unit.source_text());
        let review = self
            .check_draft(unit.kind(), core, draft, unit.target_language(), unit.ordinal(), stats)
            .await;
        TransformResult {
            ordinal: unit.ordinal(),
            text: format!("{}{}{}", lead, review.text, tail),
            status: UnitStatus::Succeeded,
            issues_fixed: review.issues_fixed,
            unresolved_issues: review.unresolved,
            corrected: review.corrected,
            attempts,
        }
    }

    async fn check_draft(
        &self,
        kind: UnitKind,
        source: &str,
        draft: &str,
        target_language: &str,
        ordinal: usize,
        stats: &mut JobStats,
    ) -> DraftReview {
        debug!("Unit {}: {}", ordinal, UnitState::Validating);
        let verdict = self.verifier.verify(source, draft, target_language);
        if verdict.accepted {
            return DraftReview {
                text: draft.to_string(),
                corrected: false,
                issues_fixed: Vec::new(),
                unresolved: Vec::new(),
            };
        }

        debug!("Unit {}: {} ({} issue(s))", ordinal, UnitState::Correcting, verdict.issues.len());
        let correction = self
            .verifier
            .correct(&self.gate, kind, source, draft, target_language, verdict.issues)
            .await;
        if correction.called {
            stats.correction_calls += 1;
        }
        DraftReview {
            text: correction.text,
            corrected: correction.corrected,
            issues_fixed: correction.issues_fixed,
            unresolved: correction.unresolved,
        }
    }

    /// One logical call with per-class retries. Returns the text and attempts spent.
    async fn call_with_retry(
        &self,
        request: &TransformRequest,
        ordinal: usize,
        stats: &mut JobStats,
    ) -> Result<(String, u32), CallFailure> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            debug!("Unit {}: {} (attempt {})", ordinal, UnitState::Transforming, attempt);
            stats.transform_calls += 1;

            let error = match self.gate.call(request).await {
                Ok(text) => {
                    debug!("Unit {}: {}", ordinal, UnitState::Transformed);
                    return Ok((text, attempt));
                }
                Err(error) => error,
            };

            let class = ErrorClass::classify(&error);
            let decision = self.policy.decide(class, attempt, error.retry_after());
            if !decision.should_retry {
                warn!("Unit {}: {} on attempt {}, giving up: {}", ordinal, class, attempt, error);
                return Err(CallFailure {
                    class,
                    attempts: attempt,
                    message: error.to_string(),
                });
            }

            stats.retries += 1;
            warn!(
                "Unit {}: {} on attempt {} ({}), {} in {:?}",
                ordinal,
                class,
                attempt,
                error,
                UnitState::RetryScheduled,
                decision.delay
            );
            tokio::time::sleep(decision.delay).await;
        }
    }

    /// Read back a previously written output that matches this job
    fn finished_output(&self, job: &Job, fingerprint: &str) -> Option<JobOutput> {
        if !FileManager::file_exists(job.target_path()) {
            return None;
        }
        let content = match FileManager::read_to_string(job.target_path()) {
            Ok(content) => content,
            Err(e) => {
                debug!("Ignoring unreadable output for job {}: {}", job.job_id(), e);
                return None;
            }
        };
        serde_json::from_str::<JobOutput>(&content)
            .ok()
            .filter(|output| {
                output.job_id == job.job_id()
                    && output.source_fingerprint == fingerprint
                    && output.results.len() == job.len()
            })
    }

    fn report_from_output(&self, job: &Job, output: JobOutput) -> JobReport {
        let mut stats = JobStats::new(job.len());
        for result in &output.results {
            match result.status {
                UnitStatus::Succeeded => stats.succeeded += 1,
                UnitStatus::SkippedPermanentFailure => stats.skipped += 1,
            }
            if result.corrected {
                stats.corrected += 1;
            }
            if result.needs_review() {
                stats.needs_review += 1;
            }
        }
        JobReport {
            job_id: output.job_id,
            results: output.results,
            stats,
            output_path: job.target_path().to_path_buf(),
        }
    }

    /// Deliver the output, then clear the checkpoint
    fn finish(&self, job: &Job, checkpoint: Checkpoint, fingerprint: String) -> Result<JobReport, PipelineError> {
        let output = JobOutput {
            job_id: job.job_id().to_string(),
            source_fingerprint: fingerprint,
            results: checkpoint.ordered_results(),
        };

        let output_error = |message: String| PipelineError::Output {
            path: job.target_path().to_path_buf(),
            message,
        };
        let json = serde_json::to_vec_pretty(&output).map_err(|e| output_error(e.to_string()))?;
        FileManager::write_atomic(job.target_path(), &json).map_err(|e| output_error(e.to_string()))?;
        self.store.clear(job.job_id())?;

        Ok(JobReport {
            job_id: output.job_id,
            results: output.results,
            stats: checkpoint.stats,
            output_path: job.target_path().to_path_buf(),
        })
    }
}

/// Split `text` into leading whitespace, content and trailing whitespace.
///
/// Only the content is sent out; the padding is put back around the draft.
fn split_padding(text: &str) -> (&str, &str, &str) {
    let start = text.len() - text.trim_start().len();
    let end = start + text[start..].trim_end().len();
    (&text[..start], &text[start..end], &text[end..])
}

/// Text chosen for one draft after verification
struct DraftReview {
    text: String,
    corrected: bool,
    issues_fixed: Vec<Issue>,
    unresolved: Vec<Issue>,
}
