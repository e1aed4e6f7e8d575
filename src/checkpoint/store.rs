use log::{debug, warn};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::app_config::CheckpointConfig;
use crate::errors::CheckpointError;
use crate::file_utils::FileManager;

use super::models::Checkpoint;

const CHECKPOINT_SUFFIX: &str = ".checkpoint.json";

/// Bytes of the job id digest kept in the file name
const ID_DIGEST_BYTES: usize = 8;

/// File-backed checkpoint store, one JSON file per job.
///
/// Saves go through a temporary file and a rename, so a reader sees either
/// the previous checkpoint or the new one. The store refuses any save that
/// would move a job's `lastCompletedIndex` backwards.
#[derive(Debug)]
pub struct CheckpointStore {
    directory: PathBuf,
    /// Highest index persisted per job by this store
    high_water: Mutex<HashMap<String, usize>>,
}

impl CheckpointStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            high_water: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &CheckpointConfig) -> Self {
        Self::new(config.resolve_directory())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File holding the checkpoint of `job_id`.
    ///
    /// Sanitizing alone is lossy ("ch/1" and "ch_1" share a stem), so the
    /// name also carries a digest of the raw id.
    pub fn path_for(&self, job_id: &str) -> Result<PathBuf, CheckpointError> {
        let stem = FileManager::sanitize_file_stem(job_id)
            .ok_or_else(|| CheckpointError::InvalidJobId(job_id.to_string()))?;
        let digest = Sha256::digest(job_id.as_bytes());
        let tag: String = digest[..ID_DIGEST_BYTES].iter().map(|b| format!("{:02x}", b)).collect();
        Ok(self.directory.join(format!("{}-{}{}", stem, tag, CHECKPOINT_SUFFIX)))
    }

    fn read(path: &Path) -> Result<Option<Checkpoint>, CheckpointError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CheckpointError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| CheckpointError::Corrupt {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Load the checkpoint of a job, if one exists
    pub fn load(&self, job_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let path = self.path_for(job_id)?;
        let Some(checkpoint) = Self::read(&path)? else {
            return Ok(None);
        };

        if checkpoint.job_id != job_id {
            warn!(
                "Checkpoint {:?} belongs to job '{}', not '{}'; ignoring it",
                path, checkpoint.job_id, job_id
            );
            return Ok(None);
        }

        self.high_water
            .lock()
            .entry(job_id.to_string())
            .and_modify(|index| *index = (*index).max(checkpoint.last_completed_index))
            .or_insert(checkpoint.last_completed_index);

        debug!(
            "Loaded checkpoint for job {} at index {}",
            job_id, checkpoint.last_completed_index
        );
        Ok(Some(checkpoint))
    }

    /// Atomically persist a checkpoint
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let path = self.path_for(&checkpoint.job_id)?;
        let mut high_water = self.high_water.lock();

        let previous = match high_water.get(&checkpoint.job_id) {
            Some(&index) => Some(index),
            None => Self::read(&path)
                .ok()
                .flatten()
                .map(|existing| existing.last_completed_index),
        };
        if let Some(previous) = previous {
            if checkpoint.last_completed_index < previous {
                return Err(CheckpointError::Regression {
                    job_id: checkpoint.job_id.clone(),
                    previous,
                    attempted: checkpoint.last_completed_index,
                });
            }
        }

        let json = serde_json::to_vec_pretty(checkpoint).map_err(|source| CheckpointError::Corrupt {
            path: path.clone(),
            source,
        })?;
        FileManager::write_atomic(&path, &json).map_err(|source| CheckpointError::Io {
            path: path.clone(),
            source,
        })?;

        high_water.insert(checkpoint.job_id.clone(), checkpoint.last_completed_index);
        debug!(
            "Saved checkpoint for job {} at index {}",
            checkpoint.job_id, checkpoint.last_completed_index
        );
        Ok(())
    }

    /// Remove the checkpoint of a finished job. Returns whether one existed.
    pub fn clear(&self, job_id: &str) -> Result<bool, CheckpointError> {
        let path = self.path_for(job_id)?;
        let mut high_water = self.high_water.lock();
        let removed = FileManager::remove_if_exists(&path).map_err(|source| CheckpointError::Io {
            path: path.clone(),
            source,
        })?;
        high_water.remove(job_id);
        if removed {
            debug!("Cleared checkpoint for job {}", job_id);
        }
        Ok(removed)
    }

    /// Every live checkpoint, i.e. every paused or interrupted job
    pub fn list(&self) -> Result<Vec<Checkpoint>, CheckpointError> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CheckpointError::Io {
                    path: self.directory.clone(),
                    source,
                });
            }
        };

        let mut checkpoints = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_checkpoint = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(CHECKPOINT_SUFFIX));
            if !is_checkpoint {
                continue;
            }
            match Self::read(&path) {
                Ok(Some(checkpoint)) => checkpoints.push(checkpoint),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable checkpoint: {}", e),
            }
        }

        checkpoints.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        Ok(checkpoints)
    }
}
