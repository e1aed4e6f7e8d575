/*!
 * Tests for durable checkpoints
 */

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use pagewright::checkpoint::{Checkpoint, CheckpointStore, TransformResult};
use pagewright::errors::CheckpointError;

use crate::common;

fn checkpoint_with(job_id: &str, completed: usize, text_len: usize) -> Checkpoint {
    let mut checkpoint = Checkpoint::new(job_id, "fingerprint", 10_000);
    for ordinal in 0..completed {
        checkpoint
            .record(TransformResult::succeeded(ordinal, "x".repeat(text_len), 1))
            .unwrap();
    }
    checkpoint
}

#[test]
fn test_save_thenLoadFromSecondStore_shouldSeeSameProgress() {
    let dir = common::create_temp_dir().unwrap();
    let writer = CheckpointStore::new(dir.path());
    writer.save(&checkpoint_with("book-1", 4, 10)).unwrap();

    let reader = CheckpointStore::new(dir.path());
    let loaded = reader.load("book-1").unwrap().unwrap();

    assert_eq!(loaded.last_completed_index, 3);
    assert_eq!(loaded.next_ordinal(), 4);
    assert_eq!(loaded.results.len(), 4);
}

#[test]
fn test_save_withLowerIndexFromFreshStore_shouldBeRejected() {
    let dir = common::create_temp_dir().unwrap();
    CheckpointStore::new(dir.path())
        .save(&checkpoint_with("book-1", 6, 1))
        .unwrap();

    // A new store instance knows nothing in memory but reads the file
    let result = CheckpointStore::new(dir.path()).save(&checkpoint_with("book-1", 2, 1));

    assert!(matches!(
        result,
        Err(CheckpointError::Regression {
            previous: 5,
            attempted: 1,
            ..
        })
    ));
}

#[test]
fn test_save_withCorruptFile_shouldBeRecoverableByClear() {
    let dir = common::create_temp_dir().unwrap();
    let store = CheckpointStore::new(dir.path());
    let path = store.path_for("book-1").unwrap();
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(store.load("book-1"), Err(CheckpointError::Corrupt { .. })));
    assert!(store.clear("book-1").unwrap());
    assert!(store.load("book-1").unwrap().is_none());
}

#[test]
fn test_list_shouldSkipForeignFilesAndSortByJob() {
    let dir = common::create_temp_dir().unwrap();
    let store = CheckpointStore::new(dir.path());
    store.save(&checkpoint_with("zeta", 1, 1)).unwrap();
    store.save(&checkpoint_with("alpha", 2, 1)).unwrap();
    fs::write(dir.path().join("notes.txt"), "unrelated").unwrap();

    let jobs: Vec<String> = store.list().unwrap().into_iter().map(|c| c.job_id).collect();

    assert_eq!(jobs, vec!["alpha", "zeta"]);
}

#[test]
fn test_concurrentReader_shouldNeverSeeTruncatedCheckpoint() {
    let dir = common::create_temp_dir().unwrap();
    let directory = dir.path().to_path_buf();
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let directory = directory.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let store = CheckpointStore::new(directory);
            // Large results make a partially written file likely to be observed
            for completed in 1..=40 {
                store.save(&checkpoint_with("big-job", completed, 2_000)).unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let reader = CheckpointStore::new(directory);
    let mut observed = 0usize;
    let mut last_seen = 0usize;
    while !done.load(Ordering::SeqCst) {
        match reader.load("big-job") {
            Ok(Some(checkpoint)) => {
                assert_eq!(checkpoint.results.len(), checkpoint.last_completed_index + 1);
                assert!(checkpoint.last_completed_index >= last_seen);
                last_seen = checkpoint.last_completed_index;
                observed += 1;
            }
            Ok(None) => {}
            Err(e) => panic!("reader saw a broken checkpoint: {}", e),
        }
    }
    writer.join().unwrap();

    let final_state = reader.load("big-job").unwrap().unwrap();
    assert_eq!(final_state.last_completed_index, 39);
    assert!(observed > 0 || final_state.results.len() == 40);
}

#[test]
fn test_pathFor_withUnsafeJobId_shouldStayInsideDirectory() {
    let dir = common::create_temp_dir().unwrap();
    let store = CheckpointStore::new(dir.path());

    let path = store.path_for("../../etc/passwd").unwrap();

    assert_eq!(path.parent().unwrap(), dir.path());
    assert!(matches!(store.path_for("   "), Err(CheckpointError::InvalidJobId(_))));
}

#[test]
fn test_save_withIdsSharingSanitizedStem_shouldKeepJobsApart() {
    let dir = common::create_temp_dir().unwrap();
    let store = CheckpointStore::new(dir.path());
    store.save(&checkpoint_with("ch/1", 3, 1)).unwrap();

    // A fresh store reads from disk only
    let other = CheckpointStore::new(dir.path());
    other.save(&checkpoint_with("ch_1", 1, 1)).unwrap();

    assert_eq!(other.load("ch/1").unwrap().unwrap().last_completed_index, 2);
    assert_eq!(other.load("ch_1").unwrap().unwrap().last_completed_index, 0);
    assert_eq!(other.list().unwrap().len(), 2);
}
