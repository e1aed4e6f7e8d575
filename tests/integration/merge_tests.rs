/*!
 * Merged calls for runs of short units
 */

use std::sync::Arc;

use pagewright::document::SizeConstraint;
use pagewright::providers::mock::{MockFailure, MockProvider, MockReply};
use pagewright::translation::JobOutcome;

use crate::common::{self, mock_providers};

const SHORT: SizeConstraint = SizeConstraint {
    max_chars: 4000,
    min_chars: 200,
};

#[tokio::test(start_paused = true)]
async fn test_run_withShortUnits_shouldMergeIntoOneCall() {
    let dir = common::create_temp_dir().unwrap();
    let job = common::job_with_size("notes", &["Caption one", "Caption two", "Caption three"], "fr", SHORT, &dir.path().join("out.json"));
    let mock = mock_providers::uppercase_translator();
    let engine = common::engine_with(Arc::new(mock.clone()), dir.path(), &common::fast_config());

    let JobOutcome::Completed(report) = engine.run(&job).await.unwrap() else {
        panic!("expected completion");
    };

    assert_eq!(mock.call_count(), 1);
    assert!(mock_providers::is_merged(&mock.calls()[0].request));
    let texts: Vec<&str> = report.results.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["CAPTION ONE", "CAPTION TWO", "CAPTION THREE"]);
}

#[tokio::test(start_paused = true)]
async fn test_run_withMangledMarkers_shouldFallBackToSingleCalls() {
    let dir = common::create_temp_dir().unwrap();
    let job = common::job_with_size("notes", &["Caption one", "Caption two"], "fr", SHORT, &dir.path().join("out.json"));
    let mock = MockProvider::from_fn(|request, _| {
        if mock_providers::is_merged(request) {
            // Markers dropped by the service
            MockReply::text("CAPTION ONE CAPTION TWO")
        } else {
            MockReply::text(request.text.to_uppercase())
        }
    });
    let engine = common::engine_with(Arc::new(mock.clone()), dir.path(), &common::fast_config());

    let JobOutcome::Completed(report) = engine.run(&job).await.unwrap() else {
        panic!("expected completion");
    };

    assert_eq!(mock.call_count(), 3);
    assert_eq!(report.results[0].text, "CAPTION ONE");
    assert_eq!(report.results[1].text, "CAPTION TWO");
}

#[tokio::test(start_paused = true)]
async fn test_run_withEmptyUnitInMergedResponse_shouldFallBackToSingleCalls() {
    let dir = common::create_temp_dir().unwrap();
    let job = common::job_with_size("notes", &["Caption one", "Caption two"], "fr", SHORT, &dir.path().join("out.json"));
    let mock = MockProvider::from_fn(|request, _| {
        if mock_providers::is_merged(request) {
            MockReply::text("<<UNIT_0>>\n<<UNIT_1>>\nCAPTION TWO\n<<END>>")
        } else {
            MockReply::text(request.text.to_uppercase())
        }
    });
    let mut config = common::fast_config();
    config.verification.enabled = false;
    let engine = common::engine_with(Arc::new(mock.clone()), dir.path(), &config);

    let JobOutcome::Completed(report) = engine.run(&job).await.unwrap() else {
        panic!("expected completion");
    };

    assert_eq!(mock.call_count(), 3);
    assert_eq!(report.results[0].text, "CAPTION ONE");
    assert_eq!(report.results[1].text, "CAPTION TWO");
}

#[tokio::test(start_paused = true)]
async fn test_run_withPaddedShortUnits_shouldKeepPaddingAroundMergedDrafts() {
    let dir = common::create_temp_dir().unwrap();
    let job = common::job_with_size("notes", &["  Caption one\n", "Caption two "], "fr", SHORT, &dir.path().join("out.json"));
    let mock = mock_providers::uppercase_translator();
    let engine = common::engine_with(Arc::new(mock.clone()), dir.path(), &common::fast_config());

    let JobOutcome::Completed(report) = engine.run(&job).await.unwrap() else {
        panic!("expected completion");
    };

    assert_eq!(mock.call_count(), 1);
    assert_eq!(report.results[0].text, "  CAPTION ONE\n");
    assert_eq!(report.results[1].text, "CAPTION TWO ");
}

#[tokio::test(start_paused = true)]
async fn test_run_withRefusedMergedCall_shouldIsolateTheRefusedUnit() {
    let dir = common::create_temp_dir().unwrap();
    let job = common::job_with_size("notes", &["fine", "forbidden", "also fine"], "fr", SHORT, &dir.path().join("out.json"));
    let mock = MockProvider::from_fn(|request, _| {
        if request.text.contains("forbidden") {
            MockReply::Fail(MockFailure::Refused)
        } else {
            MockReply::text(request.text.to_uppercase())
        }
    });
    let engine = common::engine_with(Arc::new(mock.clone()), dir.path(), &common::fast_config());

    let JobOutcome::Completed(report) = engine.run(&job).await.unwrap() else {
        panic!("expected completion");
    };

    // Three merged attempts, then one call per unit with three for the refused one
    assert_eq!(mock.call_count(), 3 + 1 + 3 + 1);
    assert_eq!(report.results[0].text, "FINE");
    assert!(report.results[1].text.is_empty());
    assert_eq!(report.results[2].text, "ALSO FINE");
    assert_eq!(report.stats.skipped, 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_withMergingDisabled_shouldCallPerUnit() {
    let dir = common::create_temp_dir().unwrap();
    let job = common::job_with_size("notes", &["a", "b", "c"], "fr", SHORT, &dir.path().join("out.json"));
    let mut config = common::fast_config();
    config.segmenter.merge_short_units = false;
    let mock = mock_providers::uppercase_translator();
    let engine = common::engine_with(Arc::new(mock.clone()), dir.path(), &config);

    assert!(engine.run(&job).await.unwrap().is_completed());
    assert_eq!(mock.call_count(), 3);
}
