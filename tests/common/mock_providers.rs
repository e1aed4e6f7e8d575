/*!
 * Scripted translators built on the library's mock client.
 *
 * Every responder here is a pure function of the request text, so two runs
 * of the same job produce the same drafts regardless of call order.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

use pagewright::providers::mock::{MockFailure, MockProvider, MockReply};
use pagewright::providers::TransformRequest;

/// Clean Sinhala sentence used for every source sentence
pub const SINHALA_SENTENCE: &str = "ලංකාව ඉතා ලස්සනයි.";

/// Whether the request is a corrective call
pub fn is_correction(request: &TransformRequest) -> bool {
    request.text.starts_with("SOURCE:\n")
}

/// Whether the request is a merged call
pub fn is_merged(request: &TransformRequest) -> bool {
    request.text.contains("<<UNIT_0>>")
}

/// Source part of a corrective request
pub fn correction_source(request: &TransformRequest) -> &str {
    request
        .text
        .trim_start_matches("SOURCE:\n")
        .split("\n\nDRAFT:\n")
        .next()
        .unwrap_or_default()
}

/// "Translates" by upper-casing; markers survive unchanged
pub fn uppercase_translator() -> MockProvider {
    MockProvider::from_fn(|request, _| MockReply::text(request.text.to_uppercase()))
}

/// One clean Sinhala sentence per source sentence
pub fn sinhala_for(source: &str) -> String {
    let sentences = source.matches('.').count().max(1);
    vec![SINHALA_SENTENCE; sentences].join(" ")
}

/// Clean Sinhala translator; corrective calls get the same treatment
pub fn sinhala_translator() -> MockProvider {
    MockProvider::from_fn(|request, _| {
        if is_correction(request) {
            MockReply::text(sinhala_for(correction_source(request)))
        } else {
            MockReply::text(sinhala_for(&request.text))
        }
    })
}

/// Upper-casing translator that refuses any text containing `needle`
pub fn refusing_on(needle: &'static str) -> MockProvider {
    MockProvider::from_fn(move |request, _| {
        if request.text.contains(needle) {
            MockReply::Fail(MockFailure::Refused)
        } else {
            MockReply::text(request.text.to_uppercase())
        }
    })
}

/// Upper-casing translator that fails with `failure` on texts containing
/// `needle` while `outage` is set
pub fn outage_on(needle: &'static str, failure: MockFailure, outage: Arc<AtomicBool>) -> MockProvider {
    MockProvider::from_fn(move |request, _| {
        if outage.load(Ordering::SeqCst) && request.text.contains(needle) {
            MockReply::Fail(failure)
        } else {
            MockReply::text(request.text.to_uppercase())
        }
    })
}

/// Upper-casing translator that signals `notify` when call number `at` arrives
pub fn notifying_at(at: usize, notify: Arc<Notify>) -> MockProvider {
    MockProvider::from_fn(move |request, n| {
        if n + 1 == at {
            notify.notify_one();
        }
        MockReply::text(request.text.to_uppercase())
    })
}
