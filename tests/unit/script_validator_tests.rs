/*!
 * Tests for script contracts and completeness checks
 */

use pagewright::app_config::VerificationConfig;
use pagewright::validation::{
    CompletenessChecker, CompletenessIssue, IssueKind, ScriptSpec, ScriptValidator,
};

fn kinds(text: &str, spec: &ScriptSpec) -> Vec<IssueKind> {
    ScriptValidator::validate(text, spec).iter().map(|i| i.kind).collect()
}

#[test]
fn test_validate_withJoinedYansaya_shouldAccept() {
    // ක්‍ය with the joiner in place
    let text = "වාක්\u{200D}යය හරි.";
    assert!(ScriptValidator::validate(text, &ScriptSpec::sinhala()).is_empty());
}

#[test]
fn test_validate_withBareRakaransaya_shouldReportOneMissingJoiner() {
    let text = "ශ්රී ලංකාව";

    let issues = ScriptValidator::validate(text, &ScriptSpec::sinhala());

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::MissingJoiner);
    assert_eq!(issues[0].position, 2);
    assert_eq!(issues[0].codepoint, 'ර');
}

#[test]
fn test_validate_withDevanagariText_shouldAcceptDanda() {
    assert!(kinds("यह ठीक है।", &ScriptSpec::devanagari()).is_empty());
}

#[test]
fn test_validate_withMixedScripts_shouldReportEachForeignCodepoint() {
    let kinds = kinds("தமிழ் ok", &ScriptSpec::tamil());
    assert_eq!(kinds, vec![IssueKind::ForeignScript, IssueKind::ForeignScript]);
}

#[test]
fn test_configuredSpec_shouldReplaceBuiltinForItsLanguages() {
    let json = r#"{
        "scripts": [{
            "name": "Sinhala (lenient)",
            "languages": ["si"],
            "allowed_ranges": [{ "low": 3456, "high": 3583 }, { "low": 65, "high": 122 }]
        }]
    }"#;
    let config: VerificationConfig = serde_json::from_str(json).unwrap();
    let registry = config.script_registry();

    let spec = registry.get("sin").unwrap();

    assert_eq!(spec.name, "Sinhala (lenient)");
    assert!(ScriptValidator::validate("ලංකාව ok", spec).is_empty());
    assert!(registry.get("ta").is_some());
}

#[test]
fn test_completeness_withDroppedSentences_shouldFlagOmission() {
    let source = "First point. Second point. Third point. Fourth point.";
    let draft = "First point.";

    let report = CompletenessChecker::new().check(source, draft);

    assert!(!report.passed());
    assert!(report.issues.iter().any(CompletenessIssue::is_omission));
}

#[test]
fn test_completeness_withShortSource_shouldSkipRatios() {
    let report = CompletenessChecker::new().check("Hi.", "A much longer greeting than needed.");
    assert!(report.passed());
}
