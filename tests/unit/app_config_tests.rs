/*!
 * Tests for configuration loading and validation
 */

use std::fs;
use std::str::FromStr;
use std::time::Duration;

use pagewright::app_config::{Config, LogLevel, TransformProvider};

use crate::common;

#[test]
fn test_fromFile_withPartialJson_shouldFillDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("pagewright.json");
    fs::write(
        &path,
        r#"{
            "transform": { "provider": "ollama", "model": "qwen2.5" },
            "rate_limit": { "max_calls_per_window": 30 },
            "log_level": "debug"
        }"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.transform.get_model(), "qwen2.5");
    assert_eq!(config.transform.call_timeout(), Duration::from_secs(120));
    assert_eq!(config.rate_limit.max_calls_per_window, 30);
    assert_eq!(config.rate_limit.window(), Duration::from_secs(60));
    assert_eq!(config.rate_limit.min_spacing(), Duration::from_secs(4));
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.verification.enabled);
}

#[test]
fn test_fromFile_withInvalidValues_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{ "rate_limit": { "window_secs": 0 } }"#).unwrap();

    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_fromFile_withMissingFile_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    assert!(Config::from_file(dir.path().join("missing.json")).is_err());
}

#[test]
fn test_save_thenLoad_shouldPreserveSettings() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("nested").join("config.json");
    let mut config = Config::default();
    config.transform.provider = TransformProvider::Anthropic;
    config.transform.api_key = "test-key".to_string();
    config.segmenter.max_units_per_merge = 3;
    config.checkpoint.directory = Some(dir.path().join("cp"));

    config.save(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.transform.provider, TransformProvider::Anthropic);
    assert_eq!(loaded.transform.get_model(), "claude-3-5-sonnet-latest");
    assert_eq!(loaded.segmenter.max_units_per_merge, 3);
    assert_eq!(loaded.checkpoint.resolve_directory(), dir.path().join("cp"));
}

#[test]
fn test_validate_withAnthropicWithoutKey_shouldFail() {
    let mut config = Config::default();
    config.transform.provider = TransformProvider::Anthropic;

    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withInvertedRatioBand_shouldFail() {
    let mut config = Config::default();
    config.verification.completeness.min_char_ratio = 2.0;
    config.verification.completeness.max_char_ratio = 1.0;

    assert!(config.validate().is_err());
}

#[test]
fn test_transformProvider_fromStr_shouldIgnoreCase() {
    assert_eq!(TransformProvider::from_str("Anthropic").unwrap(), TransformProvider::Anthropic);
    assert_eq!(TransformProvider::from_str("OLLAMA").unwrap(), TransformProvider::Ollama);
    assert!(TransformProvider::from_str("openai").is_err());
}

#[test]
fn test_logLevel_shouldMapToFilter() {
    assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
    assert_eq!(LogLevel::default().to_level_filter(), log::LevelFilter::Info);
}
