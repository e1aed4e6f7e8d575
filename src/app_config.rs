use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::document::SizeConstraint;
use crate::file_utils::FileManager;
use crate::translation::retry::RetryPolicy;
use crate::validation::{CompletenessConfig, ScriptRegistry, ScriptSpec};

/// Application configuration module
/// This module handles the pipeline configuration including loading,
/// validating and saving configuration settings.
/// Represents the pipeline configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Transform service settings
    #[serde(default)]
    pub transform: TransformConfig,

    /// Request-rate ceiling for the service account
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Per-failure-class retry table
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Splitting and merging of units
    #[serde(default)]
    pub segmenter: SegmenterConfig,

    /// Draft verification settings
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Where checkpoints live
    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Transform service type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransformProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: Anthropic
    Anthropic,
}

impl TransformProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::Anthropic => "Anthropic",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::Anthropic => "anthropic".to_string(),
        }
    }
}

impl std::fmt::Display for TransformProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TransformProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Transform service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransformConfig {
    // @field: Provider type
    #[serde(default)]
    pub provider: TransformProvider,

    // @field: Model name (empty = provider default)
    #[serde(default)]
    pub model: String,

    // @field: API key
    #[serde(default)]
    pub api_key: String,

    // @field: Service URL (empty = provider default)
    #[serde(default)]
    pub endpoint: String,

    // @field: Hard deadline for a single call
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    // @field: Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    // @field: Maximum tokens per response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            provider: TransformProvider::default(),
            model: String::new(),
            api_key: String::new(),
            endpoint: String::new(),
            call_timeout_secs: default_call_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl TransformConfig {
    /// Deadline for one external call
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Get the model, falling back to the provider default
    pub fn get_model(&self) -> String {
        if !self.model.is_empty() {
            return self.model.clone();
        }
        match self.provider {
            TransformProvider::Ollama => default_ollama_model(),
            TransformProvider::Anthropic => default_anthropic_model(),
        }
    }
}

/// Rate ceiling of the transform service account
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RateLimitConfig {
    /// Length of the sliding window
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Calls admitted per window
    #[serde(default = "default_max_calls_per_window")]
    pub max_calls_per_window: usize,

    /// Minimum gap between consecutive calls
    #[serde(default = "default_min_spacing_ms")]
    pub min_spacing_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_calls_per_window: default_max_calls_per_window(),
            min_spacing_ms: default_min_spacing_ms(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }
}

/// Splitting and merging settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SegmenterConfig {
    /// Whether undersized adjacent units share one call
    #[serde(default = "default_true")]
    pub merge_short_units: bool,

    /// Upper bound on units per merged call
    #[serde(default = "default_max_units_per_merge")]
    pub max_units_per_merge: usize,

    /// Size constraint for units built from plain texts
    #[serde(default = "default_max_chars")]
    pub default_max_chars: usize,

    #[serde(default = "default_min_chars")]
    pub default_min_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            merge_short_units: true,
            max_units_per_merge: default_max_units_per_merge(),
            default_max_chars: default_max_chars(),
            default_min_chars: default_min_chars(),
        }
    }
}

impl SegmenterConfig {
    /// Size constraint for units built from plain texts
    pub fn default_size_constraint(&self) -> SizeConstraint {
        SizeConstraint::new(self.default_max_chars, self.default_min_chars)
    }
}

/// Draft verification settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VerificationConfig {
    /// Whether drafts are verified at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Completeness ratio bands
    #[serde(default)]
    pub completeness: CompletenessConfig,

    /// Script contracts added to (or replacing) the built-in ones
    #[serde(default)]
    pub scripts: Vec<ScriptSpec>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            completeness: CompletenessConfig::default(),
            scripts: Vec::new(),
        }
    }
}

impl VerificationConfig {
    /// Built-in script contracts overlaid with the configured ones
    pub fn script_registry(&self) -> ScriptRegistry {
        let mut registry = ScriptRegistry::with_builtins();
        for spec in &self.scripts {
            registry.register(spec.clone());
        }
        registry
    }
}

/// Checkpoint location
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CheckpointConfig {
    /// Directory for checkpoint files (default: platform data dir)
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl CheckpointConfig {
    /// Configured directory, or `<data dir>/pagewright/checkpoints`
    pub fn resolve_directory(&self) -> PathBuf {
        if let Some(dir) = &self.directory {
            return dir.clone();
        }
        dirs::data_local_dir()
            .map(|d| d.join("pagewright").join("checkpoints"))
            .unwrap_or_else(|| PathBuf::from(".pagewright").join("checkpoints"))
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter for hosts installing a logger
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_call_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_calls_per_window() -> usize {
    15
}

fn default_min_spacing_ms() -> u64 {
    4000
}

fn default_true() -> bool {
    true
}

fn default_max_units_per_merge() -> usize {
    8
}

fn default_max_chars() -> usize {
    4000
}

fn default_min_chars() -> usize {
    200
}

fn default_ollama_model() -> String {
    "llama3.1".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-latest".to_string()
}

impl Config {
    /// Load a configuration file (JSON)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = FileManager::read_to_string(&path)?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid configuration in {:?}", path.as_ref()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        FileManager::write_atomic(&path, json.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.transform.provider == TransformProvider::Anthropic && self.transform.api_key.is_empty() {
            return Err(anyhow!("Transform API key is required for Anthropic provider"));
        }
        if self.transform.call_timeout_secs == 0 {
            return Err(anyhow!("call_timeout_secs must be positive"));
        }

        if self.rate_limit.max_calls_per_window == 0 {
            return Err(anyhow!("max_calls_per_window must be at least 1"));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(anyhow!("window_secs must be positive"));
        }

        self.retry.validate()?;

        if self.segmenter.max_units_per_merge == 0 {
            return Err(anyhow!("max_units_per_merge must be at least 1"));
        }
        if self.segmenter.default_max_chars == 0 {
            return Err(anyhow!("default_max_chars must be positive"));
        }

        let completeness = &self.verification.completeness;
        if completeness.min_char_ratio >= completeness.max_char_ratio {
            return Err(anyhow!("min_char_ratio must be below max_char_ratio"));
        }
        if completeness.min_clause_ratio >= completeness.max_clause_ratio {
            return Err(anyhow!("min_clause_ratio must be below max_clause_ratio"));
        }

        Ok(())
    }
}
