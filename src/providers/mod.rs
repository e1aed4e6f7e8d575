/*!
 * Transform service clients.
 *
 * The pipeline only sees the `TransformClient` trait: submit a text with
 * instructions, get a draft back or a `ProviderError`. Implementations:
 * - Anthropic: Anthropic Messages API
 * - Ollama: Local LLM server
 * - Mock: Scripted in-process client for tests and dry runs
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Result;

use crate::app_config::{TransformConfig, TransformProvider};
use crate::errors::ProviderError;

/// One call to the transform service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    /// Text to transform
    pub text: String,
    /// Target language code
    pub target_language: String,
    /// Instructions for the service (system prompt)
    pub instructions: String,
}

impl TransformRequest {
    pub fn new(
        text: impl Into<String>,
        target_language: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            target_language: target_language.into(),
            instructions: instructions.into(),
        }
    }
}

/// Common trait for all transform service clients
///
/// Implementations report failures through the `ProviderError` variants
/// that the retry classifier understands: rate limiting, overload,
/// timeouts and content refusals.
#[async_trait]
pub trait TransformClient: Send + Sync + Debug {
    /// Submit one request and return the draft text
    async fn submit(&self, request: &TransformRequest) -> Result<String, ProviderError>;

    /// Short provider name for logs
    fn name(&self) -> &str;
}

/// Map a non-success HTTP status onto the failure taxonomy
pub(crate) fn error_for_status(
    status_code: u16,
    message: String,
    retry_after_secs: Option<u64>,
    deadline: std::time::Duration,
) -> ProviderError {
    match status_code {
        429 => ProviderError::RateLimitExceeded {
            message,
            retry_after_secs,
        },
        // 529 is Anthropic's "overloaded"
        502 | 503 | 529 => ProviderError::Overloaded(message),
        408 | 504 => ProviderError::Timeout(deadline),
        401 | 403 => ProviderError::AuthenticationError(message),
        _ => ProviderError::ApiError {
            status_code,
            message,
        },
    }
}

/// Map a transport-level reqwest failure onto the failure taxonomy
pub(crate) fn error_for_transport(error: reqwest::Error, deadline: std::time::Duration) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(deadline)
    } else if error.is_connect() {
        ProviderError::ConnectionError(error.to_string())
    } else {
        ProviderError::RequestFailed(error.to_string())
    }
}

/// Build the client selected by configuration
pub fn build_client(config: &TransformConfig) -> Result<Arc<dyn TransformClient>> {
    let client: Arc<dyn TransformClient> = match config.provider {
        TransformProvider::Anthropic => Arc::new(anthropic::Anthropic::from_config(config)?),
        TransformProvider::Ollama => Arc::new(ollama::Ollama::from_config(config)?),
    };
    Ok(client)
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
