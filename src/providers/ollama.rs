use async_trait::async_trait;
use anyhow::{Result, anyhow};
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::app_config::TransformConfig;
use crate::errors::ProviderError;

use super::{TransformClient, TransformRequest, error_for_status, error_for_transport};

const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Client for a local Ollama server
#[derive(Debug)]
pub struct Ollama {
    /// Base URL, e.g. http://localhost:11434
    base_url: String,
    /// HTTP client for API requests
    client: Client,
    /// Model to use
    model: String,
    /// Temperature for generation
    temperature: f32,
    /// Client-side deadline, reported on timeouts
    timeout: Duration,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    pub model: String,

    /// Prompt to generate from
    pub prompt: String,

    /// System prompt to use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerationOptions>,

    /// Whether to stream the response
    pub stream: bool,
}

/// Model parameters for generation
#[derive(Debug, Serialize)]
pub struct GenerationOptions {
    /// Temperature for sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Generate response from the Ollama API
#[derive(Debug, Deserialize)]
pub struct GenerationResponse {
    /// Generated text
    #[serde(default)]
    pub response: String,

    /// Whether generation is complete
    #[serde(default)]
    pub done: bool,

    /// Reason generation finished, when reported
    #[serde(default)]
    pub done_reason: Option<String>,
}

/// Parse an endpoint string into a base URL with scheme and port
fn parse_endpoint(endpoint: &str) -> Result<String> {
    let endpoint = if endpoint.trim().is_empty() { DEFAULT_ENDPOINT } else { endpoint.trim() };

    let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Url::parse(endpoint)?
    } else {
        Url::parse(&format!("http://{}", endpoint))?
    };

    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("Invalid host in endpoint: {}", endpoint))?;
    let port = url.port().unwrap_or(if url.scheme() == "https" { 443 } else { 11434 });

    Ok(format!("{}://{}:{}", url.scheme(), host, port))
}

impl Ollama {
    /// Create a new Ollama client
    pub fn new(endpoint: &str, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            // Ollama uses HTTP/1.1
            .http1_only()
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| anyhow!("Failed to build Ollama HTTP client: {}", e))?;

        Ok(Self {
            base_url: parse_endpoint(endpoint)?,
            client,
            model: model.into(),
            temperature: 0.3,
            timeout,
        })
    }

    /// Create a client from the transform configuration
    pub fn from_config(config: &TransformConfig) -> Result<Self> {
        let mut client = Self::new(&config.endpoint, config.get_model(), config.call_timeout())?;
        client.temperature = config.temperature;
        Ok(client)
    }

    /// Base URL the client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TransformClient for Ollama {
    async fn submit(&self, request: &TransformRequest) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerationRequest {
            model: self.model.clone(),
            prompt: request.text.clone(),
            system: Some(request.instructions.clone()),
            options: Some(GenerationOptions {
                temperature: Some(self.temperature),
            }),
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| error_for_transport(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, error_text);
            return Err(error_for_status(status.as_u16(), error_text, None, self.timeout));
        }

        let parsed = response
            .json::<GenerationResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        if !parsed.done {
            return Err(ProviderError::ParseError("generation did not complete".to_string()));
        }

        debug!(
            "Ollama returned {} chars ({:?})",
            parsed.response.chars().count(),
            parsed.done_reason
        );
        Ok(parsed.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
