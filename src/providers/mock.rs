/*!
 * Mock transform client for testing.
 *
 * The mock answers each call through a responder closure that sees the
 * request and the zero-based call number, and records every call with its
 * (tokio) timestamp so tests can assert on call counts and spacing:
 * - `MockProvider::echo()` - Returns the submitted text unchanged
 * - `MockProvider::from_fn(..)` - Arbitrary scripted behaviour
 * - `MockProvider::failing(..)` - Always fails with the given failure
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::errors::ProviderError;

use super::{TransformClient, TransformRequest};

/// Failure the mock can simulate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// 429-style quota signal
    Throttled,
    /// Capacity signal
    Overloaded,
    /// Client-observed timeout
    TimedOut,
    /// Policy refusal
    Refused,
    /// Anything else
    Unknown,
    /// Never answers; the caller's deadline must fire
    Hang,
}

impl MockFailure {
    fn into_error(self) -> ProviderError {
        match self {
            Self::Throttled => ProviderError::RateLimitExceeded {
                message: "mock quota exhausted".to_string(),
                retry_after_secs: None,
            },
            Self::Overloaded => ProviderError::Overloaded("mock overloaded".to_string()),
            Self::TimedOut => ProviderError::Timeout(Duration::from_secs(30)),
            Self::Refused => ProviderError::ContentRefused("mock refusal".to_string()),
            Self::Unknown | Self::Hang => ProviderError::ApiError {
                status_code: 500,
                message: "mock internal error".to_string(),
            },
        }
    }
}

/// What the mock answers for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    Text(String),
    Fail(MockFailure),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// A recorded call
#[derive(Debug, Clone)]
pub struct MockCall {
    /// When the call reached the client
    pub at: Instant,
    /// What was submitted
    pub request: TransformRequest,
}

type Responder = dyn Fn(&TransformRequest, usize) -> MockReply + Send + Sync;

/// Scripted transform client
#[derive(Clone)]
pub struct MockProvider {
    responder: Arc<Responder>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockProvider")
            .field("calls", &self.calls.lock().len())
            .finish()
    }
}

impl MockProvider {
    /// Create a mock from a responder closure
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&TransformRequest, usize) -> MockReply + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Mock that returns the submitted text unchanged
    pub fn echo() -> Self {
        Self::from_fn(|request, _| MockReply::Text(request.text.clone()))
    }

    /// Mock that always fails
    pub fn failing(failure: MockFailure) -> Self {
        Self::from_fn(move |_, _| MockReply::Fail(failure))
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Snapshot of every call received so far
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Forget recorded calls
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl TransformClient for MockProvider {
    async fn submit(&self, request: &TransformRequest) -> Result<String, ProviderError> {
        let call_number = {
            let mut calls = self.calls.lock();
            calls.push(MockCall {
                at: Instant::now(),
                request: request.clone(),
            });
            calls.len() - 1
        };

        match (self.responder)(request, call_number) {
            MockReply::Text(text) => Ok(text),
            MockReply::Fail(MockFailure::Hang) => {
                std::future::pending::<()>().await;
                Err(MockFailure::Hang.into_error())
            }
            MockReply::Fail(failure) => Err(failure.into_error()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
