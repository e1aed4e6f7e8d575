use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{TransformClient, TransformRequest};

use super::rate_limiter::RateLimiter;

/// The only way the pipeline reaches the transform service.
///
/// Every call, corrective ones included, first passes the shared rate
/// limiter and then runs under a hard deadline.
#[derive(Debug, Clone)]
pub struct CallGate {
    client: Arc<dyn TransformClient>,
    limiter: Arc<RateLimiter>,
    deadline: Duration,
}

impl CallGate {
    pub fn new(client: Arc<dyn TransformClient>, limiter: Arc<RateLimiter>, deadline: Duration) -> Self {
        Self {
            client,
            limiter,
            deadline,
        }
    }

    /// Issue exactly one external call
    pub async fn call(&self, request: &TransformRequest) -> Result<String, ProviderError> {
        let waited = self.limiter.acquire().await;
        if !waited.is_zero() {
            debug!("Waited {:?} for a call slot", waited);
        }

        let text = match tokio::time::timeout(self.deadline, self.client.submit(request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("{} call exceeded its {:?} deadline", self.client.name(), self.deadline);
                return Err(ProviderError::Timeout(self.deadline));
            }
        };

        if text.trim().is_empty() && !request.text.trim().is_empty() {
            return Err(ProviderError::ParseError(format!(
                "{} returned an empty response",
                self.client.name()
            )));
        }
        Ok(text)
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }
}
