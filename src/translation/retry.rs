/*!
 * Failure classification and table-driven retry policy.
 *
 * Every failed transform call is mapped to one closed `ErrorClass`. The
 * `RetryPolicy` table then says, per class, how long to back off and how many
 * attempts a unit gets before the failure escalates:
 * - Throttled, Overloaded, TimedOut, Unknown: the job pauses
 * - ContentRefused: only the unit is skipped and the job continues
 */

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::ProviderError;

/// Closed set of transform-call failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorClass {
    /// Explicit quota or rate-limit signal
    Throttled,
    /// Transient capacity signal
    Overloaded,
    /// The call exceeded its deadline
    TimedOut,
    /// Policy refusal to produce output
    ContentRefused,
    /// Anything else
    Unknown,
}

impl ErrorClass {
    pub const ALL: [ErrorClass; 5] = [
        ErrorClass::Throttled,
        ErrorClass::Overloaded,
        ErrorClass::TimedOut,
        ErrorClass::ContentRefused,
        ErrorClass::Unknown,
    ];

    /// Map a failed call onto its class
    pub fn classify(error: &ProviderError) -> Self {
        match error {
            ProviderError::RateLimitExceeded { .. } => Self::Throttled,
            ProviderError::ApiError { status_code: 429, .. } => Self::Throttled,
            ProviderError::Overloaded(_) => Self::Overloaded,
            ProviderError::Timeout(_) => Self::TimedOut,
            ProviderError::ContentRefused(_) => Self::ContentRefused,
            ProviderError::RequestFailed(_)
            | ProviderError::ParseError(_)
            | ProviderError::ApiError { .. }
            | ProviderError::ConnectionError(_)
            | ProviderError::AuthenticationError(_) => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Throttled => "throttled",
            Self::Overloaded => "overloaded",
            Self::TimedOut => "timed out",
            Self::ContentRefused => "content refused",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the delay curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// base * 2^attempt
    Exponential,
    /// base * attempt
    Linear,
}

/// What happens once a class has used up its attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
    /// Save the checkpoint and stop the job for an operator to resume
    PauseJob,
    /// Record the unit as a permanent failure and move on
    SkipUnit,
}

/// Retry settings for one failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassPolicy {
    pub backoff: Backoff,
    pub base_delay_ms: u64,
    /// Total attempts including the first one
    pub max_attempts: u32,
}

impl ClassPolicy {
    pub const fn new(backoff: Backoff, base_delay_ms: u64, max_attempts: u32) -> Self {
        Self {
            backoff,
            base_delay_ms,
            max_attempts,
        }
    }

    fn raw_delay(&self, attempt: u32) -> Duration {
        let factor = match self.backoff {
            Backoff::Exponential => 2u64.saturating_pow(attempt),
            Backoff::Linear => u64::from(attempt),
        };
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Outcome of consulting the policy after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub should_retry: bool,
    /// Wait before the next attempt; zero when not retrying
    pub delay: Duration,
}

/// Per-class retry table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_throttled")]
    pub throttled: ClassPolicy,
    #[serde(default = "default_overloaded")]
    pub overloaded: ClassPolicy,
    #[serde(default = "default_timed_out")]
    pub timed_out: ClassPolicy,
    #[serde(default = "default_content_refused")]
    pub content_refused: ClassPolicy,
    #[serde(default = "default_unknown")]
    pub unknown: ClassPolicy,
    /// Upper bound on any single delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_throttled() -> ClassPolicy {
    ClassPolicy::new(Backoff::Exponential, 2_000, 4)
}

fn default_overloaded() -> ClassPolicy {
    ClassPolicy::new(Backoff::Linear, 10_000, 5)
}

fn default_timed_out() -> ClassPolicy {
    ClassPolicy::new(Backoff::Linear, 5_000, 3)
}

fn default_content_refused() -> ClassPolicy {
    ClassPolicy::new(Backoff::Exponential, 1_000, 3)
}

fn default_unknown() -> ClassPolicy {
    ClassPolicy::new(Backoff::Exponential, 2_000, 3)
}

fn default_max_delay_ms() -> u64 {
    120_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            throttled: default_throttled(),
            overloaded: default_overloaded(),
            timed_out: default_timed_out(),
            content_refused: default_content_refused(),
            unknown: default_unknown(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Table entry for a class
    pub fn for_class(&self, class: ErrorClass) -> &ClassPolicy {
        match class {
            ErrorClass::Throttled => &self.throttled,
            ErrorClass::Overloaded => &self.overloaded,
            ErrorClass::TimedOut => &self.timed_out,
            ErrorClass::ContentRefused => &self.content_refused,
            ErrorClass::Unknown => &self.unknown,
        }
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Decide after the `attempt`-th failed attempt (1-based).
    ///
    /// A server retry hint raises the delay but never lowers it.
    pub fn decide(&self, class: ErrorClass, attempt: u32, retry_after: Option<Duration>) -> RetryDecision {
        let policy = self.for_class(class);
        if attempt >= policy.max_attempts {
            return RetryDecision {
                should_retry: false,
                delay: Duration::ZERO,
            };
        }

        let delay = policy.raw_delay(attempt).min(self.max_delay());
        let delay = match retry_after {
            Some(hint) => delay.max(hint),
            None => delay,
        };
        RetryDecision {
            should_retry: true,
            delay,
        }
    }

    /// Escalation once a class is exhausted
    pub fn on_exhausted(class: ErrorClass) -> Exhaustion {
        match class {
            ErrorClass::ContentRefused => Exhaustion::SkipUnit,
            ErrorClass::Throttled | ErrorClass::Overloaded | ErrorClass::TimedOut | ErrorClass::Unknown => {
                Exhaustion::PauseJob
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        for class in ErrorClass::ALL {
            if self.for_class(class).max_attempts == 0 {
                return Err(anyhow!("Retry policy for {} needs at least one attempt", class));
            }
        }
        Ok(())
    }
}
