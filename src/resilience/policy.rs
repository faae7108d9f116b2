//! Retry policy engine.
//!
//! # Responsibilities
//! - Classify HTTP statuses and transport failures as transient or permanent
//! - Map an `Environment` to its retry budget and backoff limits
//! - Turn one attempt's outcome into a `RetryDecision`
//!
//! # Design Decisions
//! - Pure functions over read-only tables; safe to call from any task
//! - `RetryPolicy` captures all three parameters from one environment, so a
//!   retry loop can never mix limits from two environments
//! - Failure classification falls back to message sniffing, see
//!   `is_retryable_failure`

use axum::http::StatusCode;
use std::time::Duration;

use crate::config::Environment;
use crate::resilience::backoff::calculate_backoff;
use crate::transport::TransportError;

/// Statuses worth retrying: server errors and rate limiting.
pub const RETRYABLE_STATUS_CODES: [u16; 5] = [500, 502, 503, 504, 429];

/// Substrings that mark an otherwise unclassified failure as transient.
const TRANSIENT_MESSAGE_HINTS: [&str; 6] = [
    "timeout",
    "connection",
    "network",
    "unreachable",
    "refused",
    "reset",
];

pub fn is_retryable_status(code: u16) -> bool {
    RETRYABLE_STATUS_CODES.contains(&code)
}

/// Whether a transport failure is worth retrying.
///
/// Timeouts, unknown hosts, refused connections and unreachable hosts are
/// always transient. Anything else is retried when its lowercased message
/// mentions one of `TRANSIENT_MESSAGE_HINTS`. This is a heuristic, not a
/// contract: unrelated errors that happen to contain "network" or "reset"
/// are retried too. Cancellation is never retried.
pub fn is_retryable_failure(err: &TransportError) -> bool {
    match err {
        TransportError::Timeout(_)
        | TransportError::UnknownHost(_)
        | TransportError::ConnectionRefused(_)
        | TransportError::NoRouteToHost(_) => true,
        TransportError::Cancelled => false,
        _ => {
            let message = err.message();
            TRANSIENT_MESSAGE_HINTS
                .iter()
                .any(|hint| message.contains(hint))
        }
    }
}

/// Number of retries after the first attempt.
pub fn max_attempts(env: Environment) -> u32 {
    match env {
        Environment::Mock => 1,
        Environment::Development => 2,
        Environment::Staging | Environment::Production => 3,
    }
}

pub fn initial_delay(env: Environment) -> Duration {
    match env {
        Environment::Mock => Duration::from_millis(100),
        Environment::Development => Duration::from_millis(500),
        Environment::Staging | Environment::Production => Duration::from_millis(1000),
    }
}

pub fn max_delay(env: Environment) -> Duration {
    match env {
        Environment::Mock => Duration::from_millis(1000),
        Environment::Development => Duration::from_millis(5000),
        Environment::Staging | Environment::Production => Duration::from_millis(10_000),
    }
}

/// Backoff before the retry following zero-based attempt `attempt`.
pub fn compute_delay(attempt: u32, env: Environment) -> Duration {
    calculate_backoff(attempt, initial_delay(env), max_delay(env))
}

/// Why a retry loop stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 2xx response.
    Succeeded,
    /// Permanent failure: non-retryable status or error.
    NonRetryable,
    /// Transient failure with no retries left.
    Exhausted,
}

/// Outcome of classifying one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    Stop(StopReason),
}

impl RetryDecision {
    pub fn is_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry { .. })
    }

    pub fn delay(&self) -> Option<Duration> {
        match self {
            RetryDecision::Retry { delay } => Some(*delay),
            RetryDecision::Stop(_) => None,
        }
    }
}

/// Retry parameters for one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    environment: Environment,
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn for_environment(env: Environment) -> Self {
        Self {
            environment: env,
            max_attempts: max_attempts(env),
            initial_delay: initial_delay(env),
            max_delay: max_delay(env),
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.initial_delay, self.max_delay)
    }

    /// Decide what follows a response received on `attempt`.
    pub fn decide_on_status(&self, status: StatusCode, attempt: u32) -> RetryDecision {
        if status.is_success() {
            RetryDecision::Stop(StopReason::Succeeded)
        } else if !is_retryable_status(status.as_u16()) {
            RetryDecision::Stop(StopReason::NonRetryable)
        } else {
            self.retry_or_exhausted(attempt)
        }
    }

    /// Decide what follows a transport failure on `attempt`.
    pub fn decide_on_failure(&self, err: &TransportError, attempt: u32) -> RetryDecision {
        if is_retryable_failure(err) {
            self.retry_or_exhausted(attempt)
        } else {
            RetryDecision::Stop(StopReason::NonRetryable)
        }
    }

    fn retry_or_exhausted(&self, attempt: u32) -> RetryDecision {
        if attempt < self.max_attempts {
            RetryDecision::Retry {
                delay: self.delay_for(attempt),
            }
        } else {
            RetryDecision::Stop(StopReason::Exhausted)
        }
    }
}
