//! Call lifecycle diagnostics.
//!
//! # Responsibilities
//! - Report call start, success, failure and each retry
//! - Provide the default sink (tracing events + metrics)
//!
//! # Design Decisions
//! - Sink methods return nothing and must not panic; diagnostics can never
//!   change the outcome of a call
//! - This is the only place a caller can learn how many attempts a call took

use axum::http::{Method, StatusCode};
use std::time::Duration;

use crate::config::Environment;
use crate::http::{ApiRequest, RequestId};
use crate::observability::metrics;
use crate::transport::TransportError;

/// Identity of one logical call, shared by all its diagnostics events.
#[derive(Debug, Clone)]
pub struct CallInfo {
    pub request_id: RequestId,
    pub method: Method,
    pub path: String,
    pub environment: Environment,
}

impl CallInfo {
    pub fn new(request: &ApiRequest, environment: Environment) -> Self {
        Self {
            request_id: request.id(),
            method: request.method().clone(),
            path: request.path().to_string(),
            environment,
        }
    }
}

/// How a call ended, when it did not end in a 2xx response.
#[derive(Debug, Clone, Copy)]
pub enum CallFailure<'a> {
    /// Final response had a non-success status.
    Status(StatusCode),
    /// Transport error surfaced to the caller.
    Transport(&'a TransportError),
}

/// Receiver of call lifecycle events. Fire-and-forget.
pub trait DiagnosticsSink: Send + Sync {
    fn call_started(&self, call: &CallInfo);

    fn call_succeeded(&self, call: &CallInfo, status: StatusCode, elapsed: Duration);

    fn call_failed(&self, call: &CallInfo, failure: CallFailure<'_>, elapsed: Duration);

    /// Emitted before the backoff wait preceding retry `attempt` (1-based).
    fn call_retried(&self, call: &CallInfo, attempt: u32, max_attempts: u32);
}

/// Default sink: structured log events plus metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn call_started(&self, call: &CallInfo) {
        tracing::debug!(
            request_id = %call.request_id,
            method = %call.method,
            path = %call.path,
            environment = %call.environment,
            "API call started"
        );
    }

    fn call_succeeded(&self, call: &CallInfo, status: StatusCode, elapsed: Duration) {
        tracing::debug!(
            request_id = %call.request_id,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "API call succeeded"
        );
        metrics::record_call(call.method.as_str(), "success", elapsed);
    }

    fn call_failed(&self, call: &CallInfo, failure: CallFailure<'_>, elapsed: Duration) {
        match failure {
            CallFailure::Status(status) => {
                tracing::warn!(
                    request_id = %call.request_id,
                    path = %call.path,
                    status = status.as_u16(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "API call returned unsuccessful status"
                );
                metrics::record_call(call.method.as_str(), "status", elapsed);
            }
            CallFailure::Transport(err) => {
                tracing::error!(
                    request_id = %call.request_id,
                    path = %call.path,
                    error = %err,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "API call failed"
                );
                metrics::record_call(call.method.as_str(), err.kind().as_str(), elapsed);
            }
        }
    }

    fn call_retried(&self, call: &CallInfo, attempt: u32, max_attempts: u32) {
        tracing::info!(
            request_id = %call.request_id,
            path = %call.path,
            attempt,
            max_attempts,
            "Retrying API call"
        );
        metrics::record_retry(call.method.as_str());
    }
}
