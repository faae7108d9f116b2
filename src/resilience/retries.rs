//! Retry orchestration.
//!
//! # Responsibilities
//! - Drive one logical call through the inner chain, attempt by attempt
//! - Apply the `RetryPolicy` decision after every attempt
//! - Report start, retries and the final outcome to the diagnostics sink
//! - Abort a backoff wait when shutdown is triggered
//!
//! # State Machine
//! ```text
//! ATTEMPTING → SUCCESS            (2xx)
//! ATTEMPTING → TERMINAL_FAILURE   (non-retryable status/error, or budget spent)
//! ATTEMPTING → RETRY_WAIT         (retryable, attempt < max_attempts)
//! RETRY_WAIT → ATTEMPTING         (after compute_delay(attempt))
//! RETRY_WAIT → TERMINAL_FAILURE   (shutdown triggered: Cancelled)
//! ```
//!
//! # Design Decisions
//! - Environment and mock flag are read once per call and stamped on the request
//! - Attempts are numbered from 0; `max_attempts` retries means up to
//!   `max_attempts + 1` invocations
//! - A retryable response that exhausts the budget is returned as-is, not
//!   turned into an error; callers must inspect the status
//! - Transport errors are returned verbatim; no wrapping
//! - Each call owns its loop; no shared locks, waits only suspend this task

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;
use tower::{Layer, Service, ServiceExt};

use crate::config::EnvironmentProvider;
use crate::http::{ApiRequest, ApiResponse};
use crate::lifecycle::ShutdownListener;
use crate::observability::diagnostics::{CallFailure, CallInfo, DiagnosticsSink};
use crate::resilience::policy::{RetryDecision, RetryPolicy, StopReason};
use crate::transport::TransportError;

/// Result class of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    RetryableFailure,
    TerminalFailure,
}

impl From<&RetryDecision> for AttemptOutcome {
    fn from(decision: &RetryDecision) -> Self {
        match decision {
            RetryDecision::Retry { .. } => AttemptOutcome::RetryableFailure,
            RetryDecision::Stop(StopReason::Succeeded) => AttemptOutcome::Success,
            RetryDecision::Stop(_) => AttemptOutcome::TerminalFailure,
        }
    }
}

/// Bookkeeping for one attempt; lives only inside the retry loop.
#[derive(Debug, Clone)]
pub struct RequestAttempt {
    pub index: u32,
    pub started_at: Instant,
    pub outcome: Option<AttemptOutcome>,
}

impl RequestAttempt {
    fn begin(index: u32) -> Self {
        Self {
            index,
            started_at: Instant::now(),
            outcome: None,
        }
    }

    fn finish(&mut self, decision: &RetryDecision) -> Duration {
        self.outcome = Some(AttemptOutcome::from(decision));
        self.started_at.elapsed()
    }
}

/// Outermost pipeline layer: retries the wrapped chain.
#[derive(Clone)]
pub struct RetryLayer {
    provider: Arc<dyn EnvironmentProvider>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    shutdown: Option<ShutdownListener>,
}

impl RetryLayer {
    pub fn new(
        provider: Arc<dyn EnvironmentProvider>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            provider,
            diagnostics,
            shutdown: None,
        }
    }

    /// Abort backoff waits when `listener` fires.
    pub fn with_shutdown(mut self, listener: ShutdownListener) -> Self {
        self.shutdown = Some(listener);
        self
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = RetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryService {
            inner,
            provider: self.provider.clone(),
            diagnostics: self.diagnostics.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

/// Service produced by `RetryLayer`.
#[derive(Clone)]
pub struct RetryService<S> {
    inner: S,
    provider: Arc<dyn EnvironmentProvider>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    shutdown: Option<ShutdownListener>,
}

impl<S> Service<ApiRequest> for RetryService<S>
where
    S: Service<ApiRequest, Response = ApiResponse, Error = TransportError> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = ApiResponse;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: ApiRequest) -> Self::Future {
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        let profile = self.provider.call_profile();
        request.set_profile(profile);

        let run = RetryRun {
            policy: RetryPolicy::for_environment(profile.environment),
            call: CallInfo::new(&request, profile.environment),
            diagnostics: self.diagnostics.clone(),
            shutdown: self.shutdown.clone(),
        };

        Box::pin(run.execute(inner, request))
    }
}

/// State of one logical call.
struct RetryRun {
    policy: RetryPolicy,
    call: CallInfo,
    diagnostics: Arc<dyn DiagnosticsSink>,
    shutdown: Option<ShutdownListener>,
}

impl RetryRun {
    async fn execute<S>(mut self, mut inner: S, request: ApiRequest) -> Result<ApiResponse, TransportError>
    where
        S: Service<ApiRequest, Response = ApiResponse, Error = TransportError>,
    {
        let started = Instant::now();
        self.diagnostics.call_started(&self.call);

        if self.shutdown.as_ref().is_some_and(ShutdownListener::is_triggered) {
            return self.finish(Err(TransportError::Cancelled), started);
        }

        let mut attempt = 0u32;
        loop {
            let mut record = RequestAttempt::begin(attempt);

            let result = match inner.ready().await {
                Ok(svc) => svc.call(request.clone()).await,
                Err(err) => Err(err),
            };

            let decision = match &result {
                Ok(response) => self.policy.decide_on_status(response.status(), attempt),
                Err(err) => self.policy.decide_on_failure(err, attempt),
            };

            let attempt_elapsed = record.finish(&decision);
            tracing::debug!(
                request_id = %self.call.request_id,
                attempt = record.index,
                outcome = ?record.outcome,
                elapsed_ms = attempt_elapsed.as_millis() as u64,
                "Attempt finished"
            );

            match decision {
                RetryDecision::Retry { delay } => {
                    // Release the failed response before sleeping.
                    drop(result);

                    self.diagnostics
                        .call_retried(&self.call, attempt + 1, self.policy.max_attempts());
                    tracing::debug!(
                        request_id = %self.call.request_id,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Backing off before retry"
                    );

                    if let Err(err) = self.wait(delay).await {
                        return self.finish(Err(err), started);
                    }
                    attempt += 1;
                }
                RetryDecision::Stop(reason) => {
                    if reason == StopReason::Exhausted {
                        tracing::warn!(
                            request_id = %self.call.request_id,
                            attempts = attempt + 1,
                            "Retries exhausted"
                        );
                    }
                    return self.finish(result, started);
                }
            }
        }
    }

    /// Sleep for `delay`, or fail with `Cancelled` if shutdown fires first.
    async fn wait(&mut self, delay: Duration) -> Result<(), TransportError> {
        match self.shutdown.as_mut() {
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            Some(listener) => tokio::select! {
                _ = tokio::time::sleep(delay) => Ok(()),
                _ = listener.triggered() => {
                    tracing::warn!(request_id = %self.call.request_id, "Backoff interrupted by shutdown");
                    Err(TransportError::Cancelled)
                }
            },
        }
    }

    fn finish(
        &self,
        result: Result<ApiResponse, TransportError>,
        started: Instant,
    ) -> Result<ApiResponse, TransportError> {
        let elapsed = started.elapsed();
        match &result {
            Ok(response) if response.is_success() => {
                self.diagnostics
                    .call_succeeded(&self.call, response.status(), elapsed)
            }
            Ok(response) => {
                self.diagnostics
                    .call_failed(&self.call, CallFailure::Status(response.status()), elapsed)
            }
            Err(err) => self
                .diagnostics
                .call_failed(&self.call, CallFailure::Transport(err), elapsed),
        }
        result
    }
}
