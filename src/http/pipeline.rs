//! Pipeline assembly and the `execute_with_retry` entry point.
//!
//! # Layer Order
//! ```text
//! execute_with_retry
//!     → RetryLayer        (one loop per logical call)
//!         → TrafficLogLayer   (one request/response pair per attempt)
//!             → MockRouterLayer   (short-circuits in mock mode)
//!                 → transport     (HyperTransport, or anything implementing Service)
//! ```
//!
//! # Design Decisions
//! - The composed chain is type-erased into a `BoxCloneService`; each call
//!   clones it, so concurrent calls share nothing mutable
//! - The traffic log settings and base URL are captured when the pipeline is built

use std::future::Future;
use std::sync::Arc;
use tower::util::BoxCloneService;
use tower::{Service, ServiceBuilder, ServiceExt};
use url::Url;

use crate::config::{ConfigHandle, EnvironmentProvider};
use crate::http::{ApiRequest, ApiResponse};
use crate::lifecycle::ShutdownListener;
use crate::observability::diagnostics::{DiagnosticsSink, TracingDiagnostics};
use crate::observability::traffic::TrafficLogLayer;
use crate::resilience::RetryLayer;
use crate::routing::{MockRouter, MockRouterLayer};
use crate::transport::{HyperTransport, TransportError};

/// Type-erased request chain.
pub type PipelineService = BoxCloneService<ApiRequest, ApiResponse, TransportError>;

/// Builder for a `Pipeline`.
pub struct PipelineBuilder {
    config: ConfigHandle,
    router: Arc<MockRouter>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    shutdown: Option<ShutdownListener>,
}

impl PipelineBuilder {
    fn new(config: ConfigHandle) -> Self {
        Self {
            config,
            router: Arc::new(MockRouter::standard()),
            diagnostics: Arc::new(TracingDiagnostics),
            shutdown: None,
        }
    }

    /// Replace the standard mock table.
    pub fn router(mut self, router: MockRouter) -> Self {
        self.router = Arc::new(router);
        self
    }

    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Abort pending backoff waits when `listener` fires.
    pub fn shutdown(mut self, listener: ShutdownListener) -> Self {
        self.shutdown = Some(listener);
        self
    }

    /// Compose the layers around `transport`.
    pub fn build<T>(self, transport: T) -> Pipeline
    where
        T: Service<ApiRequest, Response = ApiResponse, Error = TransportError>
            + Clone
            + Send
            + 'static,
        T::Future: Send + 'static,
    {
        let provider: Arc<dyn EnvironmentProvider> = Arc::new(self.config.clone());
        let snapshot = self.config.snapshot();

        let mut retry = RetryLayer::new(provider.clone(), self.diagnostics);
        if let Some(listener) = self.shutdown {
            retry = retry.with_shutdown(listener);
        }

        let mut traffic = TrafficLogLayer::new(snapshot.traffic_log.clone());
        if let Ok(base_url) = Url::parse(&snapshot.transport.base_url) {
            traffic = traffic.with_base_url(base_url);
        }

        let service = ServiceBuilder::new()
            .layer(retry)
            .layer(traffic)
            .layer(MockRouterLayer::new(self.router, provider))
            .service(transport);

        tracing::debug!(
            environment = %snapshot.environment,
            mock_enabled = snapshot.mock_enabled(),
            traffic_log = snapshot.traffic_log.enabled,
            "Pipeline assembled"
        );

        Pipeline {
            config: self.config,
            service: BoxCloneService::new(service),
        }
    }
}

/// Retrying, logging, mock-aware request pipeline.
///
/// Clone it to share between tasks; clones are cheap and independent.
#[derive(Clone)]
pub struct Pipeline {
    config: ConfigHandle,
    service: PipelineService,
}

impl Pipeline {
    pub fn builder(config: ConfigHandle) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    /// Pipeline over a real HTTP transport built from the current config.
    pub fn with_hyper_transport(config: ConfigHandle) -> Result<Self, TransportError> {
        let transport = HyperTransport::new(&config.snapshot().transport)?;
        Ok(Self::builder(config).build(transport))
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    /// Issue `request`, retrying per the environment's policy.
    ///
    /// Resolves to the final response (which may carry a non-2xx status once
    /// retries are exhausted) or to the last transport error, unwrapped.
    pub fn execute_with_retry(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send + 'static {
        self.service.clone().oneshot(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, PipelineConfig};
    use crate::routing::X_MOCK_RESPONSE;
    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::service_fn;
    use tracing_test::traced_test;

    fn handle(environment: Environment, mock_override: Option<bool>) -> ConfigHandle {
        ConfigHandle::new(PipelineConfig {
            environment,
            mock_override,
            ..PipelineConfig::default()
        })
    }

    fn counting_transport(calls: Arc<AtomicUsize>) -> PipelineService {
        BoxCloneService::new(service_fn(move |_req: ApiRequest| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, TransportError>(ApiResponse::new(StatusCode::OK)) }
        }))
    }

    #[tokio::test]
    #[traced_test]
    async fn test_mock_response_passes_through_logger() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::builder(handle(Environment::Mock, None))
            .build(counting_transport(calls.clone()));

        let request = ApiRequest::post("/api/v1/auth/login")
            .unwrap()
            .with_json(&serde_json::json!({"phone": "+15550100"}))
            .unwrap();
        let response = pipeline.execute_with_retry(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(X_MOCK_RESPONSE));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(logs_contain("OTP sent successfully"));
    }

    #[tokio::test]
    async fn test_live_mode_reaches_transport() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::builder(handle(Environment::Production, None))
            .build(counting_transport(calls.clone()));

        let response = pipeline
            .execute_with_retry(ApiRequest::get("/api/v1/tasks").unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(X_MOCK_RESPONSE));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mock_toggle_applies_to_next_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = handle(Environment::Development, None);
        let pipeline = Pipeline::builder(config.clone()).build(counting_transport(calls.clone()));

        pipeline
            .execute_with_retry(ApiRequest::get("/api/v1/tasks").unwrap())
            .await
            .unwrap();
        config.set_mock_override(Some(true));
        let response = pipeline
            .execute_with_retry(ApiRequest::get("/api/v1/tasks").unwrap())
            .await
            .unwrap();

        assert!(response.headers().contains_key(X_MOCK_RESPONSE));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_logger_sees_every_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let transport = BoxCloneService::new(service_fn(move |_req: ApiRequest| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let status = if n == 0 {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::OK
                };
                Ok::<_, TransportError>(ApiResponse::new(status))
            }
        }));
        let pipeline =
            Pipeline::builder(handle(Environment::Production, None)).build(transport);

        let response = pipeline
            .execute_with_retry(ApiRequest::get("/api/v1/tasks").unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        logs_assert(|lines: &[&str]| {
            let failed = lines.iter().filter(|l| l.contains("status=503")).count();
            let retried = lines.iter().filter(|l| l.contains("Retrying API call")).count();
            match (failed, retried) {
                (1, 1) => Ok(()),
                other => Err(format!("unexpected (503 records, retries): {other:?}")),
            }
        });
    }

    #[tokio::test]
    #[traced_test]
    async fn test_relative_uri_logged_with_base_url() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::builder(handle(Environment::Production, None))
            .build(counting_transport(calls.clone()));

        pipeline
            .execute_with_retry(ApiRequest::get("/tasks").unwrap())
            .await
            .unwrap();

        assert!(logs_contain("url=http://127.0.0.1:3000/api/v1/tasks"));
    }
}
