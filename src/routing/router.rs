//! Mock endpoint table and dispatch.
//!
//! # Responsibilities
//! - Store the ordered mock rule table
//! - Look up the first rule matching a request
//! - Synthesize the canned response, or a structured 404
//! - Short-circuit the chain when mock mode is active for the call
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Rules sorted by pattern length, longest first, so `/tasks/analytics`
//!   is tried before `/tasks`; ties keep declaration order
//! - Unmatched requests are a normal 404 response, never an error
//! - No logging here; the traffic logger wraps this layer

use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{Method, StatusCode};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::config::EnvironmentProvider;
use crate::http::{ApiRequest, ApiResponse};
use crate::routing::matcher::{AndMatcher, Matcher, MethodMatcher, PathContainsMatcher};
use crate::routing::payloads;
use crate::transport::TransportError;

/// Header marking a synthesized response.
pub const X_MOCK_RESPONSE: &str = "x-mock-response";

/// Builds the body of a mock response from the request.
pub type PayloadFn = fn(&ApiRequest) -> Value;

/// One (path substring, method) → canned response mapping.
#[derive(Debug)]
pub struct MockRule {
    name: &'static str,
    pattern: String,
    status: StatusCode,
    matcher: AndMatcher,
    payload: PayloadFn,
}

impl MockRule {
    pub fn new(
        name: &'static str,
        method: Method,
        pattern: &str,
        status: StatusCode,
        payload: PayloadFn,
    ) -> Self {
        Self {
            name,
            pattern: pattern.to_string(),
            status,
            matcher: AndMatcher::new(vec![
                Box::new(PathContainsMatcher::new(pattern)),
                Box::new(MethodMatcher::new(method)),
            ]),
            payload,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn respond(&self, request: &ApiRequest) -> ApiResponse {
        mock_response(self.status, &(self.payload)(request))
    }
}

impl Matcher for MockRule {
    fn matches(&self, req: &ApiRequest) -> bool {
        self.matcher.matches(req)
    }
}

fn mock_response(status: StatusCode, body: &Value) -> ApiResponse {
    ApiResponse::json(status, body).with_header(
        HeaderName::from_static(X_MOCK_RESPONSE),
        HeaderValue::from_static("true"),
    )
}

/// Immutable, ordered mock rule table.
#[derive(Debug)]
pub struct MockRouter {
    rules: Vec<MockRule>,
}

impl MockRouter {
    /// Build a router; rules are ordered longest pattern first.
    pub fn new(mut rules: Vec<MockRule>) -> Self {
        rules.sort_by(|a, b| b.pattern.len().cmp(&a.pattern.len()));
        Self { rules }
    }

    /// The todo API endpoint table.
    pub fn standard() -> Self {
        Self::new(vec![
            MockRule::new("auth_login", Method::POST, "/auth/login", StatusCode::OK, payloads::login),
            MockRule::new("auth_verify_otp", Method::POST, "/auth/verify-otp", StatusCode::OK, payloads::verify_otp),
            MockRule::new("auth_logout", Method::POST, "/auth/logout", StatusCode::OK, payloads::logout),
            MockRule::new("user_profile", Method::GET, "/user/profile", StatusCode::OK, payloads::profile),
            MockRule::new("task_analytics", Method::GET, "/tasks/analytics", StatusCode::OK, payloads::task_analytics),
            MockRule::new("task_bulk", Method::POST, "/tasks/bulk", StatusCode::OK, payloads::task_bulk),
            MockRule::new("task_detail", Method::GET, "/tasks/", StatusCode::OK, payloads::task_detail),
            MockRule::new("task_update", Method::PUT, "/tasks/", StatusCode::OK, payloads::task_update),
            MockRule::new("task_delete", Method::DELETE, "/tasks/", StatusCode::OK, payloads::task_delete),
            MockRule::new("task_list", Method::GET, "/tasks", StatusCode::OK, payloads::task_list),
            MockRule::new("task_create", Method::POST, "/tasks", StatusCode::CREATED, payloads::task_create),
            MockRule::new("category_list", Method::GET, "/categories", StatusCode::OK, payloads::category_list),
            MockRule::new("category_create", Method::POST, "/categories", StatusCode::CREATED, payloads::category_create),
            MockRule::new("feedback_create", Method::POST, "/feedback", StatusCode::CREATED, payloads::feedback_create),
        ])
    }

    pub fn rules(&self) -> &[MockRule] {
        &self.rules
    }

    /// First rule matching the request.
    pub fn match_request(&self, request: &ApiRequest) -> Option<&MockRule> {
        self.rules.iter().find(|rule| rule.matches(request))
    }

    /// Synthesize the response for a request. Never fails.
    pub fn route(&self, request: &ApiRequest) -> ApiResponse {
        match self.match_request(request) {
            Some(rule) => rule.respond(request),
            None => mock_response(StatusCode::NOT_FOUND, &payloads::not_found(request)),
        }
    }
}

impl Default for MockRouter {
    fn default() -> Self {
        Self::standard()
    }
}

/// Layer answering requests from the mock table when mock mode is active.
#[derive(Clone)]
pub struct MockRouterLayer {
    router: Arc<MockRouter>,
    provider: Arc<dyn EnvironmentProvider>,
}

impl MockRouterLayer {
    pub fn new(router: Arc<MockRouter>, provider: Arc<dyn EnvironmentProvider>) -> Self {
        Self { router, provider }
    }
}

impl<S> Layer<S> for MockRouterLayer {
    type Service = MockRouterService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockRouterService {
            inner,
            router: self.router.clone(),
            provider: self.provider.clone(),
        }
    }
}

/// Service produced by `MockRouterLayer`.
#[derive(Clone)]
pub struct MockRouterService<S> {
    inner: S,
    router: Arc<MockRouter>,
    provider: Arc<dyn EnvironmentProvider>,
}

impl<S> MockRouterService<S> {
    /// The call's stamped profile wins; bare requests consult the provider.
    fn mock_active(&self, request: &ApiRequest) -> bool {
        request
            .profile()
            .map(|profile| profile.mock_enabled)
            .unwrap_or_else(|| self.provider.mock_enabled())
    }
}

impl<S> Service<ApiRequest> for MockRouterService<S>
where
    S: Service<ApiRequest, Response = ApiResponse, Error = TransportError>,
    S::Future: Send + 'static,
{
    type Response = ApiResponse;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: ApiRequest) -> Self::Future {
        if self.mock_active(&request) {
            let response = self.router.route(&request);
            return Box::pin(std::future::ready(Ok(response)));
        }
        Box::pin(self.inner.call(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CallProfile, Environment};
    use axum::http::header::CONTENT_TYPE;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::util::BoxCloneService;
    use tower::{service_fn, ServiceExt};

    fn route(request: ApiRequest) -> (StatusCode, Value) {
        let response = MockRouter::standard().route(&request);
        (response.status(), response.json_body().unwrap())
    }

    #[test]
    fn test_rules_sorted_longest_first() {
        let router = MockRouter::standard();
        let lengths: Vec<usize> = router.rules().iter().map(|r| r.pattern().len()).collect();
        assert!(lengths.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_analytics_beats_task_list() {
        let router = MockRouter::standard();
        let request = ApiRequest::get("/api/v1/tasks/analytics").unwrap();
        assert_eq!(router.match_request(&request).unwrap().name(), "task_analytics");

        let (status, body) = route(request);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["completionRate"], 62.5);
        assert!(body["data"].get("tasks").is_none());
    }

    #[test]
    fn test_declaration_order_does_not_matter() {
        let router = MockRouter::new(vec![
            MockRule::new("list", Method::GET, "/tasks", StatusCode::OK, payloads::task_list),
            MockRule::new("analytics", Method::GET, "/tasks/analytics", StatusCode::OK, payloads::task_analytics),
        ]);
        let request = ApiRequest::get("/tasks/analytics").unwrap();
        assert_eq!(router.match_request(&request).unwrap().name(), "analytics");
    }

    #[test]
    fn test_login_sends_otp() {
        let request = ApiRequest::post("/auth/login")
            .unwrap()
            .with_json(&json!({"phone": "+15550199"}))
            .unwrap();
        let (status, body) = route(request);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "OTP sent successfully");
        assert_eq!(body["data"]["phone"], "+15550199");
    }

    #[test]
    fn test_task_crud_statuses() {
        assert_eq!(route(ApiRequest::get("/tasks").unwrap()).0, StatusCode::OK);
        assert_eq!(route(ApiRequest::post("/tasks").unwrap()).0, StatusCode::CREATED);
        assert_eq!(route(ApiRequest::put("/tasks/task-7").unwrap()).0, StatusCode::OK);
        assert_eq!(route(ApiRequest::delete("/tasks/task-7").unwrap()).0, StatusCode::OK);
        assert_eq!(route(ApiRequest::post("/categories").unwrap()).0, StatusCode::CREATED);
        assert_eq!(route(ApiRequest::post("/feedback").unwrap()).0, StatusCode::CREATED);
    }

    #[test]
    fn test_single_task_echoes_id() {
        let (_, body) = route(ApiRequest::get("/tasks/task-42").unwrap());
        assert_eq!(body["data"]["id"], "task-42");
    }

    #[test]
    fn test_unmatched_route_is_structured_404() {
        let response = MockRouter::standard().route(&ApiRequest::get("/unknown-path").unwrap());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let body: Value = response.json_body().unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert!(body["error"]["message"].as_str().unwrap().contains("GET /unknown-path"));
    }

    #[test]
    fn test_method_mismatch_is_404() {
        let (status, _) = route(ApiRequest::delete("/categories").unwrap());
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_mock_header_present() {
        let response = MockRouter::standard().route(&ApiRequest::get("/tasks").unwrap());
        assert_eq!(response.headers()[X_MOCK_RESPONSE], "true");
    }

    fn counting_transport(
        calls: Arc<AtomicUsize>,
    ) -> BoxCloneService<ApiRequest, ApiResponse, TransportError> {
        BoxCloneService::new(service_fn(move |_req: ApiRequest| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, TransportError>(ApiResponse::new(StatusCode::NO_CONTENT)) }
        }))
    }

    #[tokio::test]
    async fn test_layer_short_circuits_in_mock_mode() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider: Arc<dyn EnvironmentProvider> = Arc::new(CallProfile {
            environment: Environment::Mock,
            mock_enabled: true,
        });
        let service = MockRouterLayer::new(Arc::new(MockRouter::standard()), provider)
            .layer(counting_transport(calls.clone()));

        let response = service.oneshot(ApiRequest::get("/tasks").unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_layer_passes_through_when_disabled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider: Arc<dyn EnvironmentProvider> = Arc::new(CallProfile {
            environment: Environment::Production,
            mock_enabled: false,
        });
        let service = MockRouterLayer::new(Arc::new(MockRouter::standard()), provider)
            .layer(counting_transport(calls.clone()));

        let response = service.oneshot(ApiRequest::get("/tasks").unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stamped_profile_overrides_provider() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider: Arc<dyn EnvironmentProvider> = Arc::new(CallProfile {
            environment: Environment::Production,
            mock_enabled: false,
        });
        let service = MockRouterLayer::new(Arc::new(MockRouter::standard()), provider)
            .layer(counting_transport(calls.clone()));

        let mut request = ApiRequest::get("/tasks").unwrap();
        request.set_profile(CallProfile {
            environment: Environment::Mock,
            mock_enabled: true,
        });

        let response = service.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
