//! Request/response traffic logging middleware.
//!
//! # Responsibilities
//! - Log method, URL, headers and body of every outgoing request
//! - Log status, headers, body and elapsed time of every response
//! - Log transport errors and pass them through untouched
//!
//! # Design Decisions
//! - The response body is read once from its buffer and the response is
//!   rebuilt from the same bytes, so callers see exactly what was received
//! - Undecodable bodies are logged as a placeholder, never as an error
//! - Bodies are truncated to `body_limit_chars` characters in the log only
//! - Relative URIs are logged joined onto the base URL, as the transport sends them

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tower::{Layer, Service};
use url::Url;
use uuid::Uuid;

use crate::config::TrafficLogConfig;
use crate::http::{ApiRequest, ApiResponse, RequestId};
use crate::transport::{resolve_uri, TransportError};

const REDACTED: &str = "[redacted]";

/// Which way a record points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
    Error,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Response => "response",
            Direction::Error => "error",
        }
    }
}

/// Coarse result class of a response, rendered as an icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Redirect,
    ClientError,
    ServerError,
    Failure,
}

impl Outcome {
    pub fn from_status(status: StatusCode) -> Self {
        if status.is_success() {
            Outcome::Success
        } else if status.is_redirection() {
            Outcome::Redirect
        } else if status.is_client_error() {
            Outcome::ClientError
        } else {
            Outcome::ServerError
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Outcome::Success => "✅",
            Outcome::Redirect => "↪️",
            Outcome::ClientError => "⚠️",
            Outcome::ServerError => "❌",
            Outcome::Failure => "💥",
        }
    }
}

/// One traffic log record.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: SystemTime,
    pub direction: Direction,
    pub request_id: RequestId,
    pub label: String,
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub status: Option<StatusCode>,
    pub elapsed: Option<Duration>,
    pub outcome: Option<Outcome>,
    pub error: Option<String>,
}

impl LogEntry {
    fn base(direction: Direction, call: &CallSummary) -> Self {
        Self {
            timestamp: SystemTime::now(),
            direction,
            request_id: call.request_id,
            label: call.label.clone(),
            method: call.method.clone(),
            url: call.url.clone(),
            headers: Vec::new(),
            body: None,
            status: None,
            elapsed: None,
            outcome: None,
            error: None,
        }
    }

    pub fn request(
        request: &ApiRequest,
        base_url: Option<&Url>,
        config: &TrafficLogConfig,
    ) -> Self {
        let call = CallSummary::new(request, base_url);
        Self {
            headers: collect_headers(request.headers(), config),
            body: decode_body(request.body(), config.body_limit_chars),
            ..Self::base(Direction::Request, &call)
        }
    }

    fn response(
        call: &CallSummary,
        status: StatusCode,
        headers: &HeaderMap,
        body: &Bytes,
        elapsed: Duration,
        config: &TrafficLogConfig,
    ) -> Self {
        Self {
            headers: collect_headers(headers, config),
            body: decode_body(body, config.body_limit_chars),
            status: Some(status),
            elapsed: Some(elapsed),
            outcome: Some(Outcome::from_status(status)),
            ..Self::base(Direction::Response, call)
        }
    }

    fn error(call: &CallSummary, err: &TransportError, elapsed: Duration) -> Self {
        Self {
            elapsed: Some(elapsed),
            outcome: Some(Outcome::Failure),
            error: Some(err.to_string()),
            ..Self::base(Direction::Error, call)
        }
    }

    /// Write this record as a tracing event.
    pub fn emit(&self) {
        let timestamp_ms = self
            .timestamp
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let body = self.body.as_deref().unwrap_or("");
        let elapsed = self.elapsed.map(format_duration).unwrap_or_default();
        let icon = self.outcome.map(|o| o.icon()).unwrap_or("➡️");

        match self.direction {
            Direction::Request => tracing::info!(
                timestamp_ms,
                direction = self.direction.as_str(),
                request_id = %self.request_id,
                label = %self.label,
                method = %self.method,
                url = %self.url,
                headers = ?self.headers,
                body = %body,
                "{} {} {}",
                icon,
                self.method,
                self.label
            ),
            Direction::Response => tracing::info!(
                timestamp_ms,
                direction = self.direction.as_str(),
                request_id = %self.request_id,
                label = %self.label,
                method = %self.method,
                url = %self.url,
                status = self.status.map(|s| s.as_u16()).unwrap_or_default(),
                elapsed = %elapsed,
                headers = ?self.headers,
                body = %body,
                "{} {} {}",
                icon,
                self.method,
                self.label
            ),
            Direction::Error => tracing::error!(
                timestamp_ms,
                direction = self.direction.as_str(),
                request_id = %self.request_id,
                label = %self.label,
                method = %self.method,
                url = %self.url,
                elapsed = %elapsed,
                error = self.error.as_deref().unwrap_or(""),
                "{} {} {}",
                icon,
                self.method,
                self.label
            ),
        }
    }
}

/// Request identity captured before the request is handed inward.
struct CallSummary {
    request_id: RequestId,
    label: String,
    method: Method,
    url: String,
}

impl CallSummary {
    fn new(request: &ApiRequest, base_url: Option<&Url>) -> Self {
        let url = base_url
            .and_then(|base| resolve_uri(base, request.uri()).ok())
            .map(|uri| uri.to_string())
            .unwrap_or_else(|| request.uri().to_string());

        Self {
            request_id: request.id(),
            label: endpoint_label(request.path()),
            method: request.method().clone(),
            url,
        }
    }
}

/// Human label for an endpoint: `/api/v1/tasks/42` → `TASKS`.
pub fn endpoint_label(path: &str) -> String {
    let parts: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .filter(|s| !s.eq_ignore_ascii_case("api"))
        .filter(|s| !is_version_segment(s))
        .filter(|s| !is_identifier_segment(s))
        .map(|s| s.replace('-', " ").to_uppercase())
        .collect();

    if parts.is_empty() {
        "ROOT".to_string()
    } else {
        parts.join(" ")
    }
}

fn is_version_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(chars.next(), Some('v') | Some('V'))
        && segment.len() > 1
        && chars.all(|c| c.is_ascii_digit())
}

/// Numeric ids, UUIDs and slug ids such as `task-42`.
fn is_identifier_segment(segment: &str) -> bool {
    segment.chars().any(|c| c.is_ascii_digit()) || Uuid::parse_str(segment).is_ok()
}

/// Cut `text` to `limit` characters, appending a marker when shortened.
pub fn truncate_body(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!(
            "{}... [truncated, {} chars total]",
            &text[..cut],
            text.chars().count()
        ),
        None => text.to_string(),
    }
}

/// Body as loggable text. `None` for an empty body.
pub fn decode_body(body: &Bytes, limit: usize) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    match std::str::from_utf8(body) {
        Ok(text) => Some(truncate_body(text, limit)),
        Err(_) => Some(format!("[undecodable body, {} bytes]", body.len())),
    }
}

/// `850ms`, `2.5s`, `1.5m`.
pub fn format_duration(elapsed: Duration) -> String {
    // Tenths are truncated so a value never renders as the next unit's boundary.
    let ms = elapsed.as_millis();
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        let tenths = ms / 100;
        format!("{}.{}s", tenths / 10, tenths % 10)
    } else {
        let tenths = ms / 6_000;
        format!("{}.{}m", tenths / 10, tenths % 10)
    }
}

fn collect_headers(headers: &HeaderMap, config: &TrafficLogConfig) -> Vec<(String, String)> {
    if !config.log_headers {
        return Vec::new();
    }

    headers
        .iter()
        .map(|(name, value)| {
            let redact = config
                .redact_headers
                .iter()
                .any(|h| h.eq_ignore_ascii_case(name.as_str()));
            let value = if redact {
                REDACTED.to_string()
            } else {
                value
                    .to_str()
                    .map(ToString::to_string)
                    .unwrap_or_else(|_| "[binary]".to_string())
            };
            (name.as_str().to_string(), value)
        })
        .collect()
}

/// Layer that logs traffic passing through the wrapped service.
#[derive(Debug, Clone)]
pub struct TrafficLogLayer {
    config: Arc<TrafficLogConfig>,
    base_url: Option<Arc<Url>>,
}

impl TrafficLogLayer {
    pub fn new(config: TrafficLogConfig) -> Self {
        Self {
            config: Arc::new(config),
            base_url: None,
        }
    }

    /// Log relative request URIs joined onto `base_url`.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(Arc::new(base_url));
        self
    }
}

impl<S> Layer<S> for TrafficLogLayer {
    type Service = TrafficLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TrafficLogService {
            inner,
            config: self.config.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

/// Service produced by `TrafficLogLayer`.
#[derive(Debug, Clone)]
pub struct TrafficLogService<S> {
    inner: S,
    config: Arc<TrafficLogConfig>,
    base_url: Option<Arc<Url>>,
}

impl<S> Service<ApiRequest> for TrafficLogService<S>
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

    fn call(&mut self, request: ApiRequest) -> Self::Future {
        // Use the instance that was poll_ready'd; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let config = self.config.clone();
        let base_url = self.base_url.clone();

        Box::pin(async move {
            if !config.enabled {
                return inner.call(request).await;
            }

            let base_url = base_url.as_deref();
            LogEntry::request(&request, base_url, &config).emit();
            let call = CallSummary::new(&request, base_url);
            let started = Instant::now();

            match inner.call(request).await {
                Ok(response) => {
                    let elapsed = started.elapsed();
                    let (status, headers, body) = response.into_parts();
                    LogEntry::response(&call, status, &headers, &body, elapsed, &config).emit();
                    Ok(ApiResponse::from_parts(status, headers, body))
                }
                Err(err) => {
                    LogEntry::error(&call, &err, started.elapsed()).emit();
                    Err(err)
                }
            }
        })
    }
}
