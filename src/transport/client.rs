//! Hyper-backed transport.
//!
//! # Responsibilities
//! - Resolve relative request URIs against the configured base URL
//! - Send the request and buffer the response body (bounded)
//! - Enforce connect and overall request deadlines
//! - Classify connection failures into `TransportError` variants

use axum::body::Body;
use axum::http::{HeaderValue, Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;
use url::Url;

use crate::config::TransportConfig;
use crate::http::request::X_REQUEST_ID;
use crate::http::{ApiRequest, ApiResponse};
use crate::transport::TransportError;

/// Real network transport over a pooled hyper client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    base_url: Url,
    request_timeout: Duration,
    max_response_bytes: usize,
}

impl HyperTransport {
    /// Create a transport from configuration.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            TransportError::InvalidRequest(format!("invalid base url '{}': {}", config.base_url, e))
        })?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_millis(config.connect_timeout_ms)));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            base_url,
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            max_response_bytes: config.max_response_bytes,
        })
    }

    fn resolve(&self, uri: &Uri) -> Result<Uri, TransportError> {
        resolve_uri(&self.base_url, uri)
    }

    async fn send(self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let uri = self.resolve(request.uri())?;

        let mut builder = Request::builder().method(request.method().clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in request.headers() {
                headers.append(name.clone(), value.clone());
            }
            if let Ok(id) = HeaderValue::from_str(&request.id().to_string()) {
                headers.insert(X_REQUEST_ID, id);
            }
        }

        let outgoing = builder
            .body(Body::from(request.body().clone()))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let exchange = async {
            let response: axum::http::Response<hyper::body::Incoming> = self
                .client
                .request(outgoing)
                .await
                .map_err(classify_client_error)?;

            let (parts, body) = response.into_parts();
            let bytes = axum::body::to_bytes(Body::new(body), self.max_response_bytes)
                .await
                .map_err(|e| TransportError::Body(e.to_string()))?;

            Ok(ApiResponse::from_parts(parts.status, parts.headers, bytes))
        };

        match tokio::time::timeout(self.request_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(format!(
                "no response within {}ms",
                self.request_timeout.as_millis()
            ))),
        }
    }
}

impl Service<ApiRequest> for HyperTransport {
    type Response = ApiResponse;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: ApiRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(this.send(request))
    }
}

/// Join a relative `uri` onto `base_url`; absolute URIs pass through.
pub fn resolve_uri(base_url: &Url, uri: &Uri) -> Result<Uri, TransportError> {
    if uri.scheme().is_some() {
        return Ok(uri.clone());
    }

    let path_and_query = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    let base = base_url.as_str().trim_end_matches('/');
    let full = format!("{}{}", base, path_and_query);

    full.parse()
        .map_err(|e| TransportError::InvalidRequest(format!("invalid uri '{}': {}", full, e)))
}

/// Map a hyper client error onto the transport taxonomy.
fn classify_client_error(err: hyper_util::client::legacy::Error) -> TransportError {
    if let Some(io_err) = find_io_error(&err) {
        match io_err.kind() {
            io::ErrorKind::TimedOut => return TransportError::Timeout(io_err.to_string()),
            io::ErrorKind::ConnectionRefused => {
                return TransportError::ConnectionRefused(io_err.to_string())
            }
            io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
                return TransportError::NoRouteToHost(io_err.to_string())
            }
            _ => {}
        }
    }

    let chain = error_chain(&err);
    if chain.contains("dns error") || chain.contains("failed to lookup address") {
        return TransportError::UnknownHost(chain);
    }

    TransportError::Http(err)
}

fn find_io_error<'a>(err: &'a (dyn std::error::Error + 'static)) -> Option<&'a io::Error> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            return Some(io_err);
        }
        current = e.source();
    }
    None
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        chain.push_str(": ");
        chain.push_str(&e.to_string());
        source = e.source();
    }
    chain.to_lowercase()
}
