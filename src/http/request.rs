//! Request descriptor handling.
//!
//! # Responsibilities
//! - Generate a unique request ID per logical call (UUID v4)
//! - Hold method, URI, headers and an owned body that every attempt re-sends
//! - Carry the `CallProfile` stamped by the retry orchestrator
//!
//! # Design Decisions
//! - Body is `Bytes`, so cloning a request for another attempt is cheap
//! - Request ID is assigned at construction and survives every retry
//! - URIs may be relative; the transport resolves them against its base URL

use axum::body::Bytes;
use axum::http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, Uri};
use serde::Serialize;
use uuid::Uuid;

use crate::config::CallProfile;
use crate::transport::TransportError;

/// Header carrying the request ID to the backend.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Unique identifier for one logical API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generate a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single outgoing API request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    id: RequestId,
    profile: Option<CallProfile>,
}

impl ApiRequest {
    /// Create a request for the given method and URI (absolute or path-only).
    pub fn new(method: Method, uri: &str) -> Result<Self, TransportError> {
        let uri: Uri = uri
            .parse()
            .map_err(|e| TransportError::InvalidRequest(format!("invalid uri '{}': {}", uri, e)))?;

        Ok(Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            id: RequestId::new(),
            profile: None,
        })
    }

    pub fn get(uri: &str) -> Result<Self, TransportError> {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Result<Self, TransportError> {
        Self::new(Method::POST, uri)
    }

    pub fn put(uri: &str) -> Result<Self, TransportError> {
        Self::new(Method::PUT, uri)
    }

    pub fn delete(uri: &str) -> Result<Self, TransportError> {
        Self::new(Method::DELETE, uri)
    }

    /// Add or replace a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace the raw body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `value` as the JSON body and set the content type.
    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, TransportError> {
        let body = serde_json::to_vec(value)
            .map_err(|e| TransportError::InvalidRequest(format!("unserializable body: {}", e)))?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Bytes::from(body);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Path component of the URI.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Profile stamped by the retry orchestrator, if the request went through one.
    pub fn profile(&self) -> Option<CallProfile> {
        self.profile
    }

    pub(crate) fn set_profile(&mut self, profile: CallProfile) {
        self.profile = Some(profile);
    }

    /// Body parsed as JSON, if it is JSON.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }
}
