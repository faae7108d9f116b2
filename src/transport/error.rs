//! Transport error taxonomy.

use thiserror::Error;

/// Failures raised while exchanging a request with the backend.
///
/// The retry orchestrator hands these back to callers exactly as the
/// transport produced them.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connect or read deadline elapsed.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Host name could not be resolved.
    #[error("unknown host: {0}")]
    UnknownHost(String),

    /// Peer actively refused the connection.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// Host or network unreachable.
    #[error("no route to host: {0}")]
    NoRouteToHost(String),

    /// Call was cancelled by the caller or by shutdown.
    #[error("request cancelled")]
    Cancelled,

    /// Request could not be built (bad URI, unserializable body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// Unclassified HTTP client failure.
    #[error("http client error: {0}")]
    Http(#[source] hyper_util::client::legacy::Error),

    #[error("{0}")]
    Other(String),
}

/// Coarse error category, used for metric labels and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    Timeout,
    UnknownHost,
    ConnectionRefused,
    NoRouteToHost,
    Cancelled,
    InvalidRequest,
    Body,
    Other,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::UnknownHost => "unknown_host",
            TransportErrorKind::ConnectionRefused => "connection_refused",
            TransportErrorKind::NoRouteToHost => "no_route_to_host",
            TransportErrorKind::Cancelled => "cancelled",
            TransportErrorKind::InvalidRequest => "invalid_request",
            TransportErrorKind::Body => "body",
            TransportErrorKind::Other => "other",
        }
    }
}

impl TransportError {
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            TransportError::Timeout(_) => TransportErrorKind::Timeout,
            TransportError::UnknownHost(_) => TransportErrorKind::UnknownHost,
            TransportError::ConnectionRefused(_) => TransportErrorKind::ConnectionRefused,
            TransportError::NoRouteToHost(_) => TransportErrorKind::NoRouteToHost,
            TransportError::Cancelled => TransportErrorKind::Cancelled,
            TransportError::InvalidRequest(_) => TransportErrorKind::InvalidRequest,
            TransportError::Body(_) => TransportErrorKind::Body,
            TransportError::Http(_) | TransportError::Other(_) => TransportErrorKind::Other,
        }
    }

    /// Lowercased message including every source in the chain.
    pub fn message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message.to_lowercase()
    }
}
