//! Shared utilities for pipeline integration tests.

use axum::http::StatusCode;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::service_fn;
use tower::util::BoxCloneService;

use todo_api_pipeline::config::{ConfigHandle, Environment, PipelineConfig};
use todo_api_pipeline::observability::{CallFailure, CallInfo, DiagnosticsSink};
use todo_api_pipeline::{ApiRequest, ApiResponse, TransportError};

pub type TestTransport = BoxCloneService<ApiRequest, ApiResponse, TransportError>;

/// Config handle for `environment` with an optional mock override.
#[allow(dead_code)]
pub fn config_handle(environment: Environment, mock_override: Option<bool>) -> ConfigHandle {
    ConfigHandle::new(PipelineConfig {
        environment,
        mock_override,
        ..PipelineConfig::default()
    })
}

/// Transport that replays `script` in order; the last entry repeats.
/// Returns the transport and its invocation counter.
#[allow(dead_code)]
pub fn scripted_transport<F>(script: F) -> (TestTransport, Arc<AtomicUsize>)
where
    F: Fn(usize) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
{
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let script = Arc::new(script);
    let transport = service_fn(move |_req: ApiRequest| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        let result = script(n);
        async move { result }
    });
    (BoxCloneService::new(transport), calls)
}

/// Transport answering with the given status codes in order.
#[allow(dead_code)]
pub fn status_sequence(codes: &'static [u16]) -> (TestTransport, Arc<AtomicUsize>) {
    scripted_transport(move |n| {
        let code = codes[n.min(codes.len() - 1)];
        Ok(ApiResponse::new(StatusCode::from_u16(code).unwrap()))
    })
}

/// One diagnostics event, flattened for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Event {
    Started(String),
    Retried { attempt: u32, max_attempts: u32 },
    Succeeded(u16),
    FailedStatus(u16),
    FailedTransport(String),
}

/// Sink that records every event in order.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn retries(&self) -> Vec<(u32, u32)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Retried {
                    attempt,
                    max_attempts,
                } => Some((attempt, max_attempts)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl DiagnosticsSink for RecordingSink {
    fn call_started(&self, call: &CallInfo) {
        self.push(Event::Started(call.path.clone()));
    }

    fn call_succeeded(&self, _call: &CallInfo, status: StatusCode, _elapsed: Duration) {
        self.push(Event::Succeeded(status.as_u16()));
    }

    fn call_failed(&self, _call: &CallInfo, failure: CallFailure<'_>, _elapsed: Duration) {
        match failure {
            CallFailure::Status(status) => self.push(Event::FailedStatus(status.as_u16())),
            CallFailure::Transport(err) => {
                self.push(Event::FailedTransport(err.kind().as_str().to_string()))
            }
        }
    }

    fn call_retried(&self, _call: &CallInfo, attempt: u32, max_attempts: u32) {
        self.push(Event::Retried {
            attempt,
            max_attempts,
        });
    }
}

/// Start a programmable backend on an ephemeral port.
/// `f` receives the zero-based request count and returns status and body.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);
    let count = Arc::new(AtomicUsize::new(0));

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            let n = count.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                read_request_head(&mut socket).await;
                let (status, body) = f(n).await;
                let reason = StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown");
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Drain the request line and headers so closing the socket does not reset it.
async fn read_request_head(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
