//! Transport subsystem.
//!
//! # Data Flow
//! ```text
//! ApiRequest (from the innermost pipeline layer)
//!     → client.rs (resolve URI against base URL, send via hyper)
//!     → buffer response body (bounded)
//!     → ApiResponse | TransportError (classified)
//! ```
//!
//! # Design Decisions
//! - Any `tower::Service<ApiRequest>` can act as the transport; tests use `service_fn`
//! - Low-level errors are classified at this boundary so retry policy never sees hyper types
//! - Every exchange has a deadline

pub mod client;
pub mod error;

pub use client::{resolve_uri, HyperTransport};
pub use error::{TransportError, TransportErrorKind};
