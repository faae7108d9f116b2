//! Request/response model and pipeline assembly.
//!
//! # Data Flow
//! ```text
//! Caller
//!     → request.rs (ApiRequest: method, URI, headers, buffered body, request ID)
//!     → pipeline.rs (Pipeline::execute_with_retry)
//!         → resilience / observability / routing layers
//!         → transport
//!     ← response.rs (ApiResponse: status, headers, buffered body)
//! ```
//!
//! # Design Decisions
//! - Bodies are buffered once into `Bytes`; every reader gets its own view
//! - Request IDs are UUID v4 and follow the request across retries

pub mod pipeline;
pub mod request;
pub mod response;

pub use pipeline::{Pipeline, PipelineBuilder, PipelineService};
pub use request::{ApiRequest, RequestId, X_REQUEST_ID};
pub use response::ApiResponse;
