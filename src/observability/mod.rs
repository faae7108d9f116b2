//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline layers produce:
//!     → traffic.rs (one request/response/error record per attempt)
//!     → diagnostics.rs (call started / retried / succeeded / failed)
//!         → logging.rs (structured log events)
//!         → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event; request ID on every record
//! - Logging never alters the response seen by the caller
//! - Metrics are cheap and a no-op until a recorder is installed

pub mod diagnostics;
pub mod logging;
pub mod metrics;
pub mod traffic;

pub use diagnostics::{CallFailure, CallInfo, DiagnosticsSink, TracingDiagnostics};
pub use traffic::{TrafficLogLayer, TrafficLogService};
