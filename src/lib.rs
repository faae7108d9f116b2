//! Retrying, logging, mock-aware HTTP client pipeline for the todo API.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod transport;

pub use config::schema::PipelineConfig;
pub use config::ConfigHandle;
pub use http::{ApiRequest, ApiResponse, Pipeline};
pub use lifecycle::Shutdown;
pub use transport::TransportError;
