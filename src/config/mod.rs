//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PipelineConfig (validated, immutable)
//!     → provider.rs (ConfigHandle, shared by every layer)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap inside ConfigHandle
//!     → new calls observe new config; in-flight calls keep their snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod provider;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use provider::{ConfigHandle, EnvironmentProvider};
pub use schema::{
    CallProfile, Environment, ObservabilityConfig, PipelineConfig, TrafficLogConfig,
    TransportConfig,
};
