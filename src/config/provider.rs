//! Shared, swappable configuration.
//!
//! # Responsibilities
//! - Expose the current environment and mock flag to the pipeline
//! - Replace the whole configuration atomically on reload or toggle
//!
//! # Design Decisions
//! - Readers never lock; `ArcSwap` gives a consistent snapshot per load
//! - A toggle is a full config swap, never in-place mutation
//! - Calls already in flight keep the profile they started with

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::config::schema::{CallProfile, Environment, PipelineConfig};

/// Source of the per-call environment settings.
pub trait EnvironmentProvider: Send + Sync {
    /// Current settings. Must be cheap and non-blocking.
    fn call_profile(&self) -> CallProfile;

    fn environment(&self) -> Environment {
        self.call_profile().environment
    }

    fn mock_enabled(&self) -> bool {
        self.call_profile().mock_enabled
    }
}

/// Fixed settings, for embedding and tests.
impl EnvironmentProvider for CallProfile {
    fn call_profile(&self) -> CallProfile {
        *self
    }
}

/// Cloneable handle to the live configuration.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<ArcSwap<PipelineConfig>>,
}

impl ConfigHandle {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Current configuration snapshot.
    pub fn snapshot(&self) -> Arc<PipelineConfig> {
        self.inner.load_full()
    }

    /// Atomically replace the configuration.
    pub fn replace(&self, config: PipelineConfig) {
        tracing::info!(
            environment = %config.environment,
            mock_enabled = config.mock_enabled(),
            "Pipeline configuration replaced"
        );
        self.inner.store(Arc::new(config));
    }

    /// Swap in a copy of the current config with a different mock override.
    pub fn set_mock_override(&self, mock_override: Option<bool>) {
        let mut next = (*self.snapshot()).clone();
        next.mock_override = mock_override;
        self.replace(next);
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl EnvironmentProvider for ConfigHandle {
    fn call_profile(&self) -> CallProfile {
        self.inner.load().call_profile()
    }
}
