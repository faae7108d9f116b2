//! Configuration file watcher for hot reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::loader::load_config;
use crate::config::provider::ConfigHandle;

/// A watcher that reloads the configuration file into a `ConfigHandle`.
pub struct ConfigWatcher {
    path: PathBuf,
    handle: ConfigHandle,
}

impl ConfigWatcher {
    pub fn new(path: &Path, handle: ConfigHandle) -> Self {
        Self {
            path: path.to_path_buf(),
            handle,
        }
    }

    /// Start watching the file. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let handle = self.handle.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        reload(&path, &handle);
                    }
                }
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Load the file and swap it in; keep the current config on failure.
fn reload(path: &Path, handle: &ConfigHandle) -> bool {
    tracing::info!(path = ?path, "Config file change detected, reloading");
    match load_config(path) {
        Ok(config) => {
            handle.replace(config);
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
            false
        }
    }
}
