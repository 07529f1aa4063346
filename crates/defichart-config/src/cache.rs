//! Thread-safe configuration caching with arc-swap for lock-free reads.

use crate::schema::{Config, PipelineSettings};
use arc_swap::ArcSwap;
use defichart_common::Result;
use std::sync::Arc;
use tracing::info;

/// Thread-safe configuration cache using arc-swap for lock-free reads.
pub struct ConfigCache {
    config: ArcSwap<Config>,
}

impl ConfigCache {
    /// Creates a new configuration cache with the given initial configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
        }
    }

    /// Gets the current configuration.
    pub fn get(&self) -> Arc<Config> {
        self.config.load_full()
    }

    /// Copy of the current pipeline defaults, for building a request.
    pub fn pipeline(&self) -> PipelineSettings {
        self.config.load().pipeline.clone()
    }

    /// Validates and atomically replaces the configuration.
    ///
    /// An invalid configuration leaves the current one in place.
    pub fn update(&self, config: Config) -> Result<()> {
        config.validate()?;
        self.config.store(Arc::new(config));
        info!("Configuration updated");
        Ok(())
    }
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
