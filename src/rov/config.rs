//! Configuration for the validator

use serde::{Deserialize, Serialize};

/// Configuration for a [`Rov`](crate::Rov) instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RovConfig {
    /// Build each source's index on its own thread (default: true)
    pub parallel_load: bool,
    /// Fail checks with `LoadIncomplete` instead of answering `NotFound`
    /// for sources that were never loaded (default: false)
    pub require_complete: bool,
}

impl Default for RovConfig {
    fn default() -> Self {
        Self {
            parallel_load: true,
            require_complete: false,
        }
    }
}

impl RovConfig {
    /// Create a new RovConfig builder
    pub fn builder() -> RovConfigBuilder {
        RovConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        // Every combination of the current flags is meaningful
        Ok(())
    }
}

/// Builder for RovConfig
#[derive(Debug, Default)]
pub struct RovConfigBuilder {
    config: RovConfig,
}

impl RovConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: RovConfig::default(),
        }
    }

    /// Build sources in parallel
    pub fn parallel_load(mut self, enabled: bool) -> Self {
        self.config.parallel_load = enabled;
        self
    }

    /// Require every source to be loaded before answering checks
    pub fn require_complete(mut self, enabled: bool) -> Self {
        self.config.require_complete = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<RovConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}
