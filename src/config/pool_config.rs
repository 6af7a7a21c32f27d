//! Connection pool configuration

use crate::{Error, Result};
use std::time::Duration;

/// Connection pool settings.
///
/// | Field | Default |
/// |---|---|
/// | `max_total` | 8 |
/// | `max_idle` | 8 |
/// | `min_idle` | 0 |
/// | `max_wait` | none (wait until a connection frees up) |
/// | `test_on_borrow` | false |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    max_total: usize,
    max_idle: usize,
    min_idle: usize,
    max_wait: Option<Duration>,
    test_on_borrow: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_total: 8,
            max_idle: 8,
            min_idle: 0,
            max_wait: None,
            test_on_borrow: false,
        }
    }
}

impl PoolConfig {
    /// Create a builder starting from the defaults
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder {
            config: PoolConfig::default(),
        }
    }

    /// Maximum number of connections, idle plus checked out
    pub fn max_total(&self) -> usize {
        self.max_total
    }

    /// Maximum number of idle connections kept for reuse
    pub fn max_idle(&self) -> usize {
        self.max_idle
    }

    /// Number of connections opened eagerly when the pool starts
    pub fn min_idle(&self) -> usize {
        self.min_idle
    }

    /// How long a checkout may wait for a free connection
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    /// Whether an idle connection is pinged before it is handed out
    pub fn test_on_borrow(&self) -> bool {
        self.test_on_borrow
    }
}

/// Builder for [`PoolConfig`]
#[derive(Debug, Clone)]
pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    /// Set the maximum number of connections
    pub fn max_total(mut self, max_total: usize) -> Self {
        self.config.max_total = max_total;
        self
    }

    /// Set the maximum number of idle connections
    pub fn max_idle(mut self, max_idle: usize) -> Self {
        self.config.max_idle = max_idle;
        self
    }

    /// Set the number of connections opened on start
    pub fn min_idle(mut self, min_idle: usize) -> Self {
        self.config.min_idle = min_idle;
        self
    }

    /// Bound how long a checkout waits for a free connection
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.config.max_wait = Some(max_wait);
        self
    }

    /// Ping idle connections before handing them out
    pub fn test_on_borrow(mut self, enabled: bool) -> Self {
        self.config.test_on_borrow = enabled;
        self
    }

    /// Validate and build the configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `max_total` is zero or above
    /// [`tokio::sync::Semaphore::MAX_PERMITS`], if `max_idle` exceeds
    /// `max_total` or if `min_idle` exceeds `max_idle`.
    pub fn build(self) -> Result<PoolConfig> {
        let config = self.config;
        if config.max_total == 0 {
            return Err(Error::InvalidArgument(
                "pool max_total must be greater than zero".into(),
            ));
        }
        if config.max_total > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(Error::InvalidArgument(format!(
                "pool max_total ({}) must not exceed {}",
                config.max_total,
                tokio::sync::Semaphore::MAX_PERMITS
            )));
        }
        if config.max_idle > config.max_total {
            return Err(Error::InvalidArgument(format!(
                "pool max_idle ({}) must not exceed max_total ({})",
                config.max_idle, config.max_total
            )));
        }
        if config.min_idle > config.max_idle {
            return Err(Error::InvalidArgument(format!(
                "pool min_idle ({}) must not exceed max_idle ({})",
                config.min_idle, config.max_idle
            )));
        }
        Ok(config)
    }
}
