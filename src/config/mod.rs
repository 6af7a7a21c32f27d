//! Client configuration
//!
//! This module handles:
//! * The immutable [`ClientConfiguration`] consumed by the connection factory
//! * Staged builders (plain, TLS sub-builder, pooling)
//! * Pool settings, shared client resources and per-client options

mod builder;
mod pool_config;
mod resources;

pub use builder::{
    ClientConfigurationBuilder, Direct, Pooled, PoolingClientConfigurationBuilder,
    SslClientConfigurationBuilder,
};
pub use pool_config::{PoolConfig, PoolConfigBuilder};
pub use resources::{
    ClientOptions, ClientOptionsBuilder, ClientResources, ClientResourcesBuilder,
    DEFAULT_CONNECT_TIMEOUT,
};

use std::time::Duration;

/// Default command timeout
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Default shutdown timeout
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(100);

/// Immutable client configuration.
///
/// Created only through [`ClientConfiguration::builder`]. Once built it is a
/// plain value: cheap to clone, safe to share between tasks, and never
/// mutated. `verify_peer` and `start_tls` are only consulted when `use_ssl`
/// is set.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfiguration {
    pub(crate) use_ssl: bool,
    pub(crate) verify_peer: bool,
    pub(crate) start_tls: bool,
    pub(crate) client_resources: Option<ClientResources>,
    pub(crate) client_options: Option<ClientOptions>,
    pub(crate) command_timeout: Duration,
    pub(crate) shutdown_timeout: Duration,
    pub(crate) pool_config: Option<PoolConfig>,
}

impl ClientConfiguration {
    /// Start building a configuration from the defaults
    pub fn builder() -> ClientConfigurationBuilder {
        ClientConfigurationBuilder::new()
    }

    /// Whether connections use TLS
    pub fn is_use_ssl(&self) -> bool {
        self.use_ssl
    }

    /// Whether the server certificate is verified (TLS only)
    pub fn is_verify_peer(&self) -> bool {
        self.verify_peer
    }

    /// Whether TLS is negotiated after a plaintext connect (TLS only)
    pub fn is_start_tls(&self) -> bool {
        self.start_tls
    }

    /// Shared runtime resources, if configured
    pub fn client_resources(&self) -> Option<&ClientResources> {
        self.client_resources.as_ref()
    }

    /// Connection options, if configured
    pub fn client_options(&self) -> Option<&ClientOptions> {
        self.client_options.as_ref()
    }

    /// Upper bound of a single command round-trip
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Upper bound of orderly shutdown
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Whether this configuration was built by the pooling builder
    pub fn is_pooling_enabled(&self) -> bool {
        self.pool_config.is_some()
    }

    /// Pool settings; present iff pooling is enabled
    pub fn pool_config(&self) -> Option<&PoolConfig> {
        self.pool_config.as_ref()
    }

    /// Connection options, falling back to the defaults
    pub(crate) fn effective_options(&self) -> ClientOptions {
        self.client_options.clone().unwrap_or_default()
    }
}

impl Default for ClientConfiguration {
    fn default() -> Self {
        Self::builder().build()
    }
}
