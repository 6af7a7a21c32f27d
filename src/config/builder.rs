//! Staged builders for [`ClientConfiguration`]
//!
//! The builder is a two-level state machine encoded in types:
//!
//! ```text
//! ClientConfigurationBuilder<M> --use_ssl()--> SslClientConfigurationBuilder<M>
//! SslClientConfigurationBuilder<M> --and()--> ClientConfigurationBuilder<M>
//! ClientConfigurationBuilder<M> --with_connection_pooling(p)--> ClientConfigurationBuilder<Pooled>
//! ```
//!
//! `build()` exists only on `ClientConfigurationBuilder`, so a configuration
//! can never be produced while the SSL sub-builder is open, and the TLS flags
//! can only be touched after `use_ssl()`. The mode parameter `M` decides
//! whether `build()` yields a direct or a pooled configuration.

use super::pool_config::PoolConfig;
use super::resources::{ClientOptions, ClientResources};
use super::{ClientConfiguration, DEFAULT_COMMAND_TIMEOUT, DEFAULT_SHUTDOWN_TIMEOUT};
use std::time::Duration;

/// Builder mode: connections are opened directly, one per client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Direct;

/// Builder mode: connections are drawn from a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pooled {
    pool_config: PoolConfig,
}

/// Builder that produces pooled configurations
pub type PoolingClientConfigurationBuilder = ClientConfigurationBuilder<Pooled>;

/// Mutable field set shared by every builder mode
#[derive(Debug, Clone)]
struct Settings {
    use_ssl: bool,
    verify_peer: bool,
    start_tls: bool,
    client_resources: Option<ClientResources>,
    client_options: Option<ClientOptions>,
    command_timeout: Duration,
    shutdown_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_ssl: false,
            verify_peer: true,
            start_tls: false,
            client_resources: None,
            client_options: None,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// Fluent builder for [`ClientConfiguration`]
///
/// # Examples
///
/// ```ignore
/// let config = ClientConfiguration::builder()
///     .use_ssl()
///     .disable_peer_verification()
///     .and()
///     .command_timeout(Duration::from_secs(5))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfigurationBuilder<M = Direct> {
    settings: Settings,
    mode: M,
}

impl ClientConfigurationBuilder<Direct> {
    pub(crate) fn new() -> Self {
        Self {
            settings: Settings::default(),
            mode: Direct,
        }
    }

    /// Build a direct (non-pooled) configuration.
    ///
    /// Every call returns a new, independent value.
    pub fn build(&self) -> ClientConfiguration {
        self.freeze(None)
    }
}

impl Default for ClientConfigurationBuilder<Direct> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> ClientConfigurationBuilder<M> {
    /// Enable TLS and open the SSL sub-builder
    pub fn use_ssl(mut self) -> SslClientConfigurationBuilder<M> {
        self.settings.use_ssl = true;
        SslClientConfigurationBuilder { parent: self }
    }

    /// Share these runtime resources with the client
    pub fn client_resources(mut self, resources: ClientResources) -> Self {
        self.settings.client_resources = Some(resources);
        self
    }

    /// Use these connection options
    pub fn client_options(mut self, options: ClientOptions) -> Self {
        self.settings.client_options = Some(options);
        self
    }

    /// Bound every command round-trip
    ///
    /// Default: 60 seconds
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.settings.command_timeout = timeout;
        self
    }

    /// Bound orderly shutdown of the client
    ///
    /// Default: 100 milliseconds
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.settings.shutdown_timeout = timeout;
        self
    }

    /// Switch to a pooled configuration.
    ///
    /// Everything configured so far is carried over. This builder is consumed.
    pub fn with_connection_pooling(self, pool_config: PoolConfig) -> PoolingClientConfigurationBuilder {
        PoolingClientConfigurationBuilder::from_base(self, pool_config)
    }

    fn freeze(&self, pool_config: Option<PoolConfig>) -> ClientConfiguration {
        let settings = self.settings.clone();
        ClientConfiguration {
            use_ssl: settings.use_ssl,
            verify_peer: settings.verify_peer,
            start_tls: settings.start_tls,
            client_resources: settings.client_resources,
            client_options: settings.client_options,
            command_timeout: settings.command_timeout,
            shutdown_timeout: settings.shutdown_timeout,
            pool_config,
        }
    }
}

impl ClientConfigurationBuilder<Pooled> {
    /// Create a pooling builder from an existing builder.
    ///
    /// All fields of `base` are copied over field by field; if `base` already
    /// was a pooling builder its pool configuration is replaced.
    pub fn from_base<M>(base: ClientConfigurationBuilder<M>, pool_config: PoolConfig) -> Self {
        let Settings {
            use_ssl,
            verify_peer,
            start_tls,
            client_resources,
            client_options,
            command_timeout,
            shutdown_timeout,
        } = base.settings;

        tracing::debug!(
            use_ssl,
            max_total = pool_config.max_total(),
            "switching to pooled client configuration"
        );

        Self {
            settings: Settings {
                use_ssl,
                verify_peer,
                start_tls,
                client_resources,
                client_options,
                command_timeout,
                shutdown_timeout,
            },
            mode: Pooled { pool_config },
        }
    }

    /// Pool configuration that `build()` will attach
    pub fn pool_config(&self) -> &PoolConfig {
        &self.mode.pool_config
    }

    /// Build a pooled configuration.
    ///
    /// Every call returns a new, independent value.
    pub fn build(&self) -> ClientConfiguration {
        self.freeze(Some(self.mode.pool_config.clone()))
    }
}

/// TLS sub-builder returned by [`ClientConfigurationBuilder::use_ssl`].
///
/// Return to the parent builder with [`and`](Self::and); flags set here are
/// kept.
#[derive(Debug, Clone)]
pub struct SslClientConfigurationBuilder<M = Direct> {
    parent: ClientConfigurationBuilder<M>,
}

impl<M> SslClientConfigurationBuilder<M> {
    /// Accept any server certificate (development only)
    pub fn disable_peer_verification(mut self) -> Self {
        self.parent.settings.verify_peer = false;
        self
    }

    /// Open the connection in plaintext and upgrade it to TLS before the
    /// first command
    pub fn start_tls(mut self) -> Self {
        self.parent.settings.start_tls = true;
        self
    }

    /// Return to the parent builder
    pub fn and(self) -> ClientConfigurationBuilder<M> {
        self.parent
    }
}
