//! Shared client resources and per-client options

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Default TCP connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay before a broken direct connection is re-opened
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(0);

/// Shared runtime resources reusable across many clients.
///
/// A `ClientResources` value is a handle: cloning it shares the same
/// underlying resources. Configurations and connection factories only hold a
/// reference; the owner of the handle decides when the runtime it points to
/// goes away.
///
/// # Examples
///
/// ```ignore
/// let resources = ClientResources::builder()
///     .runtime(tokio::runtime::Handle::current())
///     .resolve("redis.internal", "10.0.0.7:6379".parse()?)
///     .build();
/// ```
#[derive(Clone)]
pub struct ClientResources {
    inner: Arc<ResourcesInner>,
}

struct ResourcesInner {
    runtime: Option<tokio::runtime::Handle>,
    address_overrides: HashMap<String, Vec<SocketAddr>>,
    reconnect_delay: Duration,
}

impl ClientResources {
    /// Create a resources builder
    pub fn builder() -> ClientResourcesBuilder {
        ClientResourcesBuilder::default()
    }

    /// Runtime on which background tasks (pool warm-up) are spawned.
    ///
    /// `None` means the runtime of the calling task.
    pub fn runtime(&self) -> Option<&tokio::runtime::Handle> {
        self.inner.runtime.as_ref()
    }

    /// Statically configured addresses for `host`, if any.
    pub fn resolve(&self, host: &str) -> Option<&[SocketAddr]> {
        self.inner.address_overrides.get(host).map(Vec::as_slice)
    }

    /// Delay before re-opening a broken connection
    pub fn reconnect_delay(&self) -> Duration {
        self.inner.reconnect_delay
    }

    /// Whether two handles point at the same resources
    pub fn ptr_eq(&self, other: &ClientResources) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for ClientResources {
    fn default() -> Self {
        ClientResourcesBuilder::default().build()
    }
}

impl PartialEq for ClientResources {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl std::fmt::Debug for ClientResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientResources")
            .field("runtime", &self.inner.runtime.as_ref().map(|_| "<Handle>"))
            .field("address_overrides", &self.inner.address_overrides)
            .field("reconnect_delay", &self.inner.reconnect_delay)
            .finish()
    }
}

/// Builder for [`ClientResources`]
#[derive(Default)]
pub struct ClientResourcesBuilder {
    runtime: Option<tokio::runtime::Handle>,
    address_overrides: HashMap<String, Vec<SocketAddr>>,
    reconnect_delay: Option<Duration>,
}

impl ClientResourcesBuilder {
    /// Spawn background work on this runtime
    pub fn runtime(mut self, handle: tokio::runtime::Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Resolve `host` to `addr` instead of asking the system resolver.
    ///
    /// May be called repeatedly for the same host; addresses are tried in
    /// insertion order.
    pub fn resolve(mut self, host: impl Into<String>, addr: SocketAddr) -> Self {
        self.address_overrides
            .entry(host.into())
            .or_default()
            .push(addr);
        self
    }

    /// Delay before a broken direct connection is re-opened
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = Some(delay);
        self
    }

    /// Build the shared handle
    pub fn build(self) -> ClientResources {
        ClientResources {
            inner: Arc::new(ResourcesInner {
                runtime: self.runtime,
                address_overrides: self.address_overrides,
                reconnect_delay: self.reconnect_delay.unwrap_or(DEFAULT_RECONNECT_DELAY),
            }),
        }
    }
}

/// Per-client connection options.
///
/// | Option | Default |
/// |---|---|
/// | `connect_timeout` | 10s |
/// | `tcp_nodelay` | true |
/// | `auto_reconnect` | true |
/// | `ping_before_activate` | false |
/// | `client_name` | none |
/// | `trusted_ca_path` | none (system roots) |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    connect_timeout: Duration,
    tcp_nodelay: bool,
    auto_reconnect: bool,
    ping_before_activate: bool,
    client_name: Option<String>,
    trusted_ca_path: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            tcp_nodelay: true,
            auto_reconnect: true,
            ping_before_activate: false,
            client_name: None,
            trusted_ca_path: None,
        }
    }
}

impl ClientOptions {
    /// Create an options builder starting from the defaults
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder {
            options: ClientOptions::default(),
        }
    }

    /// TCP connect timeout
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Whether Nagle's algorithm is disabled
    pub fn tcp_nodelay(&self) -> bool {
        self.tcp_nodelay
    }

    /// Whether a broken direct connection is re-opened before the next command
    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    /// Whether a `PING` must succeed before a new connection is handed out
    pub fn ping_before_activate(&self) -> bool {
        self.ping_before_activate
    }

    /// Name announced with `CLIENT SETNAME`
    pub fn client_name(&self) -> Option<&str> {
        self.client_name.as_deref()
    }

    /// PEM CA bundle used instead of the system roots
    pub fn trusted_ca_path(&self) -> Option<&str> {
        self.trusted_ca_path.as_deref()
    }
}

/// Builder for [`ClientOptions`]
#[derive(Debug, Clone)]
pub struct ClientOptionsBuilder {
    options: ClientOptions,
}

impl ClientOptionsBuilder {
    /// Set the TCP connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Enable or disable `TCP_NODELAY`
    pub fn tcp_nodelay(mut self, nodelay: bool) -> Self {
        self.options.tcp_nodelay = nodelay;
        self
    }

    /// Enable or disable automatic reconnects
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.options.auto_reconnect = enabled;
        self
    }

    /// Require a successful `PING` on every new connection
    pub fn ping_before_activate(mut self, enabled: bool) -> Self {
        self.options.ping_before_activate = enabled;
        self
    }

    /// Announce this name with `CLIENT SETNAME`
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.options.client_name = Some(name.into());
        self
    }

    /// Trust certificates from this PEM file instead of the system roots
    pub fn trusted_ca_path(mut self, path: impl Into<String>) -> Self {
        self.options.trusted_ca_path = Some(path.into());
        self
    }

    /// Build the options
    pub fn build(self) -> ClientOptions {
        self.options
    }
}
