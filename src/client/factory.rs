//! Connection factory

use super::connection_string::{ConnectionInfo, Endpoint};
use super::executor::{ClientExecutor, SharedConnection};
use crate::config::{ClientConfiguration, ClientOptions};
use crate::connection::{Connection, ConnectionConfig, TlsConfig, Transport};
use crate::ops::Operations;
use crate::pool::Pool;
use crate::{Error, Result};
use std::sync::Arc;

/// Opens connections for one endpoint with one [`ClientConfiguration`].
///
/// The factory validates the combination of endpoint and configuration up
/// front and prebuilds the TLS client config, so `connect()` only does I/O.
/// Cloning is cheap and shares everything.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> kvwire::Result<()> {
/// use kvwire::{ClientConfiguration, ConnectionFactory, ConnectionInfo};
///
/// let info = ConnectionInfo::parse("redis://localhost:6379/0")?;
/// let factory = ConnectionFactory::new(info, ClientConfiguration::default())?;
/// let ops = factory.operations().await?;
/// let users = ops.bound_hash_ops::<_, String, String>("user:42");
/// users.put(&"name".to_string(), &"Ada".to_string()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConnectionFactory {
    inner: Arc<FactoryInner>,
}

struct FactoryInner {
    info: ConnectionInfo,
    config: ClientConfiguration,
    options: ClientOptions,
    connection_config: ConnectionConfig,
    tls: Option<TlsConfig>,
}

impl ConnectionFactory {
    /// Create a factory.
    ///
    /// TLS is governed by `config`; the TLS flags of `info` only matter when
    /// the configuration was seeded with
    /// [`ConnectionInfo::to_configuration_builder`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when TLS is requested for a Unix socket or the
    /// TLS settings cannot be built (unreadable CA file).
    pub fn new(info: ConnectionInfo, config: ClientConfiguration) -> Result<Self> {
        if config.is_use_ssl() && matches!(info.endpoint, Endpoint::Unix(_)) {
            return Err(Error::Config("TLS is not supported over unix sockets".into()));
        }

        let options = config.effective_options();

        let tls = if config.is_use_ssl() {
            let mut builder = TlsConfig::builder().verify_peer(config.is_verify_peer());
            if let Some(ca_path) = options.trusted_ca_path() {
                builder = builder.ca_cert_path(ca_path);
            }
            Some(builder.build()?)
        } else {
            None
        };

        let mut connection_config = ConnectionConfig::builder()
            .database(info.database)
            .ping_before_activate(options.ping_before_activate())
            .command_timeout(config.command_timeout());
        if let Some(username) = &info.username {
            connection_config = connection_config.username(username.clone());
        }
        if let Some(password) = &info.password {
            connection_config = connection_config.password(password.clone());
        }
        if let Some(name) = options.client_name().or(info.client_name.as_deref()) {
            connection_config = connection_config.client_name(name);
        }

        Ok(Self {
            inner: Arc::new(FactoryInner {
                info,
                config,
                options,
                connection_config: connection_config.build(),
                tls,
            }),
        })
    }

    /// Endpoint this factory connects to
    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.inner.info
    }

    /// Configuration this factory was built with
    pub fn configuration(&self) -> &ClientConfiguration {
        &self.inner.config
    }

    /// Open and activate one connection
    pub async fn connect(&self) -> Result<Connection> {
        let inner = &*self.inner;
        let resources = inner.config.client_resources();
        let start_tls = inner.config.is_start_tls();

        let (transport, upgrade) = match &inner.info.endpoint {
            Endpoint::Tcp { host, port } => match &inner.tls {
                Some(tls) if start_tls => (
                    Transport::connect_tcp(host, *port, &inner.options, resources).await?,
                    Some((tls, host.as_str())),
                ),
                Some(tls) => (
                    Transport::connect_tcp_tls(host, *port, &inner.options, resources, tls)
                        .await?,
                    None,
                ),
                None => (
                    Transport::connect_tcp(host, *port, &inner.options, resources).await?,
                    None,
                ),
            },
            Endpoint::Unix(path) => (Transport::connect_unix(path, &inner.options).await?, None),
        };

        let mut conn = Connection::new(transport, inner.config.command_timeout());
        conn.startup(&inner.connection_config, upgrade).await?;
        tracing::info!(
            endpoint = %inner.info.endpoint,
            connection = conn.id(),
            "connected"
        );
        Ok(conn)
    }

    /// Build the operations handle for this configuration.
    ///
    /// Direct mode opens its single connection now. Pooled mode creates the
    /// pool and opens `min_idle` connections before returning.
    pub async fn operations(&self) -> Result<Operations<ClientExecutor>> {
        let executor = match self.inner.config.pool_config() {
            Some(pool_config) => {
                let pool = Pool::new(self.clone(), pool_config.clone());
                pool.warm_up().await?;
                ClientExecutor::Pooled(pool)
            }
            None => ClientExecutor::Direct(SharedConnection::connect(self.clone()).await?),
        };
        Ok(Operations::new(executor, self.inner.config.shutdown_timeout()))
    }
}

impl std::fmt::Debug for ConnectionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionFactory")
            .field("endpoint", &self.inner.info.endpoint)
            .field("config", &self.inner.config)
            .field("tls", &self.inner.tls)
            .finish()
    }
}
