//! Core connection type

use super::state::ConnectionState;
use super::tls::TlsConfig;
use super::transport::Transport;
use crate::protocol::{decode_value, encode_command, Command, Value};
use crate::{Error, Result};
use bytes::BytesMut;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::Instrument;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Per-connection settings applied during activation
///
/// Use `ConnectionConfig::builder()` to set credentials, database and timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// ACL username (`AUTH user password`)
    pub username: Option<String>,
    /// Password (optional)
    pub password: Option<String>,
    /// Logical database selected with `SELECT` (0 = skip)
    pub database: u32,
    /// Name announced with `CLIENT SETNAME`
    pub client_name: Option<String>,
    /// Send `PING` before the connection is handed out
    pub ping_before_activate: bool,
    /// Upper bound of one command round-trip
    pub command_timeout: Duration,
}

impl ConnectionConfig {
    /// Create a builder
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let config = ConnectionConfig::builder()
    ///     .password("secret")
    ///     .database(2)
    ///     .command_timeout(Duration::from_secs(5))
    ///     .build();
    /// ```
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ConnectionConfig`]
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfigBuilder {
    username: Option<String>,
    password: Option<String>,
    database: u32,
    client_name: Option<String>,
    ping_before_activate: bool,
    command_timeout: Option<Duration>,
}

impl ConnectionConfigBuilder {
    /// Set the ACL username
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Select a logical database after connect
    pub fn database(mut self, database: u32) -> Self {
        self.database = database;
        self
    }

    /// Announce a client name
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// Verify the connection with `PING` during activation
    pub fn ping_before_activate(mut self, enabled: bool) -> Self {
        self.ping_before_activate = enabled;
        self
    }

    /// Set the command round-trip timeout
    ///
    /// Default: [`crate::config::DEFAULT_COMMAND_TIMEOUT`]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Build the configuration
    pub fn build(self) -> ConnectionConfig {
        ConnectionConfig {
            username: self.username,
            password: self.password,
            database: self.database,
            client_name: self.client_name,
            ping_before_activate: self.ping_before_activate,
            command_timeout: self
                .command_timeout
                .unwrap_or(crate::config::DEFAULT_COMMAND_TIMEOUT),
        }
    }
}

/// A single server connection.
///
/// Commands run strictly one at a time: `execute` writes one command and
/// reads exactly one reply. Any I/O failure, framing error or timeout closes
/// the connection for good.
pub struct Connection {
    id: u64,
    transport: Option<Transport>,
    state: ConnectionState,
    read_buf: BytesMut,
    write_buf: BytesMut,
    command_timeout: Duration,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("transport", &self.transport)
            .finish()
    }
}

impl Connection {
    /// Create connection from transport
    pub fn new(transport: Transport, command_timeout: Duration) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            transport: Some(transport),
            state: ConnectionState::Initial,
            read_buf: BytesMut::with_capacity(8192),
            write_buf: BytesMut::with_capacity(1024),
            command_timeout,
        }
    }

    /// Process-unique connection id (for logs)
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the connection can accept another command
    pub fn is_usable(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    /// Whether traffic is encrypted
    pub fn is_tls(&self) -> bool {
        self.transport.as_ref().map_or(false, Transport::is_tls)
    }

    /// Activate the connection.
    ///
    /// With `start_tls` set, the plaintext transport is upgraded to TLS
    /// before anything is sent. Then `AUTH`, `SELECT`, `CLIENT SETNAME` and
    /// the optional activation `PING` run in that order.
    pub async fn startup(
        &mut self,
        config: &ConnectionConfig,
        start_tls: Option<(&TlsConfig, &str)>,
    ) -> Result<()> {
        let id = self.id;
        let result = async {
            if let Some((tls_config, hostname)) = start_tls {
                self.negotiate_tls(tls_config, hostname).await?;
            }

            self.state.transition(ConnectionState::Activating)?;

            if let Some(password) = &config.password {
                let mut auth = Command::new("AUTH");
                if let Some(username) = &config.username {
                    auth.push_arg(username.clone());
                }
                auth.push_arg(password.clone());
                self.activation_command(&auth).await?.expect_ok()?;
                tracing::debug!("authenticated");
            }

            if config.database != 0 {
                let select = Command::new("SELECT").arg(config.database.to_string());
                self.activation_command(&select).await?.expect_ok()?;
            }

            if let Some(name) = &config.client_name {
                let setname = Command::new("CLIENT").arg("SETNAME").arg(name.clone());
                self.activation_command(&setname).await?.expect_ok()?;
            }

            if config.ping_before_activate {
                match self.activation_command(&Command::new("PING")).await? {
                    Value::Status(ref s) if s == "PONG" => {}
                    other => {
                        return Err(Error::UnexpectedResponse {
                            expected: "PONG",
                            actual: other.to_string(),
                        })
                    }
                }
            }

            self.state.transition(ConnectionState::Ready)?;
            tracing::info!(tls = self.is_tls(), "connection ready");
            Ok(())
        }
        .instrument(tracing::info_span!(
            "startup",
            connection = id,
            database = config.database
        ))
        .await;

        if result.is_err() {
            self.mark_closed();
        } else {
            crate::metrics::counters::connection_opened(self.is_tls());
        }
        result
    }

    async fn negotiate_tls(&mut self, tls_config: &TlsConfig, hostname: &str) -> Result<()> {
        self.state.transition(ConnectionState::NegotiatingTls)?;
        let transport = self.transport.take().ok_or(Error::ConnectionClosed)?;
        self.transport = Some(transport.upgrade_to_tls(tls_config, hostname).await?);
        tracing::debug!("start-tls upgrade complete");
        Ok(())
    }

    async fn activation_command(&mut self, cmd: &Command) -> Result<Value> {
        self.timed_round_trip(cmd).await
    }

    /// Execute one command and return its reply.
    ///
    /// Error replies become [`Error::Server`] or [`Error::TypeMismatch`] and
    /// leave the connection usable. Transport failures and timeouts close it.
    pub async fn execute(&mut self, cmd: &Command) -> Result<Value> {
        if self.state != ConnectionState::Ready {
            return Err(Error::InvalidState {
                expected: ConnectionState::Ready.to_string(),
                actual: self.state.to_string(),
            });
        }
        self.state.transition(ConnectionState::Busy)?;

        let started = Instant::now();
        let result = self.timed_round_trip(cmd).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        crate::metrics::histograms::command_duration(cmd.name(), elapsed_ms);

        match &result {
            Ok(_) => {
                crate::metrics::counters::command_completed(cmd.name(), "ok");
                self.state.transition(ConnectionState::Ready)?;
                tracing::debug!(connection = self.id, command = %cmd, elapsed_ms, "command ok");
            }
            Err(e) => {
                crate::metrics::counters::command_completed(cmd.name(), "error");
                crate::metrics::counters::command_error(cmd.name(), e.metric_label());
                if e.is_connection_fatal() {
                    tracing::warn!(connection = self.id, command = %cmd, error = %e, "closing connection");
                    self.mark_closed();
                } else {
                    self.state.transition(ConnectionState::Ready)?;
                    tracing::debug!(connection = self.id, command = %cmd, error = %e, "command failed");
                }
            }
        }
        result
    }

    async fn timed_round_trip(&mut self, cmd: &Command) -> Result<Value> {
        let timeout = self.command_timeout;
        match tokio::time::timeout(timeout, self.round_trip(cmd)).await {
            Ok(result) => result,
            Err(_) => {
                // A late reply would desynchronise the stream
                self.mark_closed();
                Err(Error::Timeout(timeout))
            }
        }
    }

    async fn round_trip(&mut self, cmd: &Command) -> Result<Value> {
        self.send_command(cmd).await?;
        match self.receive_value().await? {
            Value::Error(message) => Err(Error::from_server_reply(message)),
            value => Ok(value),
        }
    }

    async fn send_command(&mut self, cmd: &Command) -> Result<()> {
        self.write_buf.clear();
        encode_command(cmd, &mut self.write_buf);
        let transport = self.transport.as_mut().ok_or(Error::ConnectionClosed)?;
        transport.write_all(&self.write_buf).await?;
        transport.flush().await?;
        Ok(())
    }

    async fn receive_value(&mut self) -> Result<Value> {
        loop {
            if let Some(value) = decode_value(&mut self.read_buf)? {
                return Ok(value);
            }

            let transport = self.transport.as_mut().ok_or(Error::ConnectionClosed)?;
            let n = transport.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
    }

    fn mark_closed(&mut self) {
        // Closed is reachable from every state
        let _ = self.state.transition(ConnectionState::Closed);
    }

    /// Close the connection, sending `QUIT` first when it is still healthy
    pub async fn close(mut self) -> Result<()> {
        if self.state == ConnectionState::Ready {
            let _ = self.timed_round_trip(&Command::new("QUIT")).await;
        }
        self.mark_closed();
        if let Some(transport) = self.transport.as_mut() {
            transport.shutdown().await?;
        }
        tracing::debug!(connection = self.id, "connection closed");
        Ok(())
    }
}
