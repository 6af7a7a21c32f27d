//! Byte transports: TCP (plain or rustls) and Unix sockets

use super::tls::{parse_server_name, TlsConfig};
use crate::config::{ClientOptions, ClientResources};
use crate::{Error, Result};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};

/// TCP stream variant: plain or TLS-encrypted
#[allow(clippy::large_enum_variant)]
pub enum TcpVariant {
    /// Plain TCP connection
    Plain(TcpStream),
    /// TLS-encrypted TCP connection
    Tls(tokio_rustls::client::TlsStream<TcpStream>),
}

impl std::fmt::Debug for TcpVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TcpVariant::Plain(_) => f.write_str("TcpVariant::Plain(TcpStream)"),
            TcpVariant::Tls(_) => f.write_str("TcpVariant::Tls(TlsStream)"),
        }
    }
}

impl TcpVariant {
    async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        match self {
            TcpVariant::Plain(stream) => stream.write_all(buf).await?,
            TcpVariant::Tls(stream) => stream.write_all(buf).await?,
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        match self {
            TcpVariant::Plain(stream) => stream.flush().await?,
            TcpVariant::Tls(stream) => stream.flush().await?,
        }
        Ok(())
    }

    async fn read_buf(&mut self, buf: &mut BytesMut) -> Result<usize> {
        let n = match self {
            TcpVariant::Plain(stream) => stream.read_buf(buf).await?,
            TcpVariant::Tls(stream) => stream.read_buf(buf).await?,
        };
        Ok(n)
    }

    async fn shutdown(&mut self) -> Result<()> {
        match self {
            TcpVariant::Plain(stream) => stream.shutdown().await?,
            TcpVariant::Tls(stream) => stream.shutdown().await?,
        }
        Ok(())
    }
}

/// Transport layer abstraction
#[derive(Debug)]
#[allow(clippy::large_enum_variant)]
pub enum Transport {
    /// TCP socket (plain or TLS)
    Tcp(TcpVariant),
    /// Unix domain socket
    Unix(UnixStream),
}

impl Transport {
    /// Connect via plain TCP.
    ///
    /// Addresses registered for `host` in `resources` are tried first, in
    /// order; otherwise the system resolver is used. The whole attempt is
    /// bounded by the connect timeout of `options`.
    pub async fn connect_tcp(
        host: &str,
        port: u16,
        options: &ClientOptions,
        resources: Option<&ClientResources>,
    ) -> Result<Self> {
        let timeout = options.connect_timeout();
        let stream = tokio::time::timeout(timeout, open_tcp(host, port, resources))
            .await
            .map_err(|_| Error::Timeout(timeout))??;

        if options.tcp_nodelay() {
            stream.set_nodelay(true)?;
        }
        tracing::debug!(host, port, "tcp connection established");
        Ok(Transport::Tcp(TcpVariant::Plain(stream)))
    }

    /// Connect via TLS-encrypted TCP
    pub async fn connect_tcp_tls(
        host: &str,
        port: u16,
        options: &ClientOptions,
        resources: Option<&ClientResources>,
        tls_config: &TlsConfig,
    ) -> Result<Self> {
        let transport = Self::connect_tcp(host, port, options, resources).await?;
        let timeout = options.connect_timeout();
        tokio::time::timeout(timeout, transport.upgrade_to_tls(tls_config, host))
            .await
            .map_err(|_| Error::Timeout(timeout))?
    }

    /// Connect via Unix socket
    pub async fn connect_unix(path: &Path, options: &ClientOptions) -> Result<Self> {
        let timeout = options.connect_timeout();
        let stream = tokio::time::timeout(timeout, UnixStream::connect(path))
            .await
            .map_err(|_| Error::Timeout(timeout))??;
        Ok(Transport::Unix(stream))
    }

    /// Whether traffic on this transport is encrypted
    pub fn is_tls(&self) -> bool {
        matches!(self, Transport::Tcp(TcpVariant::Tls(_)))
    }

    /// Write the whole buffer
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        match self {
            Transport::Tcp(variant) => variant.write_all(buf).await?,
            Transport::Unix(stream) => stream.write_all(buf).await?,
        }
        Ok(())
    }

    /// Flush the transport
    pub async fn flush(&mut self) -> Result<()> {
        match self {
            Transport::Tcp(variant) => variant.flush().await?,
            Transport::Unix(stream) => stream.flush().await?,
        }
        Ok(())
    }

    /// Read whatever is available into `buf`; 0 means the peer closed
    pub async fn read_buf(&mut self, buf: &mut BytesMut) -> Result<usize> {
        let n = match self {
            Transport::Tcp(variant) => variant.read_buf(buf).await?,
            Transport::Unix(stream) => stream.read_buf(buf).await?,
        };
        Ok(n)
    }

    /// Upgrade a plain TCP transport to TLS.
    ///
    /// Used for start-TLS: the plaintext stream is handed to rustls and the
    /// encrypted stream replaces it. Only plain TCP can be upgraded.
    pub async fn upgrade_to_tls(self, tls_config: &TlsConfig, hostname: &str) -> Result<Self> {
        match self {
            Transport::Tcp(TcpVariant::Plain(tcp_stream)) => {
                let server_name = parse_server_name(hostname)?;
                let tls_connector = tokio_rustls::TlsConnector::from(tls_config.client_config());
                let tls_stream = tls_connector
                    .connect(server_name, tcp_stream)
                    .await
                    .map_err(|e| {
                        tracing::warn!(host = hostname, error = %e, "tls handshake failed");
                        Error::Io(e)
                    })?;

                tracing::debug!(host = hostname, "tls handshake complete");
                Ok(Transport::Tcp(TcpVariant::Tls(tls_stream)))
            }
            Transport::Tcp(TcpVariant::Tls(_)) => {
                Err(Error::Config("transport is already TLS-encrypted".into()))
            }
            Transport::Unix(_) => Err(Error::Config("cannot upgrade Unix socket to TLS".into())),
        }
    }

    /// Shut down the write half
    pub async fn shutdown(&mut self) -> Result<()> {
        match self {
            Transport::Tcp(variant) => variant.shutdown().await?,
            Transport::Unix(stream) => stream.shutdown().await?,
        }
        Ok(())
    }
}

async fn open_tcp(
    host: &str,
    port: u16,
    resources: Option<&ClientResources>,
) -> Result<TcpStream> {
    let candidates: Vec<SocketAddr> = match resources.and_then(|r| r.resolve(host)) {
        Some(addrs) => addrs.to_vec(),
        None => tokio::net::lookup_host((host, port)).await?.collect(),
    };

    let mut last_error = None;
    for addr in candidates {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!(%addr, error = %e, "connect attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(e) => Error::Io(e),
        None => Error::Config(format!("no addresses found for {}:{}", host, port)),
    })
}
