//! Connection string parsing
//!
//! Supports formats:
//! * redis://[user[:password]@][host][:port][/db][?params]
//! * rediss://... (TLS)
//! * redis+unix:///path/to/redis.sock[?db=N&params]
//!
//! Recognised query parameters: `db`, `verify_peer`, `start_tls`,
//! `client_name`, `timeout` (command timeout in milliseconds).

use crate::config::{ClientConfiguration, ClientConfigurationBuilder, ClientOptions};
use crate::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default server port
pub const DEFAULT_PORT: u16 = 6379;

/// Where the server listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// TCP host and port
    Tcp {
        /// Host name or IP literal
        host: String,
        /// Port
        port: u16,
    },
    /// Unix domain socket
    Unix(PathBuf),
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Tcp { host, port } if host.contains(':') => write!(f, "[{}]:{}", host, port),
            Endpoint::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Endpoint::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Parsed connection info
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Server endpoint
    pub endpoint: Endpoint,
    /// Logical database index selected after connect
    pub database: u32,
    /// ACL username
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Connect with TLS (`rediss://`)
    pub use_ssl: bool,
    /// Verify the server certificate (TLS only)
    pub verify_peer: bool,
    /// Negotiate TLS after a plaintext connect (TLS only)
    pub start_tls: bool,
    /// Name announced with `CLIENT SETNAME`
    pub client_name: Option<String>,
    /// Command timeout
    pub timeout: Option<Duration>,
}

impl ConnectionInfo {
    /// Plain TCP endpoint with everything else defaulted
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::with_endpoint(Endpoint::Tcp {
            host: host.into(),
            port,
        })
    }

    /// Unix socket endpoint with everything else defaulted
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self::with_endpoint(Endpoint::Unix(path.into()))
    }

    fn with_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            database: 0,
            username: None,
            password: None,
            use_ssl: false,
            verify_peer: true,
            start_tls: false,
            client_name: None,
            timeout: None,
        }
    }

    /// Parse connection string
    pub fn parse(s: &str) -> Result<Self> {
        if let Some(rest) = s.strip_prefix("redis+unix://") {
            return Self::parse_unix(rest);
        }
        if let Some(rest) = s.strip_prefix("rediss://") {
            let mut info = Self::parse_tcp(rest)?;
            info.use_ssl = true;
            return Ok(info);
        }
        if let Some(rest) = s.strip_prefix("redis://") {
            return Self::parse_tcp(rest);
        }
        Err(Error::Config(
            "connection string must start with redis://, rediss:// or redis+unix://".into(),
        ))
    }

    fn parse_unix(rest: &str) -> Result<Self> {
        let (path, query_string) = split_query(rest);
        if !path.starts_with('/') {
            return Err(Error::Config(
                "unix socket path must be absolute (redis+unix:///path/to.sock)".into(),
            ));
        }

        let mut info = Self::unix(path);
        info.apply_params(query_string)?;
        if info.use_ssl || info.start_tls {
            return Err(Error::Config("TLS is not supported over unix sockets".into()));
        }
        Ok(info)
    }

    fn parse_tcp(rest: &str) -> Result<Self> {
        // Format: [user[:password]@]host[:port][/db][?params]
        let (rest, query_string) = split_query(rest);

        let (auth, rest) = match rest.rfind('@') {
            Some(pos) => (Some(&rest[..pos]), &rest[pos + 1..]),
            None => (None, rest),
        };

        let (host_port, db_path) = match rest.find('/') {
            Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
            None => (rest, None),
        };

        let (host, port) = parse_host_port(host_port)?;
        let mut info = Self::tcp(host, port);

        if let Some(auth) = auth {
            // `redis://:secret@host` carries a password without a user
            let (user, password) = match auth.split_once(':') {
                Some((user, password)) => (user, Some(password)),
                None => (auth, None),
            };
            if !user.is_empty() {
                info.username = Some(user.to_string());
            }
            info.password = password.map(str::to_string);
        }

        if let Some(db) = db_path.filter(|db| !db.is_empty()) {
            info.database = parse_database(db)?;
        }

        info.apply_params(query_string)?;
        Ok(info)
    }

    fn apply_params(&mut self, query_string: &str) -> Result<()> {
        let query = query_string.trim_start_matches('?');
        if query.is_empty() {
            return Ok(());
        }

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("query parameter '{}' has no value", pair)))?;
            match key {
                "db" => self.database = parse_database(value)?,
                "verify_peer" => self.verify_peer = parse_bool(key, value)?,
                "start_tls" => self.start_tls = parse_bool(key, value)?,
                "client_name" => self.client_name = Some(value.to_string()),
                "timeout" => {
                    let millis = value.parse::<u64>().map_err(|_| {
                        Error::Config(format!("invalid timeout '{}': expected milliseconds", value))
                    })?;
                    self.timeout = Some(Duration::from_millis(millis));
                }
                other => {
                    tracing::debug!(param = other, "ignoring unknown connection parameter");
                }
            }
        }
        Ok(())
    }

    /// Seed a configuration builder from the settings carried by the URL.
    ///
    /// `rediss://` enables TLS, `verify_peer=false` and `start_tls=true` map
    /// onto the TLS sub-builder, `timeout` becomes the command timeout and
    /// `client_name` ends up in the client options.
    pub fn to_configuration_builder(&self) -> ClientConfigurationBuilder {
        let mut builder = ClientConfiguration::builder();

        if self.use_ssl {
            let mut ssl = builder.use_ssl();
            if !self.verify_peer {
                ssl = ssl.disable_peer_verification();
            }
            if self.start_tls {
                ssl = ssl.start_tls();
            }
            builder = ssl.and();
        }

        if let Some(timeout) = self.timeout {
            builder = builder.command_timeout(timeout);
        }

        if let Some(name) = &self.client_name {
            builder = builder.client_options(ClientOptions::builder().client_name(name).build());
        }

        builder
    }
}

impl FromStr for ConnectionInfo {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn split_query(s: &str) -> (&str, &str) {
    match s.find('?') {
        Some(pos) => s.split_at(pos),
        None => (s, ""),
    }
}

fn parse_host_port(host_port: &str) -> Result<(String, u16)> {
    // IPv6 literal: [::1]:6379
    if let Some(rest) = host_port.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| Error::Config("unterminated IPv6 literal".into()))?;
        let port = match after.strip_prefix(':') {
            Some(port) => parse_port(port)?,
            None if after.is_empty() => DEFAULT_PORT,
            None => return Err(Error::Config(format!("invalid host '{}'", host_port))),
        };
        return Ok((host.to_string(), port));
    }

    let (host, port) = match host_port.split_once(':') {
        Some((host, port)) => (host, parse_port(port)?),
        None => (host_port, DEFAULT_PORT),
    };
    let host = if host.is_empty() { "localhost" } else { host };
    Ok((host.to_string(), port))
}

fn parse_port(port: &str) -> Result<u16> {
    port.parse()
        .map_err(|_| Error::Config(format!("invalid port '{}'", port)))
}

fn parse_database(db: &str) -> Result<u32> {
    db.parse()
        .map_err(|_| Error::Config(format!("invalid database index '{}'", db)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(Error::Config(format!(
            "invalid value '{}' for {}: expected true or false",
            value, key
        ))),
    }
}
