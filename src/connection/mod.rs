//! Connection management
//!
//! This module handles:
//! * Transport abstraction (TCP vs Unix socket, optional TLS)
//! * Connection lifecycle (transport, activation, command round-trips)
//! * State machine enforcement
//! * TLS configuration and support

mod conn;
mod state;
mod tls;
mod transport;

pub use conn::{Connection, ConnectionConfig, ConnectionConfigBuilder};
pub use state::ConnectionState;
pub use tls::{parse_server_name, TlsConfig, TlsConfigBuilder};
pub use transport::{TcpVariant, Transport};
