//! kvwire: typed hash operations over the Redis wire protocol
//!
//! kvwire binds one hash key to a typed handle and exposes the hash commands
//! (`HSET`, `HGET`, `HSCAN`, ...) plus the key commands that apply to it
//! (`PEXPIRE`, `RENAME`, `TYPE`, ...). Fields and values are encoded through
//! [`ToArg`] / [`FromValue`]; [`Json`] covers anything serde can handle.
//!
//! # Example
//!
//! ```no_run
//! use kvwire::{ClientConfiguration, ConnectionFactory, ConnectionInfo};
//!
//! # async fn run() -> kvwire::Result<()> {
//! let info = ConnectionInfo::parse("redis://localhost:6379/0")?;
//! let config = ClientConfiguration::builder().build();
//! let ops = ConnectionFactory::new(info, config)?.operations().await?;
//!
//! let scores = ops.bound_hash_ops::<_, String, i64>("scores");
//! scores.put(&"alice".to_string(), &10).await?;
//! assert_eq!(scores.increment(&"alice".to_string(), 5).await?, 15);
//!
//! ops.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! Connections are opened lazily by the factory; with pooling enabled
//! ([`ClientConfigurationBuilder::with_connection_pooling`]) each command
//! borrows a connection for exactly one round-trip.

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod metrics;
pub mod ops;
pub mod pool;
pub mod protocol;
pub mod stream;

pub use client::{ConnectionFactory, ConnectionInfo, Endpoint};
pub use codec::{FromValue, Json, ToArg};
pub use config::{
    ClientConfiguration, ClientConfigurationBuilder, ClientOptions, ClientResources, PoolConfig,
    PoolingClientConfigurationBuilder, SslClientConfigurationBuilder, DEFAULT_COMMAND_TIMEOUT,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use error::{Error, ErrorKind, Result};
pub use ops::{BoundHashOperations, CommandExecutor, DataType, Expiry, Operations};
pub use stream::{ScanCursor, ScanOptions};
