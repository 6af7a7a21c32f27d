//! Client setup
//!
//! This module handles:
//! * Connection strings (`redis://`, `rediss://`, `redis+unix://`)
//! * The connection factory that turns endpoint plus configuration into
//!   live connections
//! * The executor behind [`crate::Operations`]: one shared connection or a
//!   pool

mod connection_string;
mod executor;
mod factory;

pub use connection_string::{ConnectionInfo, Endpoint, DEFAULT_PORT};
pub use executor::{ClientExecutor, SharedConnection};
pub use factory::ConnectionFactory;
