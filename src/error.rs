//! Error types for kvwire

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// A required argument was empty or out of range (raised before any I/O)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The stored value cannot take part in the requested operation
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// The server answered with an error reply
    #[error("server error: {0}")]
    Server(String),

    /// RESP framing or decoding error
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error on the transport
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The server closed the connection
    #[error("connection closed")]
    ConnectionClosed,

    /// A command did not complete within the configured command timeout
    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    /// No pooled connection became available in time
    #[error("connection pool exhausted (max_total: {max_total})")]
    PoolExhausted {
        /// Configured pool size
        max_total: usize,
    },

    /// The reply had a shape the command does not produce
    #[error("unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        /// What the command should have returned
        expected: &'static str,
        /// What actually arrived
        actual: String,
    },

    /// A reply value could not be decoded into the requested type
    #[error("codec error: {0}")]
    Codec(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Connection is not in a state that allows the operation
    #[error("invalid connection state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },
}

/// Coarse classification of [`Error`] values.
///
/// Callers that only care about *why* something failed (bad input, data
/// shape, network) should match on this instead of the full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller passed an argument the operation rejects
    InvalidArgument,
    /// Remote value incompatible with the requested operation
    TypeMismatch,
    /// Network, protocol or store-side failure
    RemoteOperationFailed,
    /// Round-trip exceeded the command timeout
    Timeout,
    /// Pool could not hand out a connection
    PoolExhausted,
    /// Configuration or connection-state misuse
    Configuration,
}

impl Error {
    /// Build the error for a server error reply.
    ///
    /// Replies signalling that a value has the wrong type or is not numeric
    /// become [`Error::TypeMismatch`]; everything else stays [`Error::Server`].
    pub fn from_server_reply(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.starts_with("WRONGTYPE")
            || message.contains("value is not an integer")
            || message.contains("value is not a float")
            || message.contains("value is not a valid float")
        {
            Error::TypeMismatch(message)
        } else {
            Error::Server(message)
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::TypeMismatch(_) => ErrorKind::TypeMismatch,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::PoolExhausted { .. } => ErrorKind::PoolExhausted,
            Error::Config(_) | Error::InvalidState { .. } => ErrorKind::Configuration,
            Error::Server(_)
            | Error::Protocol(_)
            | Error::Io(_)
            | Error::ConnectionClosed
            | Error::UnexpectedResponse { .. }
            | Error::Codec(_) => ErrorKind::RemoteOperationFailed,
        }
    }

    /// Whether the error originated on the remote side of the connection
    /// (including timeouts).
    pub fn is_remote(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RemoteOperationFailed | ErrorKind::Timeout
        )
    }

    /// Whether the connection that produced this error must be discarded.
    ///
    /// After an I/O failure, a timeout or a framing error the reply stream is
    /// out of sync, so the connection cannot be reused.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::ConnectionClosed | Error::Timeout(_) | Error::Protocol(_)
        )
    }

    /// Short static label used for metrics.
    pub(crate) fn metric_label(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "invalid_argument",
            Error::TypeMismatch(_) => "type_mismatch",
            Error::Server(_) => "server_error",
            Error::Protocol(_) => "protocol_error",
            Error::Io(_) => "io_error",
            Error::ConnectionClosed => "connection_closed",
            Error::Timeout(_) => "timeout",
            Error::PoolExhausted { .. } => "pool_exhausted",
            Error::UnexpectedResponse { .. } => "unexpected_response",
            Error::Codec(_) => "codec_error",
            Error::Config(_) => "config_error",
            Error::InvalidState { .. } => "invalid_state",
        }
    }
}
