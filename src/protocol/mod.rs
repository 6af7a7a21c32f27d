//! RESP2 wire protocol
//!
//! This module handles:
//! * Command framing (client → server)
//! * Reply decoding from a streaming buffer (server → client)
//! * Length and nesting limits for untrusted input

pub mod constants;
pub mod decode;
pub mod encode;
pub mod message;

pub use decode::decode_value;
pub use encode::encode_command;
pub use message::{Command, Value};
