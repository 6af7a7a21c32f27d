//! Protocol message types

use bytes::Bytes;
use std::fmt;

/// Command sent to the server (client → server)
///
/// # Examples
///
/// ```ignore
/// let cmd = Command::new("HGET").arg("user:1").arg("name");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: &'static str,
    args: Vec<Bytes>,
}

impl Command {
    /// Create a command with no arguments
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<Bytes>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append one argument in place
    pub fn push_arg(&mut self, arg: impl Into<Bytes>) {
        self.args.push(arg.into());
    }

    /// Command name (`HGET`, `HSCAN`, ...)
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Arguments after the command name
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Arguments may carry secrets (AUTH) or large payloads; only the count is shown
        write!(f, "{} ({} args)", self.name, self.args.len())
    }
}

/// Reply value (server → client)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Simple string status (`+OK`)
    Status(String),

    /// Error reply (`-ERR ...`); the connection turns a top-level error
    /// reply into [`crate::Error`]
    Error(String),

    /// Integer reply
    Integer(i64),

    /// Bulk string reply
    Bulk(Bytes),

    /// Null bulk string or null array
    Nil,

    /// Array reply
    Array(Vec<Value>),
}

impl Value {
    /// Human-readable type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Status(_) => "status",
            Value::Error(_) => "error",
            Value::Integer(_) => "integer",
            Value::Bulk(_) => "bulk",
            Value::Nil => "nil",
            Value::Array(_) => "array",
        }
    }

    /// Whether this is a null reply
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Expect an integer reply
    pub fn into_integer(self) -> crate::Result<i64> {
        match self {
            Value::Integer(n) => Ok(n),
            other => Err(unexpected("integer", &other)),
        }
    }

    /// Expect an integer reply that is `0` or `1`
    pub fn into_bool(self) -> crate::Result<bool> {
        match self {
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            other => Err(unexpected("integer 0 or 1", &other)),
        }
    }

    /// Expect an array reply; a null array is treated as empty
    pub fn into_array(self) -> crate::Result<Vec<Value>> {
        match self {
            Value::Array(items) => Ok(items),
            Value::Nil => Ok(Vec::new()),
            other => Err(unexpected("array", &other)),
        }
    }

    /// Expect a bulk or status reply and return its bytes
    pub fn into_bytes(self) -> crate::Result<Bytes> {
        match self {
            Value::Bulk(data) => Ok(data),
            Value::Status(s) => Ok(Bytes::from(s)),
            other => Err(unexpected("bulk string", &other)),
        }
    }

    /// Expect a `+OK` status reply
    pub fn expect_ok(self) -> crate::Result<()> {
        match self {
            Value::Status(ref s) if s == "OK" => Ok(()),
            other => Err(unexpected("OK status", &other)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Status(s) => write!(f, "{}", s),
            Value::Error(e) => write!(f, "(error) {}", e),
            Value::Integer(n) => write!(f, "(integer) {}", n),
            Value::Bulk(b) => write!(f, "\"{}\"", String::from_utf8_lossy(b)),
            Value::Nil => write!(f, "(nil)"),
            Value::Array(items) => write!(f, "(array of {})", items.len()),
        }
    }
}

fn unexpected(expected: &'static str, actual: &Value) -> crate::Error {
    crate::Error::UnexpectedResponse {
        expected,
        actual: actual.type_name().to_string(),
    }
}
