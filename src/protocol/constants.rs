//! RESP2 protocol constants

/// Line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Largest bulk string accepted from the server (512 MB, the server-side limit)
pub const MAX_BULK_LENGTH: usize = 512 * 1024 * 1024;

/// Largest array accepted from the server
pub const MAX_ARRAY_LENGTH: usize = 1 << 24;

/// Maximum nesting of arrays inside a single reply
pub const MAX_NESTING_DEPTH: usize = 32;

/// Reply type prefixes
pub mod tags {
    /// Simple string (`+OK`)
    pub const SIMPLE_STRING: u8 = b'+';

    /// Error reply (`-ERR ...`)
    pub const ERROR: u8 = b'-';

    /// Integer (`:42`)
    pub const INTEGER: u8 = b':';

    /// Bulk string (`$5\r\nhello`)
    pub const BULK_STRING: u8 = b'$';

    /// Array (`*2\r\n...`)
    pub const ARRAY: u8 = b'*';
}
