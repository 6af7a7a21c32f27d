//! Incremental scanning
//!
//! This module handles:
//! * Scan options (`MATCH` pattern, `COUNT` hint)
//! * The forward-only [`ScanCursor`] over a hash, with a `Stream` adapter

mod scan_cursor;

pub use scan_cursor::{ScanCursor, ScanOptions, ScanOptionsBuilder};
