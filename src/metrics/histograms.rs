//! Histogram metrics

use super::names;

/// Round-trip duration of a command
pub fn command_duration(command: &'static str, duration_ms: u64) {
    metrics::histogram!(names::COMMAND_DURATION_MS, "command" => command)
        .record(duration_ms as f64);
}

/// Time a checkout waited for a pooled connection
pub fn pool_wait(duration_ms: u64) {
    metrics::histogram!(names::POOL_WAIT_MS).record(duration_ms as f64);
}

/// Number of entries in one scan batch
pub fn scan_batch_size(entries: usize) {
    metrics::histogram!(names::SCAN_BATCH_SIZE).record(entries as f64);
}
