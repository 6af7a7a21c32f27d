//! Counter metrics

use super::names;

/// A command completed (`status` is "ok" or "error")
pub fn command_completed(command: &'static str, status: &'static str) {
    metrics::counter!(names::COMMANDS_TOTAL, "command" => command, "status" => status)
        .increment(1);
}

/// A command failed
pub fn command_error(command: &'static str, kind: &'static str) {
    metrics::counter!(names::COMMAND_ERRORS_TOTAL, "command" => command, "kind" => kind)
        .increment(1);
}

/// A connection was established
pub fn connection_opened(tls: bool) {
    let transport = if tls { "tls" } else { "plain" };
    metrics::counter!(names::CONNECTIONS_OPENED_TOTAL, "transport" => transport).increment(1);
}

/// A connection was dropped instead of being reused
pub fn connection_discarded(reason: &'static str) {
    metrics::counter!(names::CONNECTIONS_DISCARDED_TOTAL, "reason" => reason).increment(1);
}

/// A connection was checked out of the pool
pub fn pool_checkout(reused: bool) {
    let source = if reused { "idle" } else { "new" };
    metrics::counter!(names::POOL_CHECKOUTS_TOTAL, "source" => source).increment(1);
}

/// A checkout gave up because the pool stayed full
pub fn pool_exhausted() {
    metrics::counter!(names::POOL_EXHAUSTED_TOTAL).increment(1);
}

/// A scan batch was fetched
pub fn scan_batch() {
    metrics::counter!(names::SCAN_BATCHES_TOTAL).increment(1);
}
