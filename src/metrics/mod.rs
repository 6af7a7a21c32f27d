//! Metrics emitted through the `metrics` facade
//!
//! Nothing is recorded unless the application installs a recorder. Labels are
//! limited to command names, statuses and error kinds; keys and fields never
//! become labels.

pub mod counters;
pub mod histograms;

/// Metric names
pub mod names {
    /// Commands executed, labelled by command and status
    pub const COMMANDS_TOTAL: &str = "kvwire_commands_total";
    /// Command failures, labelled by command and error kind
    pub const COMMAND_ERRORS_TOTAL: &str = "kvwire_command_errors_total";
    /// Command round-trip duration in milliseconds
    pub const COMMAND_DURATION_MS: &str = "kvwire_command_duration_ms";
    /// Connections opened, labelled by transport security
    pub const CONNECTIONS_OPENED_TOTAL: &str = "kvwire_connections_opened_total";
    /// Connections discarded after a fatal error
    pub const CONNECTIONS_DISCARDED_TOTAL: &str = "kvwire_connections_discarded_total";
    /// Pool checkouts, labelled by whether an idle connection was reused
    pub const POOL_CHECKOUTS_TOTAL: &str = "kvwire_pool_checkouts_total";
    /// Pool checkouts that gave up waiting
    pub const POOL_EXHAUSTED_TOTAL: &str = "kvwire_pool_exhausted_total";
    /// Time spent waiting for a pooled connection in milliseconds
    pub const POOL_WAIT_MS: &str = "kvwire_pool_wait_ms";
    /// Scan batches fetched
    pub const SCAN_BATCHES_TOTAL: &str = "kvwire_scan_batches_total";
    /// Entries per scan batch
    pub const SCAN_BATCH_SIZE: &str = "kvwire_scan_batch_size";
}
