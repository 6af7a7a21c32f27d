//! Incremental hash iteration over `HSCAN`
//!
//! A [`ScanCursor`] walks a hash in server-sized batches. It keeps the
//! server's cursor token and a small read-ahead buffer; nothing else.
//!
//! **Semantics**:
//! - No I/O happens until the first call to [`ScanCursor::next`]
//! - A batch is fetched only when the buffer is empty
//! - Batches that come back empty with a non-zero cursor are skipped
//! - The iteration ends when the server returns cursor `0` and the buffer
//!   is drained
//! - After the end, an error or [`ScanCursor::close`], `next` yields `None`
//!   forever; the cursor cannot be restarted
//!
//! The usual `HSCAN` guarantees apply: an entry present for the whole scan is
//! returned at least once; entries added or removed meanwhile may or may not
//! be seen; with `MATCH` the filter runs server-side after the batch is
//! selected.

use crate::client::ClientExecutor;
use crate::codec::FromValue;
use crate::metrics::{counters, histograms};
use crate::ops::{CommandExecutor, Operations};
use crate::{Error, Result};
use bytes::Bytes;
use futures::Stream;
use std::collections::VecDeque;
use tracing::Instrument;

/// Options for a scan: `MATCH` pattern and `COUNT` hint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pattern: Option<String>,
    count: Option<u64>,
}

impl ScanOptions {
    /// No filter, server-default batch size
    pub fn none() -> Self {
        Self::default()
    }

    /// Create a builder
    pub fn builder() -> ScanOptionsBuilder {
        ScanOptionsBuilder::default()
    }

    /// Glob-style `MATCH` pattern
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// `COUNT` hint (entries per batch; the server may return more or fewer)
    pub fn count(&self) -> Option<u64> {
        self.count
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.count == Some(0) {
            return Err(Error::InvalidArgument("scan count must be positive".into()));
        }
        if self.pattern.as_deref() == Some("") {
            return Err(Error::InvalidArgument("scan pattern must not be empty".into()));
        }
        Ok(())
    }
}

/// Builder for [`ScanOptions`]
///
/// Values are checked when the options are handed to `scan()`.
#[derive(Debug, Clone, Default)]
pub struct ScanOptionsBuilder {
    pattern: Option<String>,
    count: Option<u64>,
}

impl ScanOptionsBuilder {
    /// Only return fields matching this glob pattern
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Ask for roughly this many entries per batch
    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Build the options
    pub fn build(self) -> ScanOptions {
        ScanOptions {
            pattern: self.pattern,
            count: self.count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// Nothing fetched yet
    Initial,
    /// Server cursor is non-zero; more batches may follow
    Open,
    /// Server returned cursor 0; only the buffer remains
    Exhausted,
    /// Closed by the caller or after an error
    Closed,
}

/// Forward-only cursor over the entries of one hash.
///
/// Created by [`crate::BoundHashOperations::scan`]. Single consumer: `next`
/// takes `&mut self`.
pub struct ScanCursor<F, V, E = ClientExecutor> {
    ops: Operations<E>,
    key: Bytes,
    options: ScanOptions,
    cursor_id: u64,
    position: u64,
    buffer: VecDeque<(F, V)>,
    state: CursorState,
}

impl<F, V, E> ScanCursor<F, V, E>
where
    F: FromValue,
    V: FromValue,
    E: CommandExecutor,
{
    pub(crate) fn new(ops: Operations<E>, key: Bytes, options: ScanOptions) -> Self {
        Self {
            ops,
            key,
            options,
            cursor_id: 0,
            position: 0,
            buffer: VecDeque::new(),
            state: CursorState::Initial,
        }
    }

    /// Next entry, `None` once the iteration is over.
    ///
    /// An `Err` ends the iteration; later calls return `None`.
    pub async fn next(&mut self) -> Option<Result<(F, V)>> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                self.position += 1;
                return Some(Ok(entry));
            }

            match self.state {
                CursorState::Initial | CursorState::Open => {}
                CursorState::Exhausted | CursorState::Closed => return None,
            }

            if let Err(e) = self.fetch().await {
                tracing::debug!(error = %e, position = self.position, "scan failed");
                self.close();
                return Some(Err(e));
            }
        }
    }

    async fn fetch(&mut self) -> Result<()> {
        let span = tracing::debug_span!("hscan", cursor = self.cursor_id);
        let (next, entries) = self
            .ops
            .hscan::<_, F, V>(&self.key, self.cursor_id, &self.options)
            .instrument(span)
            .await?;

        counters::scan_batch();
        histograms::scan_batch_size(entries.len());
        tracing::debug!(cursor = next, entries = entries.len(), "scan batch");

        self.cursor_id = next;
        self.buffer.extend(entries);
        self.state = if next == 0 {
            CursorState::Exhausted
        } else {
            CursorState::Open
        };
        Ok(())
    }

    /// Adapt into a [`Stream`]
    pub fn into_stream(self) -> impl Stream<Item = Result<(F, V)>> {
        futures::stream::unfold(self, |mut cursor| async move {
            cursor.next().await.map(|item| (item, cursor))
        })
    }
}

impl<F, V, E> ScanCursor<F, V, E> {
    /// Stop iterating and drop buffered entries.
    ///
    /// The server keeps no per-cursor state, so nothing is sent.
    pub fn close(&mut self) {
        self.state = CursorState::Closed;
        self.buffer.clear();
    }

    /// Whether `next` will only ever return `None` from now on
    pub fn is_closed(&self) -> bool {
        match self.state {
            CursorState::Closed => true,
            CursorState::Exhausted => self.buffer.is_empty(),
            CursorState::Initial | CursorState::Open => false,
        }
    }

    /// Server cursor token for the next batch (0 before the first fetch and
    /// after the last one)
    pub fn cursor_id(&self) -> u64 {
        self.cursor_id
    }

    /// Number of entries returned so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Scan options in use
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }
}

impl<F, V, E> std::fmt::Debug for ScanCursor<F, V, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCursor")
            .field("key", &self.key)
            .field("options", &self.options)
            .field("cursor_id", &self.cursor_id)
            .field("position", &self.position)
            .field("buffered", &self.buffer.len())
            .field("state", &self.state)
            .finish()
    }
}
