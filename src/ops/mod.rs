//! Remote operations
//!
//! [`Operations`] is the unbound handle: every call names its key. The hash
//! primitives (`hget`, `hset`, `hscan`, ...) and key commands (`expire`,
//! `rename`, ...) live here; [`BoundHashOperations`] binds one key and
//! composes them.
//!
//! All commands go through a [`CommandExecutor`]. The default executor talks
//! to the server through a single connection or a pool; tests substitute
//! their own.

mod bound_hash;
mod hash;
mod keys;

#[cfg(test)]
pub(crate) mod testing;

pub use bound_hash::BoundHashOperations;
pub use keys::{DataType, Expiry};

use crate::client::ClientExecutor;
use crate::config::DEFAULT_SHUTDOWN_TIMEOUT;
use crate::protocol::{Command, Value};
use crate::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Runs one command and returns its reply.
///
/// Implementations must turn error replies into `Err` (see
/// [`crate::Error::from_server_reply`]) so callers only ever see data in
/// `Ok`.
pub trait CommandExecutor: Send + Sync + 'static {
    /// Execute one command
    fn execute(&self, cmd: Command) -> impl Future<Output = Result<Value>> + Send;

    /// Release resources, spending at most `timeout` on orderly teardown
    fn shutdown(&self, timeout: Duration) -> impl Future<Output = ()> + Send {
        let _ = timeout;
        async {}
    }
}

/// Unbound operations handle.
///
/// Cheap to clone; clones share the executor.
pub struct Operations<E = ClientExecutor> {
    executor: Arc<E>,
    shutdown_timeout: Duration,
}

impl<E> Clone for Operations<E> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}

impl<E> std::fmt::Debug for Operations<E>
where
    E: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operations")
            .field("executor", &self.executor)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl<E: CommandExecutor> Operations<E> {
    /// Wrap an executor
    pub fn new(executor: E, shutdown_timeout: Duration) -> Self {
        Self {
            executor: Arc::new(executor),
            shutdown_timeout,
        }
    }

    /// Wrap an executor with the default shutdown timeout
    pub fn from_executor(executor: E) -> Self {
        Self::new(executor, DEFAULT_SHUTDOWN_TIMEOUT)
    }

    /// The executor commands run on
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run an arbitrary command
    pub async fn execute(&self, cmd: Command) -> Result<Value> {
        self.executor.execute(cmd).await
    }

    /// View of the hash stored at `key`
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let counters = ops.bound_hash_ops::<_, String, i64>("page:views");
    /// counters.increment(&"home".to_string(), 1).await?;
    /// ```
    pub fn bound_hash_ops<K, F, V>(&self, key: K) -> BoundHashOperations<K, F, V, E> {
        BoundHashOperations::new(key, self.clone())
    }

    /// Close connections, bounded by the configured shutdown timeout
    pub async fn shutdown(&self) {
        self.executor.shutdown(self.shutdown_timeout).await;
    }
}
