//! Connection pooling
//!
//! A semaphore caps the number of checked-out connections at `max_total`;
//! returned connections wait in an idle list (at most `max_idle` of them)
//! until the next checkout. Broken connections are dropped on return.

use crate::client::ConnectionFactory;
use crate::config::PoolConfig;
use crate::connection::Connection;
use crate::metrics::{counters, histograms};
use crate::protocol::{Command, Value};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A pool of reusable connections.
///
/// Cloning shares the pool.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    factory: ConnectionFactory,
    config: PoolConfig,
    permits: Arc<Semaphore>,
    idle: Mutex<VecDeque<Connection>>,
    closed: AtomicBool,
}

impl Pool {
    /// Create an empty pool
    pub fn new(factory: ConnectionFactory, config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                permits: Arc::new(Semaphore::new(config.max_total())),
                idle: Mutex::new(VecDeque::new()),
                factory,
                config,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Pool settings
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Current number of idle connections sitting in the pool.
    pub fn idle_count(&self) -> usize {
        self.inner.idle.lock().len()
    }

    /// Number of connections that can still be checked out without waiting
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }

    /// Open `min_idle` connections.
    ///
    /// Connections are opened concurrently on the runtime configured in the
    /// client resources, or on the current runtime.
    pub async fn warm_up(&self) -> Result<()> {
        let wanted = self.inner.config.min_idle().saturating_sub(self.idle_count());
        if wanted == 0 {
            return Ok(());
        }

        let handle = match self.inner.factory.configuration().client_resources() {
            Some(resources) => match resources.runtime() {
                Some(handle) => handle.clone(),
                None => tokio::runtime::Handle::current(),
            },
            None => tokio::runtime::Handle::current(),
        };

        let tasks: Vec<_> = (0..wanted)
            .map(|_| {
                let factory = self.inner.factory.clone();
                handle.spawn(async move { factory.connect().await })
            })
            .collect();

        let mut first_error = None;
        for task in tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("warm-up task failed: {}", e),
                ))),
            };
            match result {
                Ok(conn) => self.inner.idle.lock().push_back(conn),
                Err(e) => {
                    tracing::warn!(error = %e, "pool warm-up connection failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        tracing::info!(idle = self.idle_count(), "pool warmed up");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Check out a connection.
    ///
    /// Waits for a free slot for at most `max_wait` (forever when unset),
    /// then reuses an idle connection or opens a new one.
    ///
    /// # Errors
    ///
    /// [`Error::PoolExhausted`] when no slot frees up in time,
    /// [`Error::InvalidState`] after [`Pool::shutdown`], or any connect error.
    pub async fn get(&self) -> Result<PooledConnection> {
        let started = Instant::now();
        let acquire = self.inner.permits.clone().acquire_owned();
        let permit = match self.inner.config.max_wait() {
            Some(max_wait) => match tokio::time::timeout(max_wait, acquire).await {
                Ok(permit) => permit,
                Err(_) => {
                    counters::pool_exhausted();
                    return Err(Error::PoolExhausted {
                        max_total: self.inner.config.max_total(),
                    });
                }
            },
            None => acquire.await,
        }
        .map_err(|_| pool_closed())?;
        histograms::pool_wait(started.elapsed().as_millis() as u64);

        while let Some(conn) = self.take_idle() {
            if let Some(conn) = self.validate(conn).await {
                counters::pool_checkout(true);
                return Ok(PooledConnection::new(conn, permit, self.inner.clone()));
            }
        }

        let conn = self.inner.factory.connect().await?;
        counters::pool_checkout(false);
        Ok(PooledConnection::new(conn, permit, self.inner.clone()))
    }

    fn take_idle(&self) -> Option<Connection> {
        self.inner.idle.lock().pop_front()
    }

    async fn validate(&self, mut conn: Connection) -> Option<Connection> {
        if !conn.is_usable() {
            counters::connection_discarded("broken");
            return None;
        }
        if self.inner.config.test_on_borrow() {
            match conn.execute(&Command::new("PING")).await {
                Ok(Value::Status(ref s)) if s == "PONG" => {}
                other => {
                    tracing::debug!(connection = conn.id(), reply = ?other, "idle connection failed validation");
                    counters::connection_discarded("validation");
                    return None;
                }
            }
        }
        Some(conn)
    }

    /// Close the pool.
    ///
    /// Pending and future checkouts fail. Idle connections are closed with
    /// `QUIT`; whatever is still running after `timeout` is dropped.
    /// Checked-out connections are dropped when their guards go away.
    pub async fn shutdown(&self, timeout: Duration) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.permits.close();

        let idle: Vec<Connection> = self.inner.idle.lock().drain(..).collect();
        let count = idle.len();
        let close_all = futures::future::join_all(idle.into_iter().map(Connection::close));

        match tokio::time::timeout(timeout, close_all).await {
            Ok(results) => {
                let failed = results.iter().filter(|r| r.is_err()).count();
                tracing::info!(closed = count, failed, "pool shut down");
            }
            Err(_) => {
                tracing::warn!(connections = count, ?timeout, "pool shutdown timed out, dropping connections");
            }
        }
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.inner.config)
            .field("idle", &self.idle_count())
            .field("available", &self.available())
            .finish()
    }
}

fn pool_closed() -> Error {
    Error::InvalidState {
        expected: "open pool".into(),
        actual: "closed".into(),
    }
}

/// A connection checked out from the pool.
///
/// Dropping the guard returns a healthy connection to the idle list, or
/// discards it when it is broken, the pool is closed or `max_idle`
/// connections are already idle.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    fn new(conn: Connection, permit: OwnedSemaphorePermit, pool: Arc<PoolInner>) -> Self {
        Self {
            conn: Some(conn),
            pool,
            _permit: permit,
        }
    }

    /// Execute one command on the checked-out connection
    pub async fn execute(&mut self, cmd: &Command) -> Result<Value> {
        match self.conn.as_mut() {
            Some(conn) => conn.execute(cmd).await,
            None => Err(Error::ConnectionClosed),
        }
    }

    /// Id of the underlying connection
    pub fn connection_id(&self) -> Option<u64> {
        self.conn.as_ref().map(Connection::id)
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("connection_id", &self.connection_id())
            .finish_non_exhaustive()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        if !conn.is_usable() {
            counters::connection_discarded("broken");
            return;
        }
        if self.pool.closed.load(Ordering::SeqCst) {
            counters::connection_discarded("pool_closed");
            return;
        }

        let mut idle = self.pool.idle.lock();
        if idle.len() < self.pool.config.max_idle() {
            idle.push_back(conn);
        } else {
            counters::connection_discarded("max_idle");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ConnectionInfo;
    use crate::config::ClientConfiguration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers every command with `+PONG` (or `+OK` for QUIT)
    async fn pong_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 1024];
                    loop {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => {
                                let reply: &[u8] = if buf[..n].windows(4).any(|w| w == b"QUIT") {
                                    b"+OK\r\n"
                                } else {
                                    b"+PONG\r\n"
                                };
                                if socket.write_all(reply).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                });
            }
        });
        port
    }

    async fn pool(config: PoolConfig) -> Pool {
        let port = pong_server().await;
        let factory = ConnectionFactory::new(
            ConnectionInfo::tcp("127.0.0.1", port),
            ClientConfiguration::default(),
        )
        .unwrap();
        Pool::new(factory, config)
    }

    #[tokio::test]
    async fn test_connection_reused() {
        let pool = pool(PoolConfig::default()).await;

        let first_id = {
            let mut conn = pool.get().await.unwrap();
            conn.execute(&Command::new("PING")).await.unwrap();
            conn.connection_id()
        };
        assert_eq!(pool.idle_count(), 1);

        let conn = pool.get().await.unwrap();
        assert_eq!(conn.connection_id(), first_id);
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_after_max_wait() {
        let config = PoolConfig::builder()
            .max_total(1)
            .max_idle(1)
            .max_wait(Duration::from_millis(50))
            .build()
            .unwrap();
        let pool = pool(config).await;

        let _held = pool.get().await.unwrap();
        let err = pool.get().await.unwrap_err();
        assert!(matches!(err, Error::PoolExhausted { max_total: 1 }));
        assert_eq!(err.kind(), crate::ErrorKind::PoolExhausted);
    }

    #[tokio::test]
    async fn test_max_idle_discards_surplus() {
        let config = PoolConfig::builder()
            .max_total(3)
            .max_idle(1)
            .build()
            .unwrap();
        let pool = pool(config).await;

        let a = pool.get().await.unwrap();
        let b = pool.get().await.unwrap();
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn test_warm_up_opens_min_idle() {
        let config = PoolConfig::builder()
            .max_total(4)
            .max_idle(4)
            .min_idle(2)
            .build()
            .unwrap();
        let pool = pool(config).await;

        pool.warm_up().await.unwrap();
        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test]
    async fn test_test_on_borrow_validates_idle() {
        let config = PoolConfig::builder().test_on_borrow(true).build().unwrap();
        let pool = pool(config).await;

        drop(pool.get().await.unwrap());
        let mut conn = pool.get().await.unwrap();
        assert_eq!(
            conn.execute(&Command::new("PING")).await.unwrap(),
            Value::Status("PONG".into())
        );
    }

    #[tokio::test]
    async fn test_pooled_connection_debug() {
        let pool = pool(PoolConfig::default()).await;
        let conn = pool.get().await.unwrap();
        let debug = format!("{:?}", conn);
        assert!(debug.starts_with("PooledConnection"));
        assert!(debug.contains("connection_id: Some("));
    }

    #[tokio::test]
    async fn test_largest_pool_is_created_lazily() {
        let limit = tokio::sync::Semaphore::MAX_PERMITS;
        let config = PoolConfig::builder()
            .max_total(limit)
            .max_idle(limit)
            .build()
            .unwrap();
        let pool = pool(config).await;
        assert_eq!(pool.available(), limit);
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_checkouts() {
        let pool = pool(PoolConfig::default()).await;
        drop(pool.get().await.unwrap());

        pool.shutdown(Duration::from_millis(100)).await;
        assert_eq!(pool.idle_count(), 0);

        let err = pool.get().await.unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }
}
