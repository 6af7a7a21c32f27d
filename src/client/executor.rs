//! Command executors backed by real connections

use super::factory::ConnectionFactory;
use crate::connection::Connection;
use crate::ops::CommandExecutor;
use crate::pool::Pool;
use crate::protocol::{Command, Value};
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// One connection shared by every caller; commands are serialised.
///
/// With `auto_reconnect` enabled a broken connection is re-opened (after the
/// configured reconnect delay) before the next command runs. The command
/// that observed the failure is never replayed.
///
/// Dropping a command future before it completes (an outer `select!` or
/// timeout) leaves its reply unread, so the connection counts as broken: the
/// next command reconnects, or fails with [`Error::ConnectionClosed`] when
/// `auto_reconnect` is disabled.
pub struct SharedConnection {
    factory: ConnectionFactory,
    conn: Mutex<Option<Connection>>,
    auto_reconnect: bool,
    reconnect_delay: Duration,
    closed: AtomicBool,
}

impl SharedConnection {
    /// Open the connection eagerly
    pub async fn connect(factory: ConnectionFactory) -> Result<Self> {
        let conn = factory.connect().await?;
        let config = factory.configuration();
        let auto_reconnect = config.effective_options().auto_reconnect();
        let reconnect_delay = config
            .client_resources()
            .map(|r| r.reconnect_delay())
            .unwrap_or_default();

        Ok(Self {
            factory,
            conn: Mutex::new(Some(conn)),
            auto_reconnect,
            reconnect_delay,
            closed: AtomicBool::new(false),
        })
    }

    async fn execute(&self, cmd: Command) -> Result<Value> {
        let mut guard = self.conn.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::InvalidState {
                expected: "open client".into(),
                actual: "shut down".into(),
            });
        }

        let broken = guard.as_ref().map_or(true, |c| !c.is_usable());
        if broken {
            if !self.auto_reconnect {
                return Err(Error::ConnectionClosed);
            }
            if !self.reconnect_delay.is_zero() {
                tokio::time::sleep(self.reconnect_delay).await;
            }
            tracing::info!("reconnecting");
            *guard = None;
            *guard = Some(self.factory.connect().await?);
        }

        match guard.as_mut() {
            Some(conn) => conn.execute(&cmd).await,
            None => Err(Error::ConnectionClosed),
        }
    }

    async fn shutdown(&self, timeout: Duration) {
        self.closed.store(true, Ordering::SeqCst);
        let conn = match tokio::time::timeout(timeout, self.conn.lock()).await {
            Ok(mut guard) => guard.take(),
            Err(_) => {
                tracing::warn!(?timeout, "command still running at shutdown, abandoning connection");
                return;
            }
        };

        if let Some(conn) = conn {
            match tokio::time::timeout(timeout, conn.close()).await {
                Ok(Ok(())) => tracing::info!("connection shut down"),
                Ok(Err(e)) => tracing::debug!(error = %e, "error while closing connection"),
                Err(_) => tracing::warn!(?timeout, "connection close timed out, dropping"),
            }
        }
    }
}

impl std::fmt::Debug for SharedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedConnection")
            .field("factory", &self.factory)
            .field("auto_reconnect", &self.auto_reconnect)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

/// Executor selected by the configuration: one shared connection or a pool
#[derive(Debug)]
pub enum ClientExecutor {
    /// Single connection (pooling disabled)
    Direct(SharedConnection),
    /// Connection pool
    Pooled(Pool),
}

impl CommandExecutor for ClientExecutor {
    async fn execute(&self, cmd: Command) -> Result<Value> {
        match self {
            ClientExecutor::Direct(shared) => shared.execute(cmd).await,
            ClientExecutor::Pooled(pool) => {
                let mut conn = pool.get().await?;
                conn.execute(&cmd).await
            }
        }
    }

    async fn shutdown(&self, timeout: Duration) {
        match self {
            ClientExecutor::Direct(shared) => shared.shutdown(timeout).await,
            ClientExecutor::Pooled(pool) => pool.shutdown(timeout).await,
        }
    }
}
