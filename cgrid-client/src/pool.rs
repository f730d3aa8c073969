//! # Connection Pools
//!
//! Purpose: Keep a FIFO queue of idle connections with cooperative
//! acquire/release, and grow it lazily up to a configured limit.
//!
//! ## Design Principles
//! 1. **FIFO Handoff**: The idle queue is an unbounded channel; suspended
//!    acquirers are woken in arrival order and a cancelled acquire never
//!    strands a connection.
//! 2. **Ownership Transfer**: A connection is owned by the queue or by
//!    exactly one borrower; release is synchronous so worker threads can
//!    return what they borrowed.
//! 3. **Capacity First**: When the queue is empty and room remains under
//!    the limit, a new connection is created immediately instead of making
//!    the caller wait for a release.
//! 4. **Best-Effort Teardown**: Teardown closes idle connections and
//!    marks the pool closed; a connection still borrowed at that point is
//!    closed when it comes back. Close failures are logged, never raised.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::connection::{ConnectionFactory, GridConnection};
use crate::error::{ClientError, ClientResult};
use crate::rpc::GridRpc;

/// FIFO queue of idle connections with cooperative acquire.
pub struct ConnectionPool {
    idle_tx: async_channel::Sender<GridConnection>,
    idle_rx: async_channel::Receiver<GridConnection>,
}

impl Default for ConnectionPool {
    fn default() -> Self {
        ConnectionPool::new()
    }
}

impl ConnectionPool {
    pub fn new() -> Self {
        let (idle_tx, idle_rx) = async_channel::unbounded();
        ConnectionPool { idle_tx, idle_rx }
    }

    /// Removes and returns the head of the idle queue without suspending.
    pub fn try_acquire(&self) -> Option<GridConnection> {
        self.idle_rx.try_recv().ok()
    }

    /// Returns the next idle connection, suspending the caller until one
    /// is released. Fails once the pool is shut down.
    pub async fn acquire(&self) -> ClientResult<GridConnection> {
        self.idle_rx
            .recv()
            .await
            .map_err(|_| ClientError::PoolClosed)
    }

    /// Appends `conn` to the tail of the idle queue, waking the
    /// longest-waiting acquirer. After shutdown the connection is closed
    /// instead of re-queued.
    pub fn release(&self, conn: GridConnection) {
        if let Err(returned) = self.idle_tx.try_send(conn) {
            let mut conn = returned.into_inner();
            if let Err(error) = conn.close() {
                warn!(%error, "failed to close connection released after teardown");
            }
        }
    }

    /// Number of idle connections currently queued.
    pub fn idle(&self) -> usize {
        self.idle_rx.len()
    }

    pub fn is_closed(&self) -> bool {
        self.idle_tx.is_closed()
    }

    /// Closes the queue, wakes every suspended acquirer with an error, and
    /// closes all idle connections. Best-effort: a close failure does not
    /// stop teardown of the rest.
    pub fn shutdown(&self) {
        self.idle_rx.close();
        let mut closed = 0usize;
        while let Ok(mut conn) = self.idle_rx.try_recv() {
            if let Err(error) = conn.close() {
                warn!(%error, "failed to close idle connection during teardown");
            }
            closed += 1;
        }
        debug!(closed, "connection pool shut down");
    }
}

struct PoolShared {
    pool: ConnectionPool,
    limit: usize,
    factory: Box<dyn ConnectionFactory>,
    created: Mutex<usize>,
}

impl PoolShared {
    /// Creates one connection if room remains under the limit.
    fn grow(&self) -> ClientResult<Option<GridConnection>> {
        let mut created = self.created.lock();
        if self.pool.is_closed() {
            return Err(ClientError::PoolClosed);
        }
        if *created >= self.limit {
            return Ok(None);
        }
        let conn = self.factory.connect()?;
        *created += 1;
        debug!(created = *created, limit = self.limit, "opened pooled connection");
        Ok(Some(conn))
    }
}

/// Pool handle that lazily grows to `limit` connections via a factory.
///
/// An empty-queue acquire creates a new connection synchronously whenever
/// the created count is below the limit; only at the limit does the caller
/// suspend until a release. The handle is cheap to clone.
#[derive(Clone)]
pub struct AutoScalingPool {
    inner: Arc<PoolShared>,
}

impl AutoScalingPool {
    pub fn new(limit: usize, factory: Box<dyn ConnectionFactory>) -> ClientResult<Self> {
        if limit == 0 {
            return Err(ClientError::InvalidConfig(
                "connection limit must be at least 1".to_string(),
            ));
        }
        Ok(AutoScalingPool {
            inner: Arc::new(PoolShared {
                pool: ConnectionPool::new(),
                limit,
                factory,
                created: Mutex::new(0),
            }),
        })
    }

    /// Borrows a connection, creating one if the queue is empty and room
    /// remains under the limit. The returned guard releases the connection
    /// on drop.
    pub async fn acquire(&self) -> ClientResult<PooledConnection> {
        if let Some(conn) = self.inner.pool.try_acquire() {
            return Ok(PooledConnection::new(Arc::clone(&self.inner), conn));
        }
        if let Some(conn) = self.inner.grow()? {
            return Ok(PooledConnection::new(Arc::clone(&self.inner), conn));
        }
        let conn = self.inner.pool.acquire().await?;
        Ok(PooledConnection::new(Arc::clone(&self.inner), conn))
    }

    /// Returns a borrowed connection to the idle queue (or closes it if
    /// the pool was torn down in the meantime).
    pub fn release(&self, conn: GridConnection) {
        self.inner.pool.release(conn);
    }

    /// Tears the pool down: closes every idle connection and marks the
    /// pool closed so borrowed connections are closed on release and
    /// waiting or future acquires fail with [`ClientError::PoolClosed`].
    pub fn teardown(&self) {
        self.inner.pool.shutdown();
    }

    /// Connections created so far; never exceeds the limit.
    pub fn created(&self) -> usize {
        *self.inner.created.lock()
    }

    pub fn limit(&self) -> usize {
        self.inner.limit
    }

    /// Number of idle connections currently queued.
    pub fn idle(&self) -> usize {
        self.inner.pool.idle()
    }
}

/// RAII borrow of a pooled connection.
///
/// Dropping the guard returns the connection to the pool on every exit
/// path, including panic unwinding on a worker thread.
pub struct PooledConnection {
    pool: Arc<PoolShared>,
    conn: Option<GridConnection>,
}

impl PooledConnection {
    fn new(pool: Arc<PoolShared>, conn: GridConnection) -> Self {
        PooledConnection {
            pool,
            conn: Some(conn),
        }
    }

    /// The borrowed connection's capability table.
    pub fn rpc_mut(&mut self) -> &mut dyn GridRpc {
        self.conn.as_mut().expect("connection exists").rpc_mut()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.pool.release(conn);
        }
    }
}
