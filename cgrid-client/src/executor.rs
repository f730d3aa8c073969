//! # Pool Executor
//!
//! Purpose: Run blocking remote calls on a bounded worker-thread set while
//! holding a pooled connection, so a cooperative caller never stalls its
//! own scheduler.
//!
//! ## Design Principles
//! 1. **Bridge, Don't Block**: acquire → submit to a worker → await a
//!    oneshot result; the async context only ever suspends.
//! 2. **Release Before Report**: the connection is back in the pool before
//!    the caller observes the result, success or failure.
//! 3. **Bounded Concurrency**: at most `min(connection limit, worker
//!    count)` remote calls run at once; the defaults make the two equal so
//!    neither side starves the other.
//! 4. **No Swallowed Errors**: the operation's error reaches the caller
//!    unchanged; nothing is retried here.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::connection::{ConnectionFactory, ConnectionParams, TcpConnectionFactory};
use crate::error::{ClientError, ClientResult};
use crate::pool::AutoScalingPool;
use crate::rpc::GridRpc;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size set of OS threads executing blocking jobs from a shared
/// queue.
pub(crate) struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(threads: usize) -> ClientResult<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let mut handles = Vec::with_capacity(threads);
        for index in 0..threads {
            let receiver = Arc::clone(&receiver);
            let handle = thread::Builder::new()
                .name(format!("cgrid-worker-{index}"))
                .spawn(move || {
                    trace!("worker thread started");
                    loop {
                        // Take the job with the lock released before running it,
                        // so the other workers can pick up queued jobs meanwhile.
                        let job = { receiver.lock().recv() };
                        match job {
                            Ok(job) => job(),
                            Err(_) => break,
                        }
                    }
                    trace!("worker thread stopped");
                })?;
            handles.push(handle);
        }
        Ok(WorkerPool {
            sender: Mutex::new(Some(sender)),
            handles: Mutex::new(handles),
        })
    }

    pub fn submit(&self, job: Job) -> ClientResult<()> {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(sender) => sender.send(job).map_err(|_| ClientError::ExecutorClosed),
            None => Err(ClientError::ExecutorClosed),
        }
    }

    /// Stops intake, lets already-queued jobs finish, and joins every
    /// thread. Blocking.
    pub fn close(&self) {
        let sender = self.sender.lock().take();
        drop(sender);
        let handles: Vec<JoinHandle<()>> = self.handles.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!("worker thread panicked during shutdown");
            }
        }
    }
}

/// Sizing of the pool executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum connections the auto-scaling pool may create.
    pub connection_limit: usize,
    /// Worker threads for blocking calls; defaults to the connection
    /// limit.
    pub worker_threads: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            connection_limit: 1,
            worker_threads: None,
        }
    }
}

/// Runs remote operations against pooled connections on worker threads.
pub struct PoolExecutor {
    pool: AutoScalingPool,
    workers: WorkerPool,
}

impl PoolExecutor {
    pub fn new(factory: Box<dyn ConnectionFactory>, config: ExecutorConfig) -> ClientResult<Self> {
        let threads = config.worker_threads.unwrap_or(config.connection_limit);
        if threads == 0 {
            return Err(ClientError::InvalidConfig(
                "worker thread count must be at least 1".to_string(),
            ));
        }
        let pool = AutoScalingPool::new(config.connection_limit, factory)?;
        let workers = WorkerPool::new(threads)?;
        Ok(PoolExecutor { pool, workers })
    }

    /// Executor with the default TCP factory and default sizing.
    pub fn connect(params: ConnectionParams) -> ClientResult<Self> {
        PoolExecutor::new(
            Box::new(TcpConnectionFactory::new(params)),
            ExecutorConfig::default(),
        )
    }

    /// Runs one blocking remote operation against the next available
    /// connection.
    ///
    /// Suspends while acquiring a connection and while the call runs on a
    /// worker thread. The connection is released before the result is
    /// delivered; the operation's error, if any, is propagated unchanged.
    /// If the caller abandons the returned future mid-call, the connection
    /// stays borrowed until the blocking call finishes, then is released.
    pub async fn run<T, F>(&self, op: F) -> ClientResult<T>
    where
        F: FnOnce(&mut dyn GridRpc) -> ClientResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut borrowed = self.pool.acquire().await?;
        let (result_tx, result_rx) = oneshot::channel();
        self.workers.submit(Box::new(move || {
            let result = op(borrowed.rpc_mut());
            // Connection back in the pool before the caller sees the result.
            drop(borrowed);
            let _ = result_tx.send(result);
        }))?;
        result_rx.await.map_err(|_| ClientError::ExecutorClosed)?
    }

    /// Shuts down the worker set (waiting for in-flight and queued calls
    /// to finish), then tears down the connection pool. Blocking.
    pub fn close(&self) {
        self.workers.close();
        self.pool.teardown();
        debug!("pool executor closed");
    }

    pub(crate) fn pool(&self) -> &AutoScalingPool {
        &self.pool
    }
}
