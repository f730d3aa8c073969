//! # Connection and Factory
//!
//! One connection owns one blocking transport/stub pair to the remote
//! service. Connections are created on demand by a factory and destroyed
//! only by pool teardown.

use crate::error::ClientResult;
use crate::rpc::{GridRpc, TcpGridRpc};

/// Where the remote service listens.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        ConnectionParams {
            host: "127.0.0.1".to_string(),
            port: 42424,
        }
    }
}

impl ConnectionParams {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ConnectionParams {
            host: host.into(),
            port,
        }
    }
}

/// One blocking connection to the remote service.
///
/// Exclusively owned: by the pool while idle, by exactly one in-flight
/// operation while borrowed.
pub struct GridConnection {
    rpc: Box<dyn GridRpc>,
}

impl GridConnection {
    pub fn new(rpc: Box<dyn GridRpc>) -> Self {
        GridConnection { rpc }
    }

    /// The capability table of this connection's stub.
    pub fn rpc_mut(&mut self) -> &mut dyn GridRpc {
        &mut *self.rpc
    }

    /// Closes the underlying transport.
    pub fn close(&mut self) -> ClientResult<()> {
        self.rpc.close()
    }
}

/// Produces new connections for the auto-scaling pool.
pub trait ConnectionFactory: Send + Sync {
    /// Opens one new connection. Blocking.
    fn connect(&self) -> ClientResult<GridConnection>;
}

/// Default factory: TCP to a configured host and port.
#[derive(Debug, Clone, Default)]
pub struct TcpConnectionFactory {
    params: ConnectionParams,
}

impl TcpConnectionFactory {
    pub fn new(params: ConnectionParams) -> Self {
        TcpConnectionFactory { params }
    }
}

impl ConnectionFactory for TcpConnectionFactory {
    fn connect(&self) -> ClientResult<GridConnection> {
        Ok(GridConnection::new(Box::new(TcpGridRpc::connect(
            &self.params,
        )?)))
    }
}
