//! # Client Errors
//!
//! One error enum for the whole client surface. Remote faults are carried
//! through unchanged; nothing is retried internally.

use std::io;

use thiserror::Error;

/// Result type for the client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or IO failure on the blocking transport.
    #[error("transport failure: {0}")]
    Io(#[from] io::Error),
    /// Request could not be encoded for the wire.
    #[error("failed to encode request: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    /// Response could not be decoded from the wire.
    #[error("failed to decode response: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    /// Response variant did not match the issued request.
    #[error("unexpected response variant")]
    UnexpectedResponse,
    /// Target table or resource id unknown to the remote side.
    #[error("not found: {0}")]
    NotFound(String),
    /// Scanner end-of-sequence signal. Expected, not a failure; `Scanner`
    /// maps it to `Ok(None)` and never surfaces it to callers.
    #[error("no more entries")]
    Exhausted,
    /// Generic failure reported by the remote side.
    #[error("remote failure: {0}")]
    Remote(String),
    /// The connection pool has been torn down.
    #[error("connection pool is closed")]
    PoolClosed,
    /// The worker set has been shut down.
    #[error("executor is closed")]
    ExecutorClosed,
    /// Operation on a scanner or writer that was already closed.
    #[error("resource is closed")]
    ResourceClosed,
    /// `next()` after the scan already reported exhaustion.
    #[error("scan already finished")]
    ScanFinished,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
