//! # Scan and Writer Options
//!
//! Option bundles forwarded to the server when a scanner or writer is
//! created. The server owns their interpretation (predicates, buffering,
//! flush timing); the client never reads them back.

use crate::types::{AuthorizationSet, Durability, IteratorSetting, Range, ScanColumn};

/// Options for a single-range scanner.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Authorization labels the scan is allowed to see.
    pub authorizations: Option<AuthorizationSet>,
    /// Columns to project; all columns when unset.
    pub columns: Option<Vec<ScanColumn>>,
    /// Server-side iterators applied to the scan.
    pub iterators: Option<Vec<IteratorSetting>>,
    /// Key range to scan; the whole table when unset.
    pub range: Option<Range>,
    /// Server-side entry buffer size hint.
    pub buffer_size: Option<u32>,
}

/// Options for a multi-range batch scanner.
#[derive(Debug, Clone, Default)]
pub struct BatchScanOptions {
    pub authorizations: Option<AuthorizationSet>,
    pub columns: Option<Vec<ScanColumn>>,
    pub iterators: Option<Vec<IteratorSetting>>,
    /// Ranges fetched in parallel by the server.
    pub ranges: Option<Vec<Range>>,
    /// Server-side fetch parallelism.
    pub threads: Option<u32>,
}

/// Options for a batch writer. Buffering and flush timing are enforced by
/// the server; this struct only tunes them.
#[derive(Debug, Clone, Default)]
pub struct WriterOptions {
    /// Maximum bytes buffered server-side before a forced flush.
    pub max_memory: Option<u64>,
    /// Maximum time a mutation may sit buffered, in milliseconds.
    pub latency_ms: Option<u64>,
    /// Per-call timeout, in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Server-side writer thread count.
    pub threads: Option<u32>,
    /// Durability level for applied mutations.
    pub durability: Option<Durability>,
}
