//! # Scanner Resource
//!
//! A server-side cursor bound to an opaque resource id. Every fetch goes
//! through the pool executor; the sequence is finite and single-pass.

use std::sync::Arc;

use cgrid_common::{KeyValue, ResourceId};

use crate::error::{ClientError, ClientResult};
use crate::executor::PoolExecutor;

/// A single-pass scan over one table.
///
/// Lifecycle: open on creation, finished once the remote side reports
/// exhaustion, closed by [`Scanner::close`]. Use after close is an error,
/// as is `next()` after the scan finished.
pub struct Scanner {
    executor: Arc<PoolExecutor>,
    resource: ResourceId,
    finished: bool,
    closed: bool,
}

impl Scanner {
    pub(crate) fn new(executor: Arc<PoolExecutor>, resource: ResourceId) -> Self {
        Scanner {
            executor,
            resource,
            finished: false,
            closed: false,
        }
    }

    /// Id of the server-side cursor backing this scan.
    pub fn resource_id(&self) -> &ResourceId {
        &self.resource
    }

    /// Fetches the next entry.
    ///
    /// Returns `Ok(None)` exactly once, when the remote side reports
    /// exhaustion; the sequence is then finished and further calls fail
    /// with [`ClientError::ScanFinished`]. Any other remote error
    /// propagates unchanged.
    pub async fn next(&mut self) -> ClientResult<Option<KeyValue>> {
        if self.closed {
            return Err(ClientError::ResourceClosed);
        }
        if self.finished {
            return Err(ClientError::ScanFinished);
        }
        let resource = self.resource.clone();
        match self
            .executor
            .run(move |rpc| rpc.next_entry(&resource))
            .await
        {
            Ok(entry) => Ok(Some(entry.into())),
            Err(ClientError::Exhausted) => {
                self.finished = true;
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// Releases the server-side cursor. Not idempotent: closing twice is a
    /// caller error.
    pub async fn close(&mut self) -> ClientResult<()> {
        if self.closed {
            return Err(ClientError::ResourceClosed);
        }
        let resource = self.resource.clone();
        self.executor
            .run(move |rpc| rpc.close_scanner(&resource))
            .await?;
        self.closed = true;
        Ok(())
    }
}
