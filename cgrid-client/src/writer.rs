//! # Writer Resource
//!
//! A server-side batch writer bound to an opaque resource id. Mutations
//! are grouped by row and applied in one remote call per `add`; buffering
//! and flush timing live on the server, tuned by `WriterOptions`.

use std::sync::Arc;

use cgrid_common::wire::UpdateBatch;
use cgrid_common::{Mutation, ResourceId};

use crate::error::{ClientError, ClientResult};
use crate::executor::PoolExecutor;

/// A batch writer for one table.
pub struct Writer {
    executor: Arc<PoolExecutor>,
    resource: ResourceId,
    closed: bool,
}

impl Writer {
    pub(crate) fn new(executor: Arc<PoolExecutor>, resource: ResourceId) -> Self {
        Writer {
            executor,
            resource,
            closed: false,
        }
    }

    /// Id of the server-side writer backing this handle.
    pub fn resource_id(&self) -> &ResourceId {
        &self.resource
    }

    /// Groups `mutations` by target row (rows keep first-appearance order)
    /// and issues a single apply-updates call carrying the whole batch.
    pub async fn add<I>(&self, mutations: I) -> ClientResult<()>
    where
        I: IntoIterator<Item = Mutation>,
    {
        if self.closed {
            return Err(ClientError::ResourceClosed);
        }
        let mutations: Vec<Mutation> = mutations.into_iter().collect();
        let batch = UpdateBatch::index(mutations.iter());
        let resource = self.resource.clone();
        self.executor
            .run(move |rpc| rpc.apply_updates(&resource, batch))
            .await
    }

    /// Forces buffered mutations to be durably applied, then invalidates
    /// the resource id. Not idempotent: closing twice is a caller error.
    pub async fn close(&mut self) -> ClientResult<()> {
        if self.closed {
            return Err(ClientError::ResourceClosed);
        }
        let resource = self.resource.clone();
        self.executor
            .run(move |rpc| rpc.close_writer(&resource))
            .await?;
        self.closed = true;
        Ok(())
    }
}
