//! # Connector Facade
//!
//! Purpose: Create remote resources and expose table and authorization
//! metadata operations, presenting the capability token on every call.
//!
//! ## Design Principles
//! 1. **Token Per Call**: The shared secret is an argument of every remote
//!    operation, never state on a connection, so one connector can serve
//!    many concurrent logical callers.
//! 2. **Stateless Facade**: Beyond the token and the executor handle there
//!    is nothing here; resource state lives server-side.

use std::sync::Arc;

use cgrid_common::wire::{WireBatchScanOptions, WireScanOptions, WireWriterOptions};
use cgrid_common::{AuthorizationSet, BatchScanOptions, ScanOptions, TimeType, WriterOptions};

use crate::error::ClientResult;
use crate::executor::PoolExecutor;
use crate::scanner::Scanner;
use crate::writer::Writer;

/// Facade over the pool executor for one capability token.
pub struct GridConnector {
    executor: Arc<PoolExecutor>,
    secret: Vec<u8>,
}

impl GridConnector {
    pub fn new(executor: Arc<PoolExecutor>, secret: impl Into<Vec<u8>>) -> Self {
        GridConnector {
            executor,
            secret: secret.into(),
        }
    }

    /// Creates a server-side scanner and wraps its id.
    pub async fn create_scanner(&self, table: &str, options: ScanOptions) -> ClientResult<Scanner> {
        let options = WireScanOptions::from(&options);
        let secret = self.secret.clone();
        let table = table.to_string();
        let resource = self
            .executor
            .run(move |rpc| rpc.create_scanner(&secret, &table, options))
            .await?;
        Ok(Scanner::new(Arc::clone(&self.executor), resource))
    }

    /// Creates a server-side multi-range batch scanner and wraps its id.
    pub async fn create_batch_scanner(
        &self,
        table: &str,
        options: BatchScanOptions,
    ) -> ClientResult<Scanner> {
        let options = WireBatchScanOptions::from(&options);
        let secret = self.secret.clone();
        let table = table.to_string();
        let resource = self
            .executor
            .run(move |rpc| rpc.create_batch_scanner(&secret, &table, options))
            .await?;
        Ok(Scanner::new(Arc::clone(&self.executor), resource))
    }

    /// Creates a server-side batch writer and wraps its id.
    pub async fn create_writer(&self, table: &str, options: WriterOptions) -> ClientResult<Writer> {
        let options = WireWriterOptions::from(&options);
        let secret = self.secret.clone();
        let table = table.to_string();
        let resource = self
            .executor
            .run(move |rpc| rpc.create_writer(&secret, &table, options))
            .await?;
        Ok(Writer::new(Arc::clone(&self.executor), resource))
    }

    pub async fn table_exists(&self, table: &str) -> ClientResult<bool> {
        let secret = self.secret.clone();
        let table = table.to_string();
        self.executor
            .run(move |rpc| rpc.table_exists(&secret, &table))
            .await
    }

    pub async fn create_table(
        &self,
        table: &str,
        versioning_iterator: bool,
        time_type: TimeType,
    ) -> ClientResult<()> {
        let secret = self.secret.clone();
        let table = table.to_string();
        self.executor
            .run(move |rpc| rpc.create_table(&secret, &table, versioning_iterator, time_type))
            .await
    }

    pub async fn change_user_authorizations(
        &self,
        user: &str,
        authorizations: &AuthorizationSet,
    ) -> ClientResult<()> {
        let secret = self.secret.clone();
        let user = user.to_string();
        let authorizations = authorizations.to_vec();
        self.executor
            .run(move |rpc| rpc.change_user_authorizations(&secret, &user, authorizations))
            .await
    }

    pub async fn get_user_authorizations(&self, user: &str) -> ClientResult<AuthorizationSet> {
        let secret = self.secret.clone();
        let user = user.to_string();
        let labels = self
            .executor
            .run(move |rpc| rpc.get_user_authorizations(&secret, &user))
            .await?;
        Ok(labels.into_iter().collect())
    }
}
