//! # Synchronous Client
//!
//! Purpose: The connector surface driven directly on one shared
//! connection, for callers without an async runtime.
//!
//! There is no pool and no worker set here: every call locks the single
//! connection and blocks the calling thread for the duration of the
//! remote exchange.

use std::sync::Arc;

use parking_lot::Mutex;

use cgrid_common::wire::{UpdateBatch, WireBatchScanOptions, WireScanOptions, WireWriterOptions};
use cgrid_common::{
    AuthorizationSet, BatchScanOptions, KeyValue, Mutation, ResourceId, ScanOptions, TimeType,
    WriterOptions,
};

use crate::connection::{ConnectionFactory, ConnectionParams, GridConnection, TcpConnectionFactory};
use crate::error::{ClientError, ClientResult};

/// Blocking connector over a single connection.
pub struct SyncConnector {
    conn: Arc<Mutex<GridConnection>>,
    secret: Vec<u8>,
}

impl SyncConnector {
    /// Connects to `params` and wraps the connection.
    pub fn connect(params: ConnectionParams, secret: impl Into<Vec<u8>>) -> ClientResult<Self> {
        let conn = TcpConnectionFactory::new(params).connect()?;
        Ok(SyncConnector::new(conn, secret))
    }

    pub fn new(conn: GridConnection, secret: impl Into<Vec<u8>>) -> Self {
        SyncConnector {
            conn: Arc::new(Mutex::new(conn)),
            secret: secret.into(),
        }
    }

    pub fn create_scanner(&self, table: &str, options: ScanOptions) -> ClientResult<SyncScanner> {
        let options = WireScanOptions::from(&options);
        let resource = self
            .conn
            .lock()
            .rpc_mut()
            .create_scanner(&self.secret, table, options)?;
        Ok(SyncScanner::new(Arc::clone(&self.conn), resource))
    }

    pub fn create_batch_scanner(
        &self,
        table: &str,
        options: BatchScanOptions,
    ) -> ClientResult<SyncScanner> {
        let options = WireBatchScanOptions::from(&options);
        let resource = self
            .conn
            .lock()
            .rpc_mut()
            .create_batch_scanner(&self.secret, table, options)?;
        Ok(SyncScanner::new(Arc::clone(&self.conn), resource))
    }

    pub fn create_writer(&self, table: &str, options: WriterOptions) -> ClientResult<SyncWriter> {
        let options = WireWriterOptions::from(&options);
        let resource = self
            .conn
            .lock()
            .rpc_mut()
            .create_writer(&self.secret, table, options)?;
        Ok(SyncWriter::new(Arc::clone(&self.conn), resource))
    }

    pub fn table_exists(&self, table: &str) -> ClientResult<bool> {
        self.conn.lock().rpc_mut().table_exists(&self.secret, table)
    }

    pub fn create_table(
        &self,
        table: &str,
        versioning_iterator: bool,
        time_type: TimeType,
    ) -> ClientResult<()> {
        self.conn
            .lock()
            .rpc_mut()
            .create_table(&self.secret, table, versioning_iterator, time_type)
    }

    pub fn change_user_authorizations(
        &self,
        user: &str,
        authorizations: &AuthorizationSet,
    ) -> ClientResult<()> {
        self.conn.lock().rpc_mut().change_user_authorizations(
            &self.secret,
            user,
            authorizations.to_vec(),
        )
    }

    pub fn get_user_authorizations(&self, user: &str) -> ClientResult<AuthorizationSet> {
        let labels = self
            .conn
            .lock()
            .rpc_mut()
            .get_user_authorizations(&self.secret, user)?;
        Ok(labels.into_iter().collect())
    }

    /// Closes the underlying connection.
    pub fn close(&self) -> ClientResult<()> {
        self.conn.lock().close()
    }
}

/// Blocking scan cursor. Iteration ends when the remote side reports
/// exhaustion; remote failures come through as `Some(Err(..))` items.
pub struct SyncScanner {
    conn: Arc<Mutex<GridConnection>>,
    resource: ResourceId,
    finished: bool,
    closed: bool,
}

impl SyncScanner {
    fn new(conn: Arc<Mutex<GridConnection>>, resource: ResourceId) -> Self {
        SyncScanner {
            conn,
            resource,
            finished: false,
            closed: false,
        }
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.resource
    }

    /// Releases the server-side cursor. Not idempotent.
    pub fn close(&mut self) -> ClientResult<()> {
        if self.closed {
            return Err(ClientError::ResourceClosed);
        }
        self.conn.lock().rpc_mut().close_scanner(&self.resource)?;
        self.closed = true;
        Ok(())
    }
}

impl Iterator for SyncScanner {
    type Item = ClientResult<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed || self.finished {
            return None;
        }
        match self.conn.lock().rpc_mut().next_entry(&self.resource) {
            Ok(entry) => Some(Ok(entry.into())),
            Err(ClientError::Exhausted) => {
                self.finished = true;
                None
            }
            Err(error) => Some(Err(error)),
        }
    }
}

/// Blocking batch writer.
pub struct SyncWriter {
    conn: Arc<Mutex<GridConnection>>,
    resource: ResourceId,
    closed: bool,
}

impl SyncWriter {
    fn new(conn: Arc<Mutex<GridConnection>>, resource: ResourceId) -> Self {
        SyncWriter {
            conn,
            resource,
            closed: false,
        }
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.resource
    }

    /// Groups `mutations` by target row and issues one apply-updates call.
    pub fn add<I>(&self, mutations: I) -> ClientResult<()>
    where
        I: IntoIterator<Item = Mutation>,
    {
        if self.closed {
            return Err(ClientError::ResourceClosed);
        }
        let mutations: Vec<Mutation> = mutations.into_iter().collect();
        let batch = UpdateBatch::index(mutations.iter());
        self.conn
            .lock()
            .rpc_mut()
            .apply_updates(&self.resource, batch)
    }

    /// Flushes remotely and invalidates the resource id. Not idempotent.
    pub fn close(&mut self) -> ClientResult<()> {
        if self.closed {
            return Err(ClientError::ResourceClosed);
        }
        self.conn.lock().rpc_mut().close_writer(&self.resource)?;
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFactory;

    #[test]
    fn sync_scanner_iterates_to_exhaustion() {
        let factory = MockFactory::new();
        let state = factory.state();
        state.script_entries(vec![("r1", "cf", "cq", "v1"), ("r2", "cf", "cq", "v2")]);
        let connector =
            SyncConnector::new(factory.connect().expect("connect"), b"secret".to_vec());

        let mut scanner = connector
            .create_scanner("t", ScanOptions::default())
            .expect("create scanner");
        let rows: Vec<Vec<u8>> = scanner
            .by_ref()
            .map(|entry| entry.expect("entry").row().to_vec())
            .collect();
        assert_eq!(rows, vec![b"r1".to_vec(), b"r2".to_vec()]);
        assert!(scanner.next().is_none(), "iterator stays finished");

        scanner.close().expect("close");
        assert!(matches!(scanner.close(), Err(ClientError::ResourceClosed)));
    }

    #[test]
    fn sync_writer_groups_and_closes() {
        let factory = MockFactory::new();
        let state = factory.state();
        let connector =
            SyncConnector::new(factory.connect().expect("connect"), b"secret".to_vec());

        let mut writer = connector
            .create_writer("t", WriterOptions::default())
            .expect("create writer");
        writer
            .add([
                Mutation::new("r1").family("a").value("1"),
                Mutation::new("r1").family("b").value("2"),
            ])
            .expect("add");
        writer.close().expect("close");

        let batches = state.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0].rows()[0].updates.len(), 2);
        assert!(matches!(
            writer.add([Mutation::new("r")]),
            Err(ClientError::ResourceClosed)
        ));
    }

    #[test]
    fn sync_connector_single_connection_serves_all_calls() {
        let factory = MockFactory::new();
        let state = factory.state();
        let connector =
            SyncConnector::new(factory.connect().expect("connect"), b"secret".to_vec());

        assert!(connector.table_exists("t").expect("exists"));
        connector
            .create_table("t", true, TimeType::Millis)
            .expect("create");
        assert_eq!(state.connects(), 1);
        assert!(state.ops().iter().all(|(_, conn)| *conn == 0));
    }
}
