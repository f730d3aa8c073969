//! Test doubles shared by the unit tests: a scripted in-memory stub for
//! the remote capability table and a counting connection factory.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use cgrid_common::wire::{
    UpdateBatch, WireBatchScanOptions, WireEntry, WireScanOptions, WireWriterOptions,
};
use cgrid_common::{ResourceId, TimeType};

use crate::connection::{ConnectionFactory, GridConnection};
use crate::error::{ClientError, ClientResult};
use crate::rpc::GridRpc;

/// Observable state shared by every mock connection of one factory.
#[derive(Default)]
pub struct MockState {
    ops: Mutex<Vec<(String, usize)>>,
    secrets: Mutex<Vec<Vec<u8>>>,
    batches: Mutex<Vec<UpdateBatch>>,
    entries: Mutex<VecDeque<WireEntry>>,
    auths: Mutex<Vec<Vec<u8>>>,
    next_resource: AtomicUsize,
    connects: AtomicUsize,
    closed_connections: AtomicUsize,
    fail_connects: AtomicBool,
}

impl MockState {
    /// Queues entries for `next_entry` to hand out before exhaustion.
    pub fn script_entries(&self, entries: Vec<(&str, &str, &str, &str)>) {
        let mut queue = self.entries.lock();
        for (row, family, qualifier, value) in entries {
            queue.push_back(WireEntry {
                row: row.as_bytes().to_vec(),
                family: family.as_bytes().to_vec(),
                qualifier: qualifier.as_bytes().to_vec(),
                visibility: Vec::new(),
                timestamp: 0,
                value: value.as_bytes().to_vec(),
            });
        }
    }

    /// Operation names recorded so far, with the serving connection's id.
    pub fn ops(&self) -> Vec<(String, usize)> {
        self.ops.lock().clone()
    }

    /// Capability tokens recorded from token-carrying operations.
    pub fn secrets(&self) -> Vec<Vec<u8>> {
        self.secrets.lock().clone()
    }

    /// Update batches recorded from apply-updates calls.
    pub fn batches(&self) -> Vec<UpdateBatch> {
        self.batches.lock().clone()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closed_connections(&self) -> usize {
        self.closed_connections.load(Ordering::SeqCst)
    }

    fn record(&self, conn: usize, op: &str) {
        self.ops.lock().push((op.to_string(), conn));
    }

    fn record_secret(&self, secret: &[u8]) {
        self.secrets.lock().push(secret.to_vec());
    }

    fn issue_resource(&self) -> ResourceId {
        let n = self.next_resource.fetch_add(1, Ordering::SeqCst);
        ResourceId::new(format!("r{n}"))
    }
}

/// Scripted stand-in for the remote service's capability table.
pub struct MockRpc {
    state: Arc<MockState>,
    id: usize,
}

impl GridRpc for MockRpc {
    fn create_scanner(
        &mut self,
        secret: &[u8],
        _table: &str,
        _options: WireScanOptions,
    ) -> ClientResult<ResourceId> {
        self.state.record(self.id, "create_scanner");
        self.state.record_secret(secret);
        Ok(self.state.issue_resource())
    }

    fn create_batch_scanner(
        &mut self,
        secret: &[u8],
        _table: &str,
        _options: WireBatchScanOptions,
    ) -> ClientResult<ResourceId> {
        self.state.record(self.id, "create_batch_scanner");
        self.state.record_secret(secret);
        Ok(self.state.issue_resource())
    }

    fn create_writer(
        &mut self,
        secret: &[u8],
        _table: &str,
        _options: WireWriterOptions,
    ) -> ClientResult<ResourceId> {
        self.state.record(self.id, "create_writer");
        self.state.record_secret(secret);
        Ok(self.state.issue_resource())
    }

    fn next_entry(&mut self, _resource: &ResourceId) -> ClientResult<WireEntry> {
        self.state.record(self.id, "next_entry");
        match self.state.entries.lock().pop_front() {
            Some(entry) => Ok(entry),
            None => Err(ClientError::Exhausted),
        }
    }

    fn close_scanner(&mut self, _resource: &ResourceId) -> ClientResult<()> {
        self.state.record(self.id, "close_scanner");
        Ok(())
    }

    fn apply_updates(&mut self, _resource: &ResourceId, batch: UpdateBatch) -> ClientResult<()> {
        self.state.record(self.id, "apply_updates");
        self.state.batches.lock().push(batch);
        Ok(())
    }

    fn close_writer(&mut self, _resource: &ResourceId) -> ClientResult<()> {
        self.state.record(self.id, "close_writer");
        Ok(())
    }

    fn create_table(
        &mut self,
        secret: &[u8],
        _table: &str,
        _versioning_iterator: bool,
        _time_type: TimeType,
    ) -> ClientResult<()> {
        self.state.record(self.id, "create_table");
        self.state.record_secret(secret);
        Ok(())
    }

    fn table_exists(&mut self, secret: &[u8], _table: &str) -> ClientResult<bool> {
        self.state.record(self.id, "table_exists");
        self.state.record_secret(secret);
        Ok(true)
    }

    fn change_user_authorizations(
        &mut self,
        secret: &[u8],
        _user: &str,
        authorizations: Vec<Vec<u8>>,
    ) -> ClientResult<()> {
        self.state.record(self.id, "change_user_authorizations");
        self.state.record_secret(secret);
        *self.state.auths.lock() = authorizations;
        Ok(())
    }

    fn get_user_authorizations(
        &mut self,
        secret: &[u8],
        _user: &str,
    ) -> ClientResult<Vec<Vec<u8>>> {
        self.state.record(self.id, "get_user_authorizations");
        self.state.record_secret(secret);
        Ok(self.state.auths.lock().clone())
    }

    fn close(&mut self) -> ClientResult<()> {
        self.state.closed_connections.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Counting factory producing mock connections over one shared state.
#[derive(Default)]
pub struct MockFactory {
    state: Arc<MockState>,
}

impl MockFactory {
    pub fn new() -> Self {
        MockFactory::default()
    }

    pub fn state(&self) -> Arc<MockState> {
        Arc::clone(&self.state)
    }

    /// Makes every subsequent connect fail with a refused-connection IO
    /// error.
    pub fn fail_connects(&self, fail: bool) {
        self.state.fail_connects.store(fail, Ordering::SeqCst);
    }
}

impl ConnectionFactory for MockFactory {
    fn connect(&self) -> ClientResult<GridConnection> {
        if self.state.fail_connects.load(Ordering::SeqCst) {
            return Err(ClientError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "mock connect refused",
            )));
        }
        let id = self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(GridConnection::new(Box::new(MockRpc {
            state: Arc::clone(&self.state),
            id,
        })))
    }
}
