//! # Blocking RPC Surface
//!
//! Purpose: Type the remote service's entry points as one trait with a
//! blocking method per capability, and provide the TCP stub that speaks
//! the framed wire protocol.
//!
//! ## Design Principles
//! 1. **Closed Capability Set**: The method table is fixed at compile
//!    time; callers select an entry point by calling it, not by name.
//! 2. **One Exchange Per Call**: Every method is a single request/response
//!    round trip on an exclusively owned stream.
//! 3. **Faults Stay Typed**: Remote fault kinds map one-to-one onto
//!    [`ClientError`] variants; the exhaustion signal is an error variant
//!    here and becomes end-of-sequence one layer up.

use std::net::TcpStream;

use bincode::config::{BigEndian, Configuration, Fixint};
use tracing::debug;

use cgrid_common::wire::{
    Fault, FaultKind, Request, Response, UpdateBatch, WireBatchScanOptions, WireEntry,
    WireScanOptions, WireWriterOptions, codec_config,
};
use cgrid_common::{ResourceId, TimeType};

use crate::connection::ConnectionParams;
use crate::error::{ClientError, ClientResult};

/// Blocking entry points of the remote service, one method per capability.
///
/// Implementations own their transport; a call may block indefinitely on
/// the wire. The executor is what keeps that off the async scheduler.
pub trait GridRpc: Send {
    fn create_scanner(
        &mut self,
        secret: &[u8],
        table: &str,
        options: WireScanOptions,
    ) -> ClientResult<ResourceId>;

    fn create_batch_scanner(
        &mut self,
        secret: &[u8],
        table: &str,
        options: WireBatchScanOptions,
    ) -> ClientResult<ResourceId>;

    fn create_writer(
        &mut self,
        secret: &[u8],
        table: &str,
        options: WireWriterOptions,
    ) -> ClientResult<ResourceId>;

    /// Fetches the next entry of a scan. Exhaustion is reported as
    /// [`ClientError::Exhausted`].
    fn next_entry(&mut self, resource: &ResourceId) -> ClientResult<WireEntry>;

    fn close_scanner(&mut self, resource: &ResourceId) -> ClientResult<()>;

    fn apply_updates(&mut self, resource: &ResourceId, batch: UpdateBatch) -> ClientResult<()>;

    fn close_writer(&mut self, resource: &ResourceId) -> ClientResult<()>;

    fn create_table(
        &mut self,
        secret: &[u8],
        table: &str,
        versioning_iterator: bool,
        time_type: TimeType,
    ) -> ClientResult<()>;

    fn table_exists(&mut self, secret: &[u8], table: &str) -> ClientResult<bool>;

    fn change_user_authorizations(
        &mut self,
        secret: &[u8],
        user: &str,
        authorizations: Vec<Vec<u8>>,
    ) -> ClientResult<()>;

    fn get_user_authorizations(
        &mut self,
        secret: &[u8],
        user: &str,
    ) -> ClientResult<Vec<Vec<u8>>>;

    /// Closes the underlying transport.
    fn close(&mut self) -> ClientResult<()>;
}

fn fault_error(fault: Fault) -> ClientError {
    match fault.kind {
        FaultKind::NotFound => ClientError::NotFound(fault.message),
        FaultKind::NoMoreEntries => ClientError::Exhausted,
        FaultKind::Internal => ClientError::Remote(fault.message),
    }
}

/// TCP stub speaking the framed bincode protocol.
pub struct TcpGridRpc {
    stream: TcpStream,
    config: Configuration<BigEndian, Fixint>,
}

impl TcpGridRpc {
    /// Opens a connection to the configured host and port.
    pub fn connect(params: &ConnectionParams) -> ClientResult<Self> {
        let stream = TcpStream::connect((params.host.as_str(), params.port))?;
        // Calls are small request/response exchanges; don't batch them.
        stream.set_nodelay(true)?;
        debug!(host = %params.host, port = params.port, "connected to cell store");
        Ok(TcpGridRpc {
            stream,
            config: codec_config(),
        })
    }

    fn call(&mut self, request: Request) -> ClientResult<Response> {
        bincode::encode_into_std_write(request, &mut self.stream, self.config)?;
        let response: Response = bincode::decode_from_std_read(&mut self.stream, self.config)?;
        match response {
            Response::Fault(fault) => Err(fault_error(fault)),
            other => Ok(other),
        }
    }

    fn expect_resource(response: Response) -> ClientResult<ResourceId> {
        match response {
            Response::Resource(id) => Ok(id),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    fn expect_unit(response: Response) -> ClientResult<()> {
        match response {
            Response::Unit => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

impl GridRpc for TcpGridRpc {
    fn create_scanner(
        &mut self,
        secret: &[u8],
        table: &str,
        options: WireScanOptions,
    ) -> ClientResult<ResourceId> {
        let response = self.call(Request::CreateScanner {
            secret: secret.to_vec(),
            table: table.to_string(),
            options,
        })?;
        Self::expect_resource(response)
    }

    fn create_batch_scanner(
        &mut self,
        secret: &[u8],
        table: &str,
        options: WireBatchScanOptions,
    ) -> ClientResult<ResourceId> {
        let response = self.call(Request::CreateBatchScanner {
            secret: secret.to_vec(),
            table: table.to_string(),
            options,
        })?;
        Self::expect_resource(response)
    }

    fn create_writer(
        &mut self,
        secret: &[u8],
        table: &str,
        options: WireWriterOptions,
    ) -> ClientResult<ResourceId> {
        let response = self.call(Request::CreateWriter {
            secret: secret.to_vec(),
            table: table.to_string(),
            options,
        })?;
        Self::expect_resource(response)
    }

    fn next_entry(&mut self, resource: &ResourceId) -> ClientResult<WireEntry> {
        let response = self.call(Request::NextEntry {
            resource: resource.clone(),
        })?;
        match response {
            Response::Entry(entry) => Ok(entry),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    fn close_scanner(&mut self, resource: &ResourceId) -> ClientResult<()> {
        let response = self.call(Request::CloseScanner {
            resource: resource.clone(),
        })?;
        Self::expect_unit(response)
    }

    fn apply_updates(&mut self, resource: &ResourceId, batch: UpdateBatch) -> ClientResult<()> {
        let response = self.call(Request::ApplyUpdates {
            resource: resource.clone(),
            batch,
        })?;
        Self::expect_unit(response)
    }

    fn close_writer(&mut self, resource: &ResourceId) -> ClientResult<()> {
        let response = self.call(Request::CloseWriter {
            resource: resource.clone(),
        })?;
        Self::expect_unit(response)
    }

    fn create_table(
        &mut self,
        secret: &[u8],
        table: &str,
        versioning_iterator: bool,
        time_type: TimeType,
    ) -> ClientResult<()> {
        let response = self.call(Request::CreateTable {
            secret: secret.to_vec(),
            table: table.to_string(),
            versioning_iterator,
            time_type,
        })?;
        Self::expect_unit(response)
    }

    fn table_exists(&mut self, secret: &[u8], table: &str) -> ClientResult<bool> {
        let response = self.call(Request::TableExists {
            secret: secret.to_vec(),
            table: table.to_string(),
        })?;
        match response {
            Response::Bool(exists) => Ok(exists),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    fn change_user_authorizations(
        &mut self,
        secret: &[u8],
        user: &str,
        authorizations: Vec<Vec<u8>>,
    ) -> ClientResult<()> {
        let response = self.call(Request::ChangeUserAuthorizations {
            secret: secret.to_vec(),
            user: user.to_string(),
            authorizations,
        })?;
        Self::expect_unit(response)
    }

    fn get_user_authorizations(
        &mut self,
        secret: &[u8],
        user: &str,
    ) -> ClientResult<Vec<Vec<u8>>> {
        let response = self.call(Request::GetUserAuthorizations {
            secret: secret.to_vec(),
            user: user.to_string(),
        })?;
        match response {
            Response::Authorizations(authorizations) => Ok(authorizations),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    fn close(&mut self) -> ClientResult<()> {
        self.stream.shutdown(std::net::Shutdown::Both)?;
        Ok(())
    }
}
