//! Ledger state reader
//!
//! Typed, read-only view over [`LedgerClient::query`]. A failed or malformed
//! query is always reported as [`ReadError::ReadUnavailable`]; it is never
//! interpreted as "unowned" or "not deployed".

use crate::call::{ReadCall, ReadValue};
use crate::client::LedgerClient;
use crate::error::{LedgerError, ReadError};
use ensd_types::{Address, InterfaceId, NodeHash};
use std::sync::Arc;
use tracing::debug;

/// Result type for reads
pub type ReadResult<T> = std::result::Result<T, ReadError>;

/// Read-only queries against the registry
#[derive(Clone)]
pub struct LedgerStateReader {
    client: Arc<dyn LedgerClient>,
}

impl LedgerStateReader {
    pub fn new(client: Arc<dyn LedgerClient>) -> Self {
        Self { client }
    }

    async fn query(&self, read: ReadCall) -> ReadResult<ReadValue> {
        let label = read.to_string();
        let value = self
            .client
            .query(read)
            .await
            .map_err(|e| unavailable(&label, e))?;
        debug!(query = %label, value = ?value, "Ledger read");
        Ok(value)
    }

    async fn address(&self, read: ReadCall) -> ReadResult<Option<Address>> {
        let label = read.to_string();
        match self.query(read).await? {
            ReadValue::Address(addr) if addr.is_zero() => Ok(None),
            ReadValue::Address(addr) => Ok(Some(addr)),
            ReadValue::Missing => Ok(None),
            ReadValue::Bool(_) => Err(unexpected(&label, "address")),
        }
    }

    /// Current owner of a node; the zero address when unowned
    pub async fn current_owner(&self, node: NodeHash) -> ReadResult<Address> {
        Ok(self
            .address(ReadCall::Owner { node })
            .await?
            .unwrap_or(Address::ZERO))
    }

    /// Resolver bound to a node, if any
    pub async fn current_resolver(&self, node: NodeHash) -> ReadResult<Option<Address>> {
        self.address(ReadCall::Resolver { node }).await
    }

    /// Address of a named module deployment, if any
    pub async fn deployed_address(&self, module: &str) -> ReadResult<Option<Address>> {
        self.address(ReadCall::Deployment {
            module: module.to_string(),
        })
        .await
    }

    pub async fn is_deployed(&self, module: &str) -> ReadResult<bool> {
        Ok(self.deployed_address(module).await?.is_some())
    }

    pub async fn is_controller(&self, registrar: Address, controller: Address) -> ReadResult<bool> {
        let read = ReadCall::IsController {
            registrar,
            controller,
        };
        let label = read.to_string();
        match self.query(read).await? {
            ReadValue::Bool(b) => Ok(b),
            _ => Err(unexpected(&label, "bool")),
        }
    }

    /// Implementer advertised by `resolver` for `interface_id` on `node`
    pub async fn interface_implementer(
        &self,
        resolver: Address,
        node: NodeHash,
        interface_id: InterfaceId,
    ) -> ReadResult<Option<Address>> {
        self.address(ReadCall::InterfaceImplementer {
            resolver,
            node,
            interface_id,
        })
        .await
    }
}

fn unavailable(query: &str, err: LedgerError) -> ReadError {
    ReadError::ReadUnavailable {
        query: query.to_string(),
        reason: err.to_string(),
    }
}

fn unexpected(query: &str, expected: &'static str) -> ReadError {
    unavailable(
        query,
        LedgerError::UnexpectedResponse {
            query: query.to_string(),
            expected,
        },
    )
}
