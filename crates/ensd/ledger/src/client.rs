//! Ledger client trait

use crate::call::{LedgerCall, ReadCall, ReadValue, TxOutcome};
use crate::error::Result;
use async_trait::async_trait;
use ensd_types::{Address, TxHandle};

/// Connection to the ledger
///
/// Implementations own signing, nonce management and broadcast. The ledger
/// serialises submitted transactions itself, so callers may submit several
/// before awaiting any of them.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a mutating call and return its handle
    ///
    /// Errors here mean nothing was broadcast.
    async fn submit(&self, call: LedgerCall) -> Result<TxHandle>;

    /// Wait until a submitted transaction is confirmed or reverted
    async fn wait(&self, tx: &TxHandle) -> Result<TxOutcome>;

    /// Read current state
    async fn query(&self, read: ReadCall) -> Result<ReadValue>;

    /// Address transactions are sent from
    fn signer(&self) -> Address;
}
