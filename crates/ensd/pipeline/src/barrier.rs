//! Confirmation barrier
//!
//! Awaits every transaction a stage submitted, concurrently, each bounded by
//! the confirmation timeout. Nothing is rolled back: a revert or a timeout is
//! only reported.

use ensd_deployment::PendingTransaction;
use ensd_ledger::{LedgerClient, Receipt, TxOutcome};
use ensd_types::TxHandle;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// What became of one submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed(Receipt),
    Reverted { reason: String },
    /// Confirmation was not observed in time, or the wait itself failed
    Unresolved { reason: String },
}

impl Confirmation {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Confirmation::Confirmed(_))
    }
}

/// Waits for a batch of transactions
pub struct ConfirmationBarrier {
    client: Arc<dyn LedgerClient>,
    timeout: Duration,
}

impl ConfirmationBarrier {
    pub fn new(client: Arc<dyn LedgerClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Await all of `pending`; returns once each is confirmed, reverted or timed out
    pub async fn await_all(&self, pending: &[PendingTransaction]) -> HashMap<TxHandle, Confirmation> {
        if !pending.is_empty() {
            debug!(count = pending.len(), "Waiting on stage transactions");
        }
        let results = join_all(pending.iter().map(|p| self.await_one(p))).await;
        pending.iter().map(|p| p.tx).zip(results).collect()
    }

    async fn await_one(&self, pending: &PendingTransaction) -> Confirmation {
        let tx = pending.tx;
        match tokio::time::timeout(self.timeout, self.client.wait(&tx)).await {
            Ok(Ok(TxOutcome::Confirmed(receipt))) => {
                debug!(tx = %tx, node = %pending.node, block = receipt.block, "Transaction confirmed");
                Confirmation::Confirmed(receipt)
            }
            Ok(Ok(TxOutcome::Reverted { reason, .. })) => {
                warn!(tx = %tx, node = %pending.node, reason = %reason, "Transaction reverted");
                Confirmation::Reverted { reason }
            }
            Ok(Err(e)) => {
                warn!(tx = %tx, node = %pending.node, error = %e, "Transaction unresolved");
                Confirmation::Unresolved {
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                warn!(tx = %tx, node = %pending.node, timeout = ?self.timeout, "Confirmation timed out");
                Confirmation::Unresolved {
                    reason: format!("no confirmation within {:?}", self.timeout),
                }
            }
        }
    }
}
