//! Module deployer
//!
//! Ensures a module exists on the ledger, deploying it at most once per run.
//! Calls for the same module are serialised on a per-module lock, so two
//! stages asking for it never race two deployment transactions while
//! unrelated modules deploy concurrently.

use crate::context::RunContext;
use crate::error::{DeploymentError, ResolveError, Result};
use dashmap::DashMap;
use ensd_ledger::{LedgerCall, TxOutcome};
use ensd_types::{ConstructorArg, DiagnosticAction, ModuleRecord, Token, TxHandle};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of [`ModuleDeployer::ensure_deployed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Already on the ledger before this run touched it
    Existing(ModuleRecord),
    /// Deployed and confirmed by this call
    Deployed(ModuleRecord),
    /// Already handled earlier in this run
    SeenAgain(ModuleRecord),
    /// Dry run: the module would be deployed
    Planned { module: String },
}

impl DeployOutcome {
    pub fn record(&self) -> Option<&ModuleRecord> {
        match self {
            DeployOutcome::Existing(r)
            | DeployOutcome::Deployed(r)
            | DeployOutcome::SeenAgain(r) => Some(r),
            DeployOutcome::Planned { .. } => None,
        }
    }

    pub fn action(&self) -> DiagnosticAction {
        match self {
            DeployOutcome::Deployed(_) => DiagnosticAction::Deployed,
            DeployOutcome::Existing(_) | DeployOutcome::SeenAgain(_) => DiagnosticAction::Reused,
            DeployOutcome::Planned { .. } => DiagnosticAction::Planned,
        }
    }

    /// Deployment transaction submitted by this call
    pub fn tx(&self) -> Option<TxHandle> {
        match self {
            DeployOutcome::Deployed(r) => r.tx,
            _ => None,
        }
    }
}

/// Exactly-once module deployment within a run
pub struct ModuleDeployer {
    ctx: Arc<RunContext>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ModuleDeployer {
    pub fn new(ctx: Arc<RunContext>) -> Self {
        Self {
            ctx,
            locks: DashMap::new(),
        }
    }

    /// Make sure `module` is deployed, deploying it with `args` if missing
    pub async fn ensure_deployed(
        &self,
        module: &str,
        args: &[ConstructorArg],
    ) -> Result<DeployOutcome> {
        let lock = self.locks.entry(module.to_string()).or_default().clone();
        let _guard = lock.lock().await;

        if let Some(record) = self.ctx.module(module) {
            debug!(module = %module, address = %record.address, "Module already handled this run");
            return Ok(DeployOutcome::SeenAgain(record.seen_again()));
        }
        if self.ctx.is_pending(module) {
            return Ok(DeployOutcome::Planned {
                module: module.to_string(),
            });
        }

        if let Some(address) = self.ctx.reader().deployed_address(module).await? {
            let record = ModuleRecord::existing(module, address);
            self.ctx.record_module(record.clone());
            info!(module = %module, address = %address, "Reusing existing module");
            return Ok(DeployOutcome::Existing(record));
        }

        let tokens = match self.resolve_args(module, args).await {
            Ok(tokens) => tokens,
            Err(ResolveError::ModulePending(_)) if self.ctx.mode().is_dry_run() => Vec::new(),
            Err(ResolveError::Read(e)) => return Err(e.into()),
            Err(e) => return Err(DeploymentError::failed(module, e.to_string())),
        };

        if self.ctx.mode().is_dry_run() {
            self.ctx.mark_pending(module);
            info!(module = %module, "Module deployment planned");
            return Ok(DeployOutcome::Planned {
                module: module.to_string(),
            });
        }

        let record = self.deploy(module, tokens).await?;
        self.ctx.record_module(record.clone());
        Ok(DeployOutcome::Deployed(record))
    }

    async fn resolve_args(
        &self,
        module: &str,
        args: &[ConstructorArg],
    ) -> std::result::Result<Vec<Token>, ResolveError> {
        let mut tokens = Vec::with_capacity(args.len());
        for arg in args {
            let token = self.ctx.resolve_arg(arg).await.map_err(|e| {
                debug!(module = %module, arg = %arg, error = %e, "Constructor argument unresolved");
                e
            })?;
            tokens.push(token);
        }
        Ok(tokens)
    }

    async fn deploy(&self, module: &str, args: Vec<Token>) -> Result<ModuleRecord> {
        let client = self.ctx.client();
        let tx = client
            .submit(LedgerCall::Deploy {
                module: module.to_string(),
                args,
            })
            .await
            .map_err(|e| DeploymentError::failed(module, e.to_string()))?;
        info!(module = %module, tx = %tx, "Deployment submitted");

        let timeout = self.ctx.confirmation_timeout();
        let outcome = match tokio::time::timeout(timeout, client.wait(&tx)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => return Err(DeploymentError::failed(module, e.to_string())),
            Err(_) => {
                warn!(module = %module, tx = %tx, timeout = ?timeout, "Deployment confirmation timed out");
                return Err(DeploymentError::failed(
                    module,
                    format!("confirmation of {} timed out after {:?}", tx, timeout),
                ));
            }
        };

        match outcome {
            TxOutcome::Confirmed(receipt) => {
                let address = receipt.contract_address.ok_or_else(|| {
                    DeploymentError::failed(
                        module,
                        format!("receipt for {} has no contract address", tx),
                    )
                })?;
                info!(module = %module, address = %address, block = receipt.block, "Module deployed");
                Ok(ModuleRecord::deployed(module, address, tx))
            }
            TxOutcome::Reverted { reason, .. } => {
                warn!(module = %module, tx = %tx, reason = %reason, "Deployment reverted");
                Err(DeploymentError::failed(module, format!("reverted: {}", reason)))
            }
        }
    }
}
