//! Deployment and reconciliation errors

use crate::reconciler::BindingReport;
use ensd_ledger::ReadError;
use thiserror::Error;

/// A declared reference that could not be turned into an address
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("Unknown named account: {0}")]
    UnknownAccount(String),

    #[error("Module {0} is not deployed")]
    ModuleNotDeployed(String),

    /// Only produced in dry runs, for modules this run would deploy
    #[error("Module {0} is planned but not deployed")]
    ModulePending(String),

    #[error("Invalid node {path}: {reason}")]
    InvalidNode { path: String, reason: String },

    #[error(transparent)]
    Read(#[from] ReadError),
}

/// Errors from the module deployer
#[derive(Debug, Clone, Error)]
pub enum DeploymentError {
    #[error("Deployment of {module} failed: {reason}")]
    DeploymentFailed { module: String, reason: String },

    #[error(transparent)]
    ReadUnavailable(#[from] ReadError),
}

impl DeploymentError {
    pub fn failed(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeploymentFailed {
            module: module.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that abort a whole reconcile stage
///
/// Per-binding failures are reported in the binding's slot instead.
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    #[error("{source}")]
    ReadUnavailable {
        #[source]
        source: ReadError,
        /// Reports for the bindings handled before the read failed
        completed: Vec<BindingReport>,
    },
}

/// Result type for deployment operations
pub type Result<T> = std::result::Result<T, DeploymentError>;
