//! # ensd deployment
//!
//! The two decision-making components of a rollout run:
//!
//! - [`ModuleDeployer`]: deploys a module only when it is missing, and at
//!   most once per run
//! - [`Reconciler`]: turns desired bindings into the minimal set of registry
//!   calls, consulting the network policy guard before each mutation
//!
//! Both share a [`RunContext`] holding the ledger client, the policy guard,
//! named accounts and the module records of the run.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use ensd_deployment::{ModuleDeployer, Reconciler, RunContext, RunMode};
//! use ensd_ledger::InMemoryLedger;
//! use ensd_policy::NetworkPolicyGuard;
//! use ensd_types::{Address, Declaration};
//!
//! # async fn example(declaration: Declaration) -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = Arc::new(InMemoryLedger::new(Address::from_bytes([1; 20])));
//! let ctx = Arc::new(RunContext::new("hardhat", ledger, NetworkPolicyGuard::default()));
//!
//! let deployer = ModuleDeployer::new(ctx.clone());
//! deployer.ensure_deployed("ENSRegistry", &[]).await?;
//!
//! let reconciler = Reconciler::new(ctx);
//! let reports = reconciler
//!     .reconcile(declaration.bindings_for("hardhat"), RunMode::Apply)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod context;
pub mod deployer;
pub mod error;
pub mod reconciler;

pub use context::{
    NamedAccounts, RunContext, RunMode, DEFAULT_CONFIRMATION_TIMEOUT, DEPLOYER_ACCOUNT,
};
pub use deployer::{DeployOutcome, ModuleDeployer};
pub use error::{DeploymentError, ReconcileError, ResolveError, Result};
pub use reconciler::{
    BindingOutcome, BindingReport, MutationFailed, PendingTransaction, Reconciler,
    REGISTRY_MODULE, ROOT_MODULE,
};
