//! # ensd pipeline
//!
//! Runs a rollout as a graph of stages.
//!
//! ## Key Components
//!
//! - [`Stage`]: one deploy or reconcile invocation and its upstream stages
//! - [`StageGraph`]: validated, acyclic stage set with a reproducible order
//! - [`ConfirmationBarrier`]: awaits every transaction a stage submitted
//! - [`PipelineOrchestrator`]: executes ready stages concurrently, blocks
//!   dependents of failures and assembles the [`RunReport`]
//! - [`standard_plan`]: the built-in plan for the naming registry
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use ensd_deployment::RunContext;
//! use ensd_ledger::InMemoryLedger;
//! use ensd_pipeline::{standard_plan, PipelineOrchestrator, StageGraph};
//! use ensd_policy::NetworkPolicyGuard;
//! use ensd_types::Address;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = Arc::new(InMemoryLedger::new(Address::from_bytes([1; 20])));
//! let ctx = RunContext::new("hardhat", ledger, NetworkPolicyGuard::default());
//!
//! let graph = StageGraph::new(standard_plan()?)?;
//! let report = PipelineOrchestrator::new(Arc::new(ctx)).run(&graph).await;
//! println!("{} transactions", report.transactions());
//! # Ok(())
//! # }
//! ```
//!
//! [`RunReport`]: ensd_types::RunReport

#![deny(unsafe_code)]

pub mod barrier;
pub mod error;
pub mod graph;
pub mod orchestrator;
pub mod plans;
pub mod stage;

pub use barrier::{Confirmation, ConfirmationBarrier};
pub use error::{PipelineError, Result};
pub use graph::StageGraph;
pub use orchestrator::{CancelHandle, PipelineOrchestrator};
pub use plans::{standard_plan, tld_map, METADATA_URL, WRAPPER_UPGRADE_ADDRESS};
pub use stage::{Stage, StageAction, StageDependency};
