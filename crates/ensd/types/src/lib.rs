//! Core types for naming-registry rollout
//!
//! Shared by every ensd crate:
//! - [`ids`]: addresses, node hashes, interface ids, transaction handles
//! - [`name`]: the name encoder (namehash and DNS wire form)
//! - [`binding`]: desired-state declarations
//! - [`module`]: module records and constructor arguments
//! - [`network`]: network profiles
//! - [`report`]: run diagnostics

#![deny(unsafe_code)]

pub mod binding;
pub mod ids;
pub mod module;
pub mod name;
pub mod network;
pub mod report;

pub use binding::{
    AddressRef, BindingTarget, Declaration, DesiredBinding, InterfaceSource, MutationKind,
    OwnershipRoute, RefParseError,
};
pub use ids::{Address, IdParseError, InterfaceId, NodeHash, RunId, TxHandle};
pub use module::{ArgParseError, ConstructorArg, ModuleRecord, Token};
pub use name::{decode_wire, encode, keccak256, labelhash, namehash, NameError, NamespaceNode};
pub use network::{NetworkClass, NetworkProfile};
pub use report::{
    DiagnosticAction, DiagnosticEntry, RunReport, RunStatus, StageStatus, StageSummary,
};
