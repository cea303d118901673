//! # ensd policy
//!
//! Environment gate for registry mutations. Production networks (and any
//! network configured as frozen) never receive ownership, subnode, controller
//! or interface changes; the reconciler reports such bindings as policy
//! skips instead of submitting them.
//!
//! ```rust
//! use ensd_policy::NetworkPolicyGuard;
//! use ensd_types::MutationKind;
//!
//! let guard = NetworkPolicyGuard::default();
//! assert!(!guard.evaluate("mainnet", MutationKind::OwnershipTransfer).is_allowed());
//! assert!(guard.evaluate("hardhat", MutationKind::OwnershipTransfer).is_allowed());
//! ```

#![deny(unsafe_code)]

pub mod decision;
pub mod guard;

pub use decision::PolicyDecision;
pub use guard::{NetworkPolicyGuard, PolicyConfig};
