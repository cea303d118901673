//! # ensd ledger
//!
//! Everything the rollout engine knows about the ledger goes through this
//! crate.
//!
//! ## Key Components
//!
//! - [`LedgerClient`]: submit, wait and query seam implemented per backend
//! - [`LedgerStateReader`]: typed reads that never mistake a failed read for
//!   "unowned"
//! - [`InterfaceIdComputer`]: capability ids from artifact ABIs
//! - [`InMemoryLedger`]: registry-semantics ledger for rehearsals and tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ensd_ledger::{InMemoryLedger, LedgerStateReader};
//! use ensd_types::{namehash, Address};
//!
//! # async fn example() {
//! let ledger = Arc::new(InMemoryLedger::new(Address::from_bytes([1; 20])));
//! let reader = LedgerStateReader::new(ledger);
//! let owner = reader.current_owner(namehash("xyz").unwrap()).await.unwrap();
//! assert!(owner.is_zero());
//! # }
//! ```

#![deny(unsafe_code)]

pub mod artifacts;
pub mod call;
pub mod client;
pub mod error;
pub mod interface;
pub mod memory;
pub mod reader;

pub use artifacts::{abi_function_signatures, ArtifactDirectory, ArtifactRepository, InMemoryArtifacts};
pub use call::{LedgerCall, ReadCall, ReadValue, Receipt, TxOutcome};
pub use client::LedgerClient;
pub use error::{ArtifactError, LedgerError, ReadError, Result};
pub use interface::{compute_interface_id, selector, InterfaceIdComputer};
pub use memory::{InMemoryLedger, InterfaceEntry, LedgerEvent, LedgerSnapshot};
pub use reader::{LedgerStateReader, ReadResult};
