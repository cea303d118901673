//! Ledger error types

use ensd_types::TxHandle;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a ledger client
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Transaction rejected before submission: {reason}")]
    Rejected { reason: String },

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(TxHandle),

    #[error("Unexpected response to {query}: expected {expected}")]
    UnexpectedResponse { query: String, expected: &'static str },

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

/// Errors from the state reader; every failure surfaces as unavailable
#[derive(Debug, Clone, Error)]
pub enum ReadError {
    #[error("Read unavailable for {query}: {reason}")]
    ReadUnavailable { query: String, reason: String },
}

/// Errors from the artifact repository
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed artifact {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
}

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
