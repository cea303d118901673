//! CLI errors

use ensd_ledger::{ArtifactError, LedgerError};
use ensd_pipeline::PipelineError;
use ensd_types::NameError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid name: {0}")]
    Name(#[from] NameError),

    #[error("Invalid pipeline: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Run finished with {failed} failed or blocked stage(s)")]
    RunFailed { failed: usize },

    #[error("Run cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;
