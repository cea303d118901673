//! Pipeline errors
//!
//! Only graph problems are errors. Anything that goes wrong while a valid
//! graph runs ends up in the run report instead.

use thiserror::Error;

/// Errors detected before any stage runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("Duplicate stage name: {0}")]
    DuplicateStage(String),

    #[error("Stage {stage} depends on unknown stage {dependency}")]
    UnknownDependency { stage: String, dependency: String },

    #[error("Stage {stage} lists invalid node {path}: {reason}")]
    InvalidNode {
        stage: String,
        path: String,
        reason: String,
    },

    #[error("Cycle detected between stages: {}", .0.join(", "))]
    CycleDetected(Vec<String>),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
