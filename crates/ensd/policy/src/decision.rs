//! Policy decision types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of evaluating a mutation against the active network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PolicyDecision {
    /// Mutation may be submitted
    Allow,

    /// Mutation must not be submitted; the binding is reported as a policy skip
    Withhold { reason: String },
}

impl PolicyDecision {
    pub fn withhold(reason: impl Into<String>) -> Self {
        Self::Withhold {
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Reason for withholding, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Withhold { reason } => Some(reason),
        }
    }
}

impl fmt::Display for PolicyDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Withhold { reason } => write!(f, "withhold: {}", reason),
        }
    }
}
