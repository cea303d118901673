//! Network profiles
//!
//! A run targets exactly one network. Its classification is read once at
//! orchestration start and decides which mutations may be issued:
//! - Production: the live, irreversible registry
//! - Frozen: a non-production network that must be treated as live (staging)
//! - Test: local and public test networks where setup is freely repeatable

use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy classification of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NetworkClass {
    Production,
    Frozen,
    #[default]
    Test,
}

impl NetworkClass {
    pub fn is_production(&self) -> bool {
        matches!(self, NetworkClass::Production)
    }
}

impl fmt::Display for NetworkClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkClass::Production => write!(f, "production"),
            NetworkClass::Frozen => write!(f, "frozen"),
            NetworkClass::Test => write!(f, "test"),
        }
    }
}

/// The active network and its classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub name: String,
    pub class: NetworkClass,
}

impl NetworkProfile {
    pub fn new(name: impl Into<String>, class: NetworkClass) -> Self {
        Self {
            name: name.into(),
            class,
        }
    }
}

impl fmt::Display for NetworkProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.class)
    }
}
