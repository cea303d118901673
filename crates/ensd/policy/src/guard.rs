//! Network policy guard
//!
//! Classifies the active network and decides whether an irreversible
//! registry mutation may be issued on it. Pure function of configuration.

use crate::decision::PolicyDecision;
use ensd_types::{MutationKind, NetworkClass, NetworkProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// Network classification lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Live networks
    #[serde(default = "default_production")]
    pub production: BTreeSet<String>,

    /// Non-production networks that must be treated as live
    #[serde(default)]
    pub frozen: BTreeSet<String>,
}

fn default_production() -> BTreeSet<String> {
    BTreeSet::from(["mainnet".to_string()])
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            production: default_production(),
            frozen: BTreeSet::new(),
        }
    }
}

/// Decides which mutations the active network permits
#[derive(Debug, Clone, Default)]
pub struct NetworkPolicyGuard {
    config: PolicyConfig,
}

impl NetworkPolicyGuard {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Add a network that must be treated as live
    pub fn with_frozen(mut self, network: impl Into<String>) -> Self {
        self.config.frozen.insert(network.into());
        self
    }

    pub fn with_production(mut self, network: impl Into<String>) -> Self {
        self.config.production.insert(network.into());
        self
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn is_production_network(&self, network: &str) -> bool {
        self.config.production.contains(network)
    }

    pub fn allows_irreversible_mutation(&self, network: &str) -> bool {
        !self.is_production_network(network) && !self.config.frozen.contains(network)
    }

    pub fn classify(&self, network: &str) -> NetworkProfile {
        let class = if self.is_production_network(network) {
            NetworkClass::Production
        } else if self.config.frozen.contains(network) {
            NetworkClass::Frozen
        } else {
            NetworkClass::Test
        };
        NetworkProfile::new(network, class)
    }

    /// Single entry point consulted before any mutation is submitted
    pub fn evaluate(&self, network: &str, kind: MutationKind) -> PolicyDecision {
        if !kind.is_irreversible() || self.allows_irreversible_mutation(network) {
            return PolicyDecision::Allow;
        }
        let profile = self.classify(network);
        warn!(network = %network, class = %profile.class, kind = %kind, "Mutation withheld");
        PolicyDecision::withhold(format!(
            "{} is not permitted on {} network {}",
            kind, profile.class, network
        ))
    }
}
