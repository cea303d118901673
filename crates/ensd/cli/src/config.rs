//! Pipeline configuration file
//!
//! ```yaml
//! policy:
//!   production: [mainnet]
//!   frozen: [goerli]
//! accounts:
//!   deployer: "0x..."
//! confirmation_timeout_secs: 120
//! artifacts: ./artifacts
//! stages:
//!   - name: registry
//!     deploy:
//!       module: ENSRegistry
//! ```
//!
//! Every section is optional. Without `stages` the built-in plan is used.

use crate::error::{CliError, CliResult};
use ensd_deployment::NamedAccounts;
use ensd_pipeline::{standard_plan, Stage};
use ensd_policy::PolicyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Production and frozen network lists
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Named accounts usable as `account:<name>`
    #[serde(default)]
    pub accounts: NamedAccounts,

    /// Per-transaction confirmation timeout in seconds
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,

    /// Artifact directory for interface-id computation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<PathBuf>,

    /// Stage list replacing the built-in plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<Stage>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            accounts: NamedAccounts::default(),
            confirmation_timeout_secs: default_confirmation_timeout(),
            artifacts: None,
            stages: None,
        }
    }
}

fn default_confirmation_timeout() -> u64 {
    120
}

impl PipelineConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let mut config: PipelineConfig = serde_yaml::from_str(&contents)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))?;

        // Relative artifact paths are relative to the config file
        if let (Some(artifacts), Some(dir)) = (&config.artifacts, path.parent()) {
            if artifacts.is_relative() {
                config.artifacts = Some(dir.join(artifacts));
            }
        }
        Ok(config)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    /// Configured stages, or the built-in plan
    pub fn stages(&self) -> CliResult<Vec<Stage>> {
        match &self.stages {
            Some(stages) => Ok(stages.clone()),
            None => Ok(standard_plan()?),
        }
    }
}
