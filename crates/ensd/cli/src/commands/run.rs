//! `run` and `plan`

use crate::config::PipelineConfig;
use crate::error::{CliError, CliResult};
use crate::output::{self, print_info, OutputFormat};
use ensd_deployment::{RunContext, RunMode, DEPLOYER_ACCOUNT};
use ensd_ledger::{ArtifactDirectory, InMemoryLedger};
use ensd_pipeline::{PipelineOrchestrator, StageGraph};
use ensd_policy::NetworkPolicyGuard;
use ensd_types::{RunReport, RunStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Options shared by `run` and `plan`
pub struct RunOptions {
    pub network: String,
    pub ledger: Option<PathBuf>,
    pub save_ledger: Option<PathBuf>,
    pub mode: RunMode,
}

/// Ledger to run against: a snapshot, or an empty ledger signed by the deployer account
fn open_ledger(config: &PipelineConfig, snapshot: Option<&Path>) -> CliResult<InMemoryLedger> {
    if let Some(path) = snapshot {
        info!(path = %path.display(), "Loading ledger snapshot");
        return Ok(InMemoryLedger::load_snapshot(path)?);
    }
    let signer = config.accounts.get(DEPLOYER_ACCOUNT).ok_or_else(|| {
        CliError::Config(format!(
            "no ledger snapshot given and no '{}' account configured",
            DEPLOYER_ACCOUNT
        ))
    })?;
    Ok(InMemoryLedger::new(signer))
}

pub async fn execute(
    options: RunOptions,
    config: &PipelineConfig,
    format: OutputFormat,
) -> CliResult<()> {
    let graph = StageGraph::new(config.stages()?)?;
    let ledger = Arc::new(open_ledger(config, options.ledger.as_deref())?);

    let guard = NetworkPolicyGuard::new(config.policy.clone());
    let mut ctx = RunContext::new(&options.network, ledger.clone(), guard)
        .with_mode(options.mode)
        .with_accounts(config.accounts.clone())
        .with_confirmation_timeout(config.confirmation_timeout());
    if let Some(dir) = &config.artifacts {
        ctx = ctx.with_artifacts(Arc::new(ArtifactDirectory::new(dir)));
    }

    let orchestrator = PipelineOrchestrator::new(Arc::new(ctx));
    let cancel = orchestrator.cancel_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling stages not yet started");
            cancel.cancel();
        }
    });

    let report = orchestrator.run(&graph).await;
    interrupt.abort();

    if let Some(path) = &options.save_ledger {
        if options.mode.is_dry_run() {
            print_info("Dry run, ledger snapshot not saved");
        } else {
            ledger.save_snapshot(path)?;
            info!(path = %path.display(), "Ledger snapshot saved");
        }
    }

    output::print_report(&report, format)?;
    outcome(&report)
}

/// Exit status of a finished run
fn outcome(report: &RunReport) -> CliResult<()> {
    if report.status == RunStatus::Cancelled {
        return Err(CliError::Cancelled);
    }
    let failed = report
        .stages
        .iter()
        .filter(|s| s.status.is_failed() || s.status.did_not_run())
        .count();
    if failed > 0 {
        return Err(CliError::RunFailed { failed });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensd_deployment::NamedAccounts;
    use ensd_ledger::LedgerSnapshot;
    use ensd_types::Address;

    fn config_with_deployer() -> PipelineConfig {
        PipelineConfig {
            accounts: NamedAccounts::new().with(DEPLOYER_ACCOUNT, Address::from_bytes([7; 20])),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_empty_ledger_needs_deployer() {
        assert!(matches!(
            open_ledger(&PipelineConfig::default(), None),
            Err(CliError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_run_saves_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let saved = dir.path().join("after.yaml");
        let options = RunOptions {
            network: "hardhat".into(),
            ledger: None,
            save_ledger: Some(saved.clone()),
            mode: RunMode::Apply,
        };
        execute(options, &config_with_deployer(), OutputFormat::Json)
            .await
            .unwrap();

        let snapshot: LedgerSnapshot =
            serde_yaml::from_str(&std::fs::read_to_string(&saved).unwrap()).unwrap();
        assert_eq!(snapshot.signer, Address::from_bytes([7; 20]));
        assert_eq!(snapshot.deployments.len(), 9);
        assert_eq!(
            snapshot.owners.get("xyz").copied(),
            snapshot.deployments.get("DNSRegistrar").copied()
        );
    }

    #[tokio::test]
    async fn test_plan_leaves_snapshot_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let saved = dir.path().join("after.yaml");
        let options = RunOptions {
            network: "hardhat".into(),
            ledger: None,
            save_ledger: Some(saved.clone()),
            mode: RunMode::DryRun,
        };
        execute(options, &config_with_deployer(), OutputFormat::Json)
            .await
            .unwrap();
        assert!(!saved.exists());
    }
}
