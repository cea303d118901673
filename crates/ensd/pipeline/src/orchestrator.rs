//! Pipeline orchestrator
//!
//! Runs a [`StageGraph`] against one network. Ready stages run concurrently;
//! a stage is ready once every upstream stage has finished, including the
//! confirmation barrier over its transactions. A failed stage blocks its
//! transitive dependents while independent branches carry on. Every run ends
//! with a complete [`RunReport`].

use crate::barrier::{Confirmation, ConfirmationBarrier};
use crate::graph::StageGraph;
use crate::stage::{Stage, StageAction};
use chrono::Utc;
use ensd_deployment::{
    BindingReport, DeploymentError, ModuleDeployer, PendingTransaction, ReconcileError,
    Reconciler, RunContext,
};
use ensd_types::{
    ConstructorArg, Declaration, DiagnosticAction, DiagnosticEntry, RunId, RunReport, RunStatus,
    StageStatus, StageSummary,
};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Requests cancellation of a running pipeline
///
/// Stages that have not started are reported as cancelled; stages already
/// running finish, including their confirmation barrier.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Result of one finished stage
#[derive(Debug, Clone)]
struct StageOutcome {
    status: StageStatus,
    entries: Vec<DiagnosticEntry>,
    transactions: usize,
}

impl StageOutcome {
    fn new(status: StageStatus) -> Self {
        Self {
            status,
            entries: Vec::new(),
            transactions: 0,
        }
    }

    fn with_entry(mut self, entry: DiagnosticEntry) -> Self {
        self.entries.push(entry);
        self
    }

    fn failed_nodes(&self) -> &[String] {
        match &self.status {
            StageStatus::Failed { failed_nodes, .. } => failed_nodes,
            _ => &[],
        }
    }
}

/// Executes stage graphs
pub struct PipelineOrchestrator {
    ctx: Arc<RunContext>,
    deployer: ModuleDeployer,
    reconciler: Reconciler,
    barrier: ConfirmationBarrier,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl PipelineOrchestrator {
    pub fn new(ctx: Arc<RunContext>) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            deployer: ModuleDeployer::new(ctx.clone()),
            reconciler: Reconciler::new(ctx.clone()),
            barrier: ConfirmationBarrier::new(ctx.client().clone(), ctx.confirmation_timeout()),
            ctx,
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
        }
    }

    pub fn context(&self) -> &Arc<RunContext> {
        &self.ctx
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel_tx.clone(),
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Run every stage of `graph` and report what happened
    pub async fn run(&self, graph: &StageGraph) -> RunReport {
        let run_id = RunId::generate();
        let started_at = Utc::now();
        let network = self.ctx.network().clone();
        info!(
            run_id = %run_id,
            network = %network,
            dry_run = self.ctx.mode().is_dry_run(),
            stages = graph.len(),
            "Pipeline run started"
        );

        let mut outcomes: Vec<Option<StageOutcome>> = vec![None; graph.len()];
        let mut started = vec![false; graph.len()];
        let mut running = FuturesUnordered::new();
        let mut cancelled = false;

        loop {
            cancelled = cancelled || self.is_cancelled();

            // Release stages until nothing else becomes ready without waiting
            let mut progressed = true;
            while progressed {
                progressed = false;
                for &i in graph.order() {
                    if started[i] || !self.upstream_finished(graph, i, &outcomes) {
                        continue;
                    }
                    let stage = &graph.stages()[i];
                    started[i] = true;
                    progressed = true;

                    if let Some(blocker) = self.blocker(graph, i, &outcomes) {
                        warn!(stage = %stage.name, by = %blocker, "Stage blocked");
                        let outcome = StageOutcome::new(StageStatus::Blocked {
                            by: blocker.clone(),
                        })
                        .with_entry(
                            DiagnosticEntry::new(&stage.name, &stage.name, DiagnosticAction::Blocked)
                                .with_reason(format!("upstream stage {} failed", blocker)),
                        );
                        outcomes[i] = Some(outcome);
                    } else if cancelled || self.upstream_cancelled(graph, i, &outcomes) {
                        info!(stage = %stage.name, "Stage cancelled");
                        outcomes[i] = Some(StageOutcome::new(StageStatus::Cancelled).with_entry(
                            DiagnosticEntry::new(&stage.name, &stage.name, DiagnosticAction::Cancelled),
                        ));
                    } else {
                        running.push(self.execute(i, stage));
                    }
                }
            }

            match running.next().await {
                Some((i, outcome)) => outcomes[i] = Some(outcome),
                None => break,
            }
        }

        let mut stages = Vec::with_capacity(graph.len());
        let mut entries = Vec::new();
        for &i in graph.order() {
            let stage = &graph.stages()[i];
            // Every stage is released once its upstream finishes, so all have outcomes
            let outcome = outcomes[i]
                .take()
                .unwrap_or_else(|| StageOutcome::new(StageStatus::Cancelled));
            stages.push(StageSummary {
                name: stage.name.clone(),
                status: outcome.status,
                transactions: outcome.transactions,
            });
            entries.extend(outcome.entries);
        }

        let status = if stages.iter().any(|s| s.status == StageStatus::Cancelled) {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };
        let report = RunReport {
            run_id,
            network,
            dry_run: self.ctx.mode().is_dry_run(),
            status,
            started_at,
            finished_at: Utc::now(),
            stages,
            entries,
        };
        info!(
            run_id = %report.run_id,
            status = ?report.status,
            transactions = report.transactions(),
            failures = report.has_failures(),
            "Pipeline run finished"
        );
        report
    }

    fn upstream_finished(
        &self,
        graph: &StageGraph,
        stage: usize,
        outcomes: &[Option<StageOutcome>],
    ) -> bool {
        graph.upstream(stage).iter().all(|&u| outcomes[u].is_some())
    }

    fn upstream_cancelled(
        &self,
        graph: &StageGraph,
        stage: usize,
        outcomes: &[Option<StageOutcome>],
    ) -> bool {
        graph
            .upstream(stage)
            .iter()
            .any(|&u| matches!(&outcomes[u], Some(o) if o.status == StageStatus::Cancelled))
    }

    /// Name of the upstream stage whose failure blocks `stage`, if any
    fn blocker(
        &self,
        graph: &StageGraph,
        stage: usize,
        outcomes: &[Option<StageOutcome>],
    ) -> Option<String> {
        let deps = &graph.stages()[stage].depends_on;
        for (dep, &u) in deps.iter().zip(graph.upstream(stage)) {
            let Some(upstream) = &outcomes[u] else {
                continue;
            };
            let blocked = match &upstream.status {
                StageStatus::Blocked { .. } => true,
                StageStatus::Failed { .. } => {
                    let failed = upstream.failed_nodes();
                    failed.is_empty()
                        || !dep.is_scoped()
                        || dep.nodes.iter().any(|n| failed.iter().any(|f| node_eq(f, n)))
                }
                StageStatus::Succeeded | StageStatus::Skipped { .. } | StageStatus::Cancelled => {
                    false
                }
            };
            if blocked {
                return Some(dep.stage.clone());
            }
        }
        None
    }

    async fn execute(&self, index: usize, stage: &Stage) -> (usize, StageOutcome) {
        info!(stage = %stage.name, kind = stage.kind(), "Stage started");

        if let Some(module) = &stage.only_if_fresh {
            let fresh = self.ctx.was_freshly_deployed(module)
                || (self.ctx.mode().is_dry_run() && self.ctx.is_pending(module));
            if !fresh {
                let reason = format!("{} was not freshly deployed", module);
                info!(stage = %stage.name, module = %module, "Stage skipped, module not fresh");
                let outcome = StageOutcome::new(StageStatus::Skipped {
                    reason: reason.clone(),
                })
                .with_entry(
                    DiagnosticEntry::new(&stage.name, &stage.name, DiagnosticAction::Skipped)
                        .with_reason(reason),
                );
                return (index, outcome);
            }
        }

        let outcome = match &stage.action {
            StageAction::Deploy { module, args } => self.deploy(stage, module, args).await,
            StageAction::Reconcile(declaration) => self.reconcile(stage, declaration).await,
        };
        match &outcome.status {
            StageStatus::Failed { reason, .. } => {
                warn!(stage = %stage.name, reason = %reason, "Stage failed")
            }
            status => info!(stage = %stage.name, status = %status, "Stage finished"),
        }
        (index, outcome)
    }

    async fn deploy(&self, stage: &Stage, module: &str, args: &[ConstructorArg]) -> StageOutcome {
        match self.deployer.ensure_deployed(module, args).await {
            Ok(deployed) => {
                let mut entry = DiagnosticEntry::new(&stage.name, module, deployed.action());
                if let Some(record) = deployed.record() {
                    entry = entry.with_reason(record.address.to_string());
                }
                let transactions = match deployed.tx() {
                    Some(tx) => {
                        entry = entry.with_tx(tx);
                        1
                    }
                    None => 0,
                };
                StageOutcome {
                    status: StageStatus::Succeeded,
                    entries: vec![entry],
                    transactions,
                }
            }
            Err(e) => {
                let reason = match &e {
                    DeploymentError::DeploymentFailed { reason, .. } => reason.clone(),
                    DeploymentError::ReadUnavailable(read) => read.to_string(),
                };
                StageOutcome::new(StageStatus::Failed {
                    reason: e.to_string(),
                    failed_nodes: Vec::new(),
                })
                .with_entry(
                    DiagnosticEntry::new(&stage.name, module, DiagnosticAction::Failed)
                        .with_reason(reason),
                )
            }
        }
    }

    async fn reconcile(&self, stage: &Stage, declaration: &Declaration) -> StageOutcome {
        let bindings = declaration.bindings_for(&self.ctx.network().name);
        if bindings.is_empty() {
            info!(stage = %stage.name, network = %self.ctx.network().name, "No bindings declared");
        }

        let (reports, abort) = match self.reconciler.reconcile(bindings, self.ctx.mode()).await {
            Ok(reports) => (reports, None),
            Err(ReconcileError::ReadUnavailable { source, completed }) => {
                (completed, Some(source.to_string()))
            }
        };

        let pending: Vec<PendingTransaction> = reports
            .iter()
            .filter_map(BindingReport::pending)
            .cloned()
            .collect();
        let confirmations = self.barrier.await_all(&pending).await;

        let mut entries = Vec::with_capacity(reports.len() + 1);
        let mut failed_nodes = BTreeSet::new();
        for report in &reports {
            let entry = binding_entry(&stage.name, report, &confirmations);
            if entry.action.is_failure() {
                failed_nodes.insert(report.node.path().to_string());
            }
            entries.push(entry);
        }

        let status = match abort {
            Some(reason) => {
                entries.push(
                    DiagnosticEntry::new(&stage.name, &stage.name, DiagnosticAction::Failed)
                        .with_reason(reason.clone()),
                );
                StageStatus::Failed {
                    reason,
                    failed_nodes: Vec::new(),
                }
            }
            None if !failed_nodes.is_empty() => StageStatus::Failed {
                reason: format!("{} binding(s) failed", failed_nodes.len()),
                failed_nodes: failed_nodes.into_iter().collect(),
            },
            None => StageStatus::Succeeded,
        };

        StageOutcome {
            status,
            entries,
            transactions: pending.len(),
        }
    }
}

/// Diagnostic line for one binding after its transaction settled
fn binding_entry(
    stage: &str,
    report: &BindingReport,
    confirmations: &HashMap<ensd_types::TxHandle, Confirmation>,
) -> DiagnosticEntry {
    let Some(pending) = report.pending() else {
        let entry = DiagnosticEntry::new(stage, &report.subject, report.action());
        return match report.reason() {
            Some(reason) => entry.with_reason(reason),
            None => entry,
        };
    };

    let (action, reason) = match confirmations.get(&pending.tx) {
        Some(Confirmation::Confirmed(_)) => (DiagnosticAction::Applied, None),
        Some(Confirmation::Reverted { reason }) => {
            (DiagnosticAction::Failed, Some(format!("reverted: {}", reason)))
        }
        Some(Confirmation::Unresolved { reason }) => {
            (DiagnosticAction::Unresolved, Some(reason.clone()))
        }
        None => (
            DiagnosticAction::Unresolved,
            Some("transaction was not awaited".to_string()),
        ),
    };
    let entry = DiagnosticEntry::new(stage, &report.subject, action).with_tx(pending.tx);
    match reason {
        Some(reason) => entry.with_reason(reason),
        None => entry,
    }
}

/// Compare two paths, ignoring a trailing dot
fn node_eq(a: &str, b: &str) -> bool {
    a.trim_end_matches('.') == b.trim_end_matches('.')
}
