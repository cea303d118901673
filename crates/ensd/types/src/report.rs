//! Run diagnostics
//!
//! Every run ends with a [`RunReport`], whatever failed along the way. The
//! ledger is the only durable state; the report is the only other output.

use crate::ids::{RunId, TxHandle};
use crate::network::NetworkProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to one subject (a module or a binding)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticAction {
    /// Module deployed by this run
    Deployed,
    /// Module already present
    Reused,
    /// Mutation submitted and confirmed
    Applied,
    /// Mutation or deployment that a dry run would issue
    Planned,
    /// Current state already matches
    Unchanged,
    /// Mutation withheld by network policy
    PolicySkip,
    /// Not attempted, see reason
    Skipped,
    /// Deployment or mutation failed
    Failed,
    /// Submitted but confirmation was not observed
    Unresolved,
    /// Stage not run because a dependency failed
    Blocked,
    /// Stage not run because the run was cancelled
    Cancelled,
}

impl DiagnosticAction {
    /// Whether this outcome blocks dependents
    pub fn is_failure(&self) -> bool {
        matches!(self, DiagnosticAction::Failed | DiagnosticAction::Unresolved)
    }
}

impl fmt::Display for DiagnosticAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticAction::Deployed => "deployed",
            DiagnosticAction::Reused => "reused",
            DiagnosticAction::Applied => "applied",
            DiagnosticAction::Planned => "planned",
            DiagnosticAction::Unchanged => "unchanged",
            DiagnosticAction::PolicySkip => "policy-skip",
            DiagnosticAction::Skipped => "skipped",
            DiagnosticAction::Failed => "failed",
            DiagnosticAction::Unresolved => "unresolved",
            DiagnosticAction::Blocked => "blocked",
            DiagnosticAction::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// One line of the diagnostics report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub stage: String,
    pub subject: String,
    pub action: DiagnosticAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx: Option<TxHandle>,
    pub at: DateTime<Utc>,
}

impl DiagnosticEntry {
    pub fn new(stage: impl Into<String>, subject: impl Into<String>, action: DiagnosticAction) -> Self {
        Self {
            stage: stage.into(),
            subject: subject.into(),
            action,
            reason: None,
            tx: None,
            at: Utc::now(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_tx(mut self, tx: TxHandle) -> Self {
        self.tx = Some(tx);
        self
    }
}

/// Final status of a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    /// Ran to completion; individual bindings may still be policy skips
    Succeeded,
    /// Deliberately not run (fresh guard)
    Skipped { reason: String },
    /// Ran and failed; `failed_nodes` empty means the whole stage failed
    Failed {
        reason: String,
        failed_nodes: Vec<String>,
    },
    /// Not run, a dependency failed
    Blocked { by: String },
    /// Not run, the run was cancelled
    Cancelled,
}

impl StageStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, StageStatus::Failed { .. })
    }

    /// Whether the stage never started
    pub fn did_not_run(&self) -> bool {
        matches!(self, StageStatus::Blocked { .. } | StageStatus::Cancelled)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Succeeded => write!(f, "succeeded"),
            StageStatus::Skipped { reason } => write!(f, "skipped ({})", reason),
            StageStatus::Failed { reason, .. } => write!(f, "failed ({})", reason),
            StageStatus::Blocked { by } => write!(f, "blocked by {}", by),
            StageStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Per-stage summary line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSummary {
    pub name: String,
    #[serde(flatten)]
    pub status: StageStatus,
    /// Transactions submitted by the stage
    pub transactions: usize,
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Cancelled,
}

/// Diagnostics for a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub network: NetworkProfile,
    pub dry_run: bool,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stages: Vec<StageSummary>,
    pub entries: Vec<DiagnosticEntry>,
}

impl RunReport {
    pub fn stage(&self, name: &str) -> Option<&StageSummary> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn entries_for<'a>(&'a self, stage: &'a str) -> impl Iterator<Item = &'a DiagnosticEntry> + 'a {
        self.entries.iter().filter(move |e| e.stage == stage)
    }

    pub fn count(&self, action: DiagnosticAction) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }

    /// Transactions submitted across all stages
    pub fn transactions(&self) -> usize {
        self.stages.iter().map(|s| s.transactions).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.stages
            .iter()
            .any(|s| s.status.is_failed() || matches!(s.status, StageStatus::Blocked { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkClass;

    #[test]
    fn test_failure_actions() {
        assert!(DiagnosticAction::Failed.is_failure());
        assert!(DiagnosticAction::Unresolved.is_failure());
        assert!(!DiagnosticAction::PolicySkip.is_failure());
        assert_eq!(DiagnosticAction::PolicySkip.to_string(), "policy-skip");
    }

    #[test]
    fn test_report_queries() {
        let report = RunReport {
            run_id: RunId::generate(),
            network: NetworkProfile::new("hardhat", NetworkClass::Test),
            dry_run: false,
            status: RunStatus::Completed,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            stages: vec![
                StageSummary {
                    name: "dns-tlds".into(),
                    status: StageStatus::Succeeded,
                    transactions: 1,
                },
                StageSummary {
                    name: "wrapper".into(),
                    status: StageStatus::Blocked {
                        by: "registry".into(),
                    },
                    transactions: 0,
                },
            ],
            entries: vec![
                DiagnosticEntry::new("dns-tlds", "xyz owner", DiagnosticAction::Applied),
                DiagnosticEntry::new("wrapper", "NameWrapper", DiagnosticAction::Blocked)
                    .with_reason("registry failed"),
            ],
        };

        assert_eq!(report.transactions(), 1);
        assert_eq!(report.count(DiagnosticAction::Applied), 1);
        assert_eq!(report.entries_for("wrapper").count(), 1);
        assert!(report.has_failures());
        assert!(report.stage("wrapper").unwrap().status.did_not_run());
    }

    #[test]
    fn test_stage_summary_serialises_flat() {
        let summary = StageSummary {
            name: "reverse".into(),
            status: StageStatus::Skipped {
                reason: "already deployed".into(),
            },
            transactions: 0,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "already deployed");
    }
}
