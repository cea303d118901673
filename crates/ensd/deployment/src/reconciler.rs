//! Binding reconciler
//!
//! Compares each desired binding with the ledger and issues only the calls
//! needed to close the gap. Bindings are handled strictly in declaration
//! order; each produces exactly one [`BindingReport`].
//!
//! Failures are attributed to the smallest unit. A rejected submission or an
//! unresolvable reference fails only its own binding; a failed read aborts
//! the whole stage, because nothing can be decided without it.

use crate::context::{RunContext, RunMode};
use crate::error::{ReconcileError, ResolveError};
use ensd_ledger::{LedgerCall, ReadError};
use ensd_policy::PolicyDecision;
use ensd_types::{
    Address, AddressRef, BindingTarget, DesiredBinding, DiagnosticAction, InterfaceId,
    InterfaceSource, NamespaceNode, OwnershipRoute, TxHandle,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Module name of the registry contract used by the `registry` route
pub const REGISTRY_MODULE: &str = "ENSRegistry";

/// Module name of the root contract used by the `root` route
pub const ROOT_MODULE: &str = "Root";

/// A submitted call awaiting confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingTransaction {
    pub tx: TxHandle,
    pub node: NamespaceNode,
    pub call: LedgerCall,
}

/// A binding whose mutation could not be issued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("Mutation of {node} failed: {reason}")]
pub struct MutationFailed {
    pub node: String,
    pub reason: String,
}

/// What the reconciler did with one binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BindingOutcome {
    /// Ledger already matches
    Unchanged,
    /// Mutation submitted
    Submitted(PendingTransaction),
    /// Dry run: this call would be submitted
    Planned { call: String },
    /// Withheld by network policy
    PolicySkip { reason: String },
    /// Not applicable right now, e.g. the node has no resolver
    Skipped { reason: String },
    Failed(MutationFailed),
}

/// Outcome for one binding, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingReport {
    pub subject: String,
    pub node: NamespaceNode,
    #[serde(flatten)]
    pub outcome: BindingOutcome,
}

impl BindingReport {
    pub fn action(&self) -> DiagnosticAction {
        match &self.outcome {
            BindingOutcome::Unchanged => DiagnosticAction::Unchanged,
            BindingOutcome::Submitted(_) => DiagnosticAction::Applied,
            BindingOutcome::Planned { .. } => DiagnosticAction::Planned,
            BindingOutcome::PolicySkip { .. } => DiagnosticAction::PolicySkip,
            BindingOutcome::Skipped { .. } => DiagnosticAction::Skipped,
            BindingOutcome::Failed(_) => DiagnosticAction::Failed,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match &self.outcome {
            BindingOutcome::Planned { call } => Some(call),
            BindingOutcome::PolicySkip { reason } | BindingOutcome::Skipped { reason } => {
                Some(reason)
            }
            BindingOutcome::Failed(failure) => Some(&failure.reason),
            BindingOutcome::Unchanged | BindingOutcome::Submitted(_) => None,
        }
    }

    pub fn pending(&self) -> Option<&PendingTransaction> {
        match &self.outcome {
            BindingOutcome::Submitted(pending) => Some(pending),
            _ => None,
        }
    }
}

/// Control flow of a single binding
enum Step {
    Done(BindingOutcome),
    Call(LedgerCall),
}

/// Brings declared bindings into agreement with the ledger
pub struct Reconciler {
    ctx: Arc<RunContext>,
}

impl Reconciler {
    pub fn new(ctx: Arc<RunContext>) -> Self {
        Self { ctx }
    }

    /// Reconcile `bindings` in order; only a failed read is an error
    ///
    /// On a failed read the reports completed so far travel with the error,
    /// so transactions already submitted can still be awaited.
    pub async fn reconcile(
        &self,
        bindings: &[DesiredBinding],
        mode: RunMode,
    ) -> Result<Vec<BindingReport>, ReconcileError> {
        let mut reports = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let outcome = match self.reconcile_one(binding, mode).await {
                Ok(outcome) => outcome,
                Err(source) => {
                    warn!(node = %binding.node, error = %source, "Read failed, aborting reconcile");
                    return Err(ReconcileError::ReadUnavailable {
                        source,
                        completed: reports,
                    });
                }
            };
            reports.push(BindingReport {
                subject: binding.subject(),
                node: binding.node.clone(),
                outcome,
            });
        }
        Ok(reports)
    }

    async fn reconcile_one(
        &self,
        binding: &DesiredBinding,
        mode: RunMode,
    ) -> Result<BindingOutcome, ReadError> {
        let step = match &binding.target {
            BindingTarget::Owner { owner, via } => {
                self.owner_step(binding, owner, via, mode).await?
            }
            BindingTarget::Controller {
                registrar,
                controller,
            } => self.controller_step(binding, registrar, controller, mode).await?,
            BindingTarget::Interface {
                interface,
                implementer,
            } => self.interface_step(binding, interface, implementer, mode).await?,
        };

        let call = match step {
            Step::Done(outcome) => return Ok(outcome),
            Step::Call(call) => call,
        };

        let node = &binding.node;
        if mode.is_dry_run() {
            info!(node = %node, call = %call, "Mutation planned");
            return Ok(BindingOutcome::Planned {
                call: call.to_string(),
            });
        }

        match self.ctx.client().submit(call.clone()).await {
            Ok(tx) => {
                info!(node = %node, tx = %tx, call = %call, "Mutation submitted");
                Ok(BindingOutcome::Submitted(PendingTransaction {
                    tx,
                    node: node.clone(),
                    call,
                }))
            }
            Err(e) => {
                warn!(node = %node, call = %call, error = %e, "Mutation rejected");
                Ok(failed(node, e.to_string()))
            }
        }
    }

    /// Resolve a reference, mapping failures onto the binding
    async fn resolve(
        &self,
        node: &NamespaceNode,
        reference: &AddressRef,
        mode: RunMode,
    ) -> Result<Result<Address, BindingOutcome>, ReadError> {
        match self.ctx.resolve_address(reference).await {
            Ok(address) => Ok(Ok(address)),
            Err(ResolveError::Read(e)) => Err(e),
            Err(ResolveError::ModulePending(module)) if mode.is_dry_run() => {
                Ok(Err(BindingOutcome::Planned {
                    call: format!("pending deployment of {}", module),
                }))
            }
            Err(e) => {
                warn!(node = %node, reference = %reference, error = %e, "Reference unresolved");
                Ok(Err(failed(node, e.to_string())))
            }
        }
    }

    /// Consult the guard; `Some` means the mutation is withheld
    fn withheld(&self, binding: &DesiredBinding) -> Option<BindingOutcome> {
        let network = &self.ctx.network().name;
        match self.ctx.guard().evaluate(network, binding.mutation_kind()) {
            PolicyDecision::Allow => None,
            PolicyDecision::Withhold { reason } => {
                warn!(node = %binding.node, network = %network, reason = %reason, "Policy skip");
                Some(BindingOutcome::PolicySkip { reason })
            }
        }
    }

    async fn owner_step(
        &self,
        binding: &DesiredBinding,
        owner: &AddressRef,
        via: &OwnershipRoute,
        mode: RunMode,
    ) -> Result<Step, ReadError> {
        let node = &binding.node;
        let owner = match self.resolve(node, owner, mode).await? {
            Ok(address) => address,
            Err(outcome) => return Ok(Step::Done(outcome)),
        };

        let current = self.ctx.reader().current_owner(node.node()).await?;
        if current == owner {
            debug!(node = %node, owner = %owner, "Owner unchanged");
            return Ok(Step::Done(BindingOutcome::Unchanged));
        }
        if let Some(skip) = self.withheld(binding) {
            return Ok(Step::Done(skip));
        }

        let call = match via {
            OwnershipRoute::Registrar(registrar) => {
                let registrar = match self.resolve(node, registrar, mode).await? {
                    Ok(address) => address,
                    Err(outcome) => return Ok(Step::Done(outcome)),
                };
                LedgerCall::EnableNode {
                    registrar,
                    name: node.wire().to_vec(),
                }
            }
            OwnershipRoute::Root => {
                let label = match (node.depth(), node.label_hash()) {
                    (1, Some(label)) => label,
                    _ => {
                        return Ok(Step::Done(failed(
                            node,
                            "root route only assigns top-level labels",
                        )))
                    }
                };
                let root = match self
                    .resolve(node, &AddressRef::module(ROOT_MODULE), mode)
                    .await?
                {
                    Ok(address) => address,
                    Err(outcome) => return Ok(Step::Done(outcome)),
                };
                LedgerCall::RootSetSubnodeOwner { root, label, owner }
            }
            OwnershipRoute::Registry => {
                let (parent, label) = match (node.parent(), node.label_hash()) {
                    (Some(parent), Some(label)) => (parent, label),
                    _ => return Ok(Step::Done(failed(node, "the root node has no parent"))),
                };
                let registry = match self
                    .resolve(node, &AddressRef::module(REGISTRY_MODULE), mode)
                    .await?
                {
                    Ok(address) => address,
                    Err(outcome) => return Ok(Step::Done(outcome)),
                };
                LedgerCall::RegistrySetSubnodeOwner {
                    registry,
                    parent: parent.node(),
                    label,
                    owner,
                }
            }
        };
        Ok(Step::Call(call))
    }

    async fn controller_step(
        &self,
        binding: &DesiredBinding,
        registrar: &AddressRef,
        controller: &AddressRef,
        mode: RunMode,
    ) -> Result<Step, ReadError> {
        let node = &binding.node;
        let registrar = match self.resolve(node, registrar, mode).await? {
            Ok(address) => address,
            Err(outcome) => return Ok(Step::Done(outcome)),
        };
        let controller = match self.resolve(node, controller, mode).await? {
            Ok(address) => address,
            Err(outcome) => return Ok(Step::Done(outcome)),
        };

        if self.ctx.reader().is_controller(registrar, controller).await? {
            debug!(registrar = %registrar, controller = %controller, "Controller unchanged");
            return Ok(Step::Done(BindingOutcome::Unchanged));
        }
        if let Some(skip) = self.withheld(binding) {
            return Ok(Step::Done(skip));
        }
        Ok(Step::Call(LedgerCall::AddController {
            registrar,
            controller,
        }))
    }

    async fn interface_step(
        &self,
        binding: &DesiredBinding,
        interface: &InterfaceSource,
        implementer: &AddressRef,
        mode: RunMode,
    ) -> Result<Step, ReadError> {
        let node = &binding.node;
        let resolver = match self.ctx.reader().current_resolver(node.node()).await? {
            Some(resolver) => resolver,
            None => {
                info!(node = %node, "No resolver set, skipping interface binding");
                return Ok(Step::Done(BindingOutcome::Skipped {
                    reason: format!("no resolver set for {}", node),
                }));
            }
        };

        let interface_id = match self.interface_id(interface) {
            Ok(id) => id,
            Err(reason) => return Ok(Step::Done(failed(node, reason))),
        };
        let implementer = match self.resolve(node, implementer, mode).await? {
            Ok(address) => address,
            Err(outcome) => return Ok(Step::Done(outcome)),
        };

        let current = self
            .ctx
            .reader()
            .interface_implementer(resolver, node.node(), interface_id)
            .await?;
        if current == Some(implementer) {
            debug!(node = %node, interface = %interface_id, "Interface unchanged");
            return Ok(Step::Done(BindingOutcome::Unchanged));
        }
        if let Some(skip) = self.withheld(binding) {
            return Ok(Step::Done(skip));
        }
        Ok(Step::Call(LedgerCall::SetInterface {
            resolver,
            node: node.node(),
            interface_id,
            implementer,
        }))
    }

    fn interface_id(&self, source: &InterfaceSource) -> Result<InterfaceId, String> {
        match source {
            InterfaceSource::Literal(id) => Ok(*id),
            InterfaceSource::Artifact(module) => self
                .ctx
                .interfaces()
                .ok_or_else(|| format!("no artifact repository configured for {}", module))?
                .interface_id_for(module)
                .map_err(|e| e.to_string()),
        }
    }
}

fn failed(node: &NamespaceNode, reason: impl Into<String>) -> BindingOutcome {
    BindingOutcome::Failed(MutationFailed {
        node: node.path().to_string(),
        reason: reason.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensd_ledger::{InMemoryArtifacts, InMemoryLedger, LedgerClient, TxOutcome};
    use ensd_policy::NetworkPolicyGuard;
    use ensd_types::{labelhash, namehash};

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn node(path: &str) -> NamespaceNode {
        NamespaceNode::new(path).unwrap()
    }

    fn reconciler(ledger: &Arc<InMemoryLedger>, network: &str) -> Reconciler {
        let artifacts =
            InMemoryArtifacts::new().with_module("IERC165", ["supportsInterface(bytes4)"]);
        let ctx = RunContext::new(network, ledger.clone(), NetworkPolicyGuard::default())
            .with_artifacts(Arc::new(artifacts));
        Reconciler::new(Arc::new(ctx))
    }

    fn xyz_to_registrar() -> Vec<DesiredBinding> {
        vec![DesiredBinding::owner(
            node("xyz"),
            AddressRef::module("DNSRegistrar"),
            OwnershipRoute::Registrar(AddressRef::module("DNSRegistrar")),
        )]
    }

    async fn confirm_all(ledger: &InMemoryLedger, reports: &[BindingReport]) {
        for pending in reports.iter().filter_map(BindingReport::pending) {
            assert!(matches!(
                ledger.wait(&pending.tx).await.unwrap(),
                TxOutcome::Confirmed(_)
            ));
        }
    }

    #[tokio::test]
    async fn test_owned_node_on_mainnet_is_unchanged() {
        let ledger = Arc::new(InMemoryLedger::new(addr(1)));
        ledger.set_deployment("DNSRegistrar", addr(9));
        ledger.set_owner("xyz", addr(9)).unwrap();

        let reports = reconciler(&ledger, "mainnet")
            .reconcile(&xyz_to_registrar(), RunMode::Apply)
            .await
            .unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].action(), DiagnosticAction::Unchanged);
        assert_eq!(ledger.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_differing_owner_on_hardhat_enables_node_once() {
        let ledger = Arc::new(InMemoryLedger::new(addr(1)));
        ledger.set_deployment("DNSRegistrar", addr(9));
        let reconciler = reconciler(&ledger, "hardhat");

        let reports = reconciler
            .reconcile(&xyz_to_registrar(), RunMode::Apply)
            .await
            .unwrap();
        assert_eq!(reports[0].action(), DiagnosticAction::Applied);
        let calls = ledger.submitted_calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], LedgerCall::EnableNode { name, .. } if name == node("xyz").wire()));
        confirm_all(&ledger, &reports).await;

        let again = reconciler
            .reconcile(&xyz_to_registrar(), RunMode::Apply)
            .await
            .unwrap();
        assert_eq!(again[0].action(), DiagnosticAction::Unchanged);
        assert_eq!(ledger.submission_count(), 1);
    }

    #[tokio::test]
    async fn test_production_withholds_every_differing_binding() {
        let ledger = Arc::new(InMemoryLedger::new(addr(1)));
        ledger.set_deployment("DNSRegistrar", addr(9));
        ledger.set_deployment("BaseRegistrarImplementation", addr(3));
        ledger.set_deployment("NameWrapper", addr(4));
        ledger.set_resolver("eth", addr(5)).unwrap();

        let mut bindings = xyz_to_registrar();
        bindings.push(DesiredBinding::controller(
            node("eth"),
            AddressRef::module("BaseRegistrarImplementation"),
            AddressRef::module("NameWrapper"),
        ));
        bindings.push(DesiredBinding::interface(
            node("eth"),
            InterfaceSource::Artifact("IERC165".into()),
            AddressRef::module("NameWrapper"),
        ));

        let reports = reconciler(&ledger, "mainnet")
            .reconcile(&bindings, RunMode::Apply)
            .await
            .unwrap();
        assert!(reports
            .iter()
            .all(|r| r.action() == DiagnosticAction::PolicySkip));
        assert_eq!(ledger.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_reverse_setup_routes() {
        let ledger = Arc::new(InMemoryLedger::new(addr(1)));
        ledger.set_deployment("ENSRegistry", addr(2));
        ledger.set_deployment("Root", addr(3));
        ledger.set_deployment("ReverseRegistrar", addr(6));
        let reconciler = reconciler(&ledger, "hardhat");

        let bindings = vec![
            DesiredBinding::owner(
                node("reverse"),
                AddressRef::account("deployer"),
                OwnershipRoute::Root,
            ),
            DesiredBinding::owner(
                node("addr.reverse"),
                AddressRef::module("ReverseRegistrar"),
                OwnershipRoute::Registry,
            ),
        ];
        let reports = reconciler.reconcile(&bindings, RunMode::Apply).await.unwrap();
        assert_eq!(reports.len(), 2);

        let calls = ledger.submitted_calls();
        assert_eq!(
            calls[0],
            LedgerCall::RootSetSubnodeOwner {
                root: addr(3),
                label: labelhash("reverse"),
                owner: addr(1),
            }
        );
        assert_eq!(
            calls[1],
            LedgerCall::RegistrySetSubnodeOwner {
                registry: addr(2),
                parent: namehash("reverse").unwrap(),
                label: labelhash("addr"),
                owner: addr(6),
            }
        );
        confirm_all(&ledger, &reports).await;
        assert_eq!(ledger.owner_of("addr.reverse"), Some(addr(6)));
    }

    #[tokio::test]
    async fn test_interface_without_resolver_is_skipped() {
        let ledger = Arc::new(InMemoryLedger::new(addr(1)));
        ledger.set_deployment("NameWrapper", addr(4));
        let bindings = vec![DesiredBinding::interface(
            node("eth"),
            InterfaceSource::Artifact("IERC165".into()),
            AddressRef::module("NameWrapper"),
        )];

        let reports = reconciler(&ledger, "hardhat")
            .reconcile(&bindings, RunMode::Apply)
            .await
            .unwrap();
        assert_eq!(reports[0].action(), DiagnosticAction::Skipped);
        assert_eq!(ledger.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_interface_binding_uses_computed_id() {
        let ledger = Arc::new(InMemoryLedger::new(addr(1)));
        ledger.set_deployment("OwnedResolver", addr(5));
        ledger.set_deployment("NameWrapper", addr(4));
        ledger.set_resolver("eth", addr(5)).unwrap();
        let bindings = vec![DesiredBinding::interface(
            node("eth"),
            InterfaceSource::Artifact("IERC165".into()),
            AddressRef::module("NameWrapper"),
        )];
        let reconciler = reconciler(&ledger, "hardhat");

        let reports = reconciler.reconcile(&bindings, RunMode::Apply).await.unwrap();
        assert_eq!(reports[0].action(), DiagnosticAction::Applied);
        confirm_all(&ledger, &reports).await;
        let id: InterfaceId = "0x01ffc9a7".parse().unwrap();
        assert_eq!(
            ledger.interface_implementer(addr(5), namehash("eth").unwrap(), id),
            Some(addr(4))
        );

        let again = reconciler.reconcile(&bindings, RunMode::Apply).await.unwrap();
        assert_eq!(again[0].action(), DiagnosticAction::Unchanged);
    }

    #[tokio::test]
    async fn test_rejected_submission_fails_only_its_slot() {
        let ledger = Arc::new(InMemoryLedger::new(addr(1)));
        ledger.set_deployment("DNSRegistrar", addr(9));
        let (_, joy) = ensd_types::encode("joy").unwrap();
        ledger.reject_when(
            move |c| matches!(c, LedgerCall::EnableNode { name, .. } if *name == joy),
            "nonce too low",
        );

        let bindings: Vec<DesiredBinding> = ["exposed", "joy", "market"]
            .iter()
            .map(|tld| {
                DesiredBinding::owner(
                    node(tld),
                    AddressRef::module("DNSRegistrar"),
                    OwnershipRoute::Registrar(AddressRef::module("DNSRegistrar")),
                )
            })
            .collect();
        let reports = reconciler(&ledger, "bsc-testnet")
            .reconcile(&bindings, RunMode::Apply)
            .await
            .unwrap();

        let actions: Vec<_> = reports.iter().map(BindingReport::action).collect();
        assert_eq!(
            actions,
            vec![
                DiagnosticAction::Applied,
                DiagnosticAction::Failed,
                DiagnosticAction::Applied
            ]
        );
        assert!(matches!(
            &reports[1].outcome,
            BindingOutcome::Failed(MutationFailed { node, .. }) if node == "joy"
        ));
    }

    #[tokio::test]
    async fn test_missing_module_fails_binding() {
        let ledger = Arc::new(InMemoryLedger::new(addr(1)));
        let reports = reconciler(&ledger, "hardhat")
            .reconcile(&xyz_to_registrar(), RunMode::Apply)
            .await
            .unwrap();
        assert_eq!(reports[0].action(), DiagnosticAction::Failed);
    }

    #[tokio::test]
    async fn test_unreachable_ledger_aborts_stage() {
        let ledger = Arc::new(InMemoryLedger::new(addr(1)));
        ledger.set_deployment("DNSRegistrar", addr(9));
        ledger.set_reachable(false);
        let result = reconciler(&ledger, "hardhat")
            .reconcile(&xyz_to_registrar(), RunMode::Apply)
            .await;
        match result {
            Err(ReconcileError::ReadUnavailable { completed, .. }) => assert!(completed.is_empty()),
            other => panic!("expected read failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dry_run_plans_without_submitting() {
        let ledger = Arc::new(InMemoryLedger::new(addr(1)));
        ledger.set_deployment("DNSRegistrar", addr(9));
        let reports = reconciler(&ledger, "hardhat")
            .reconcile(&xyz_to_registrar(), RunMode::DryRun)
            .await
            .unwrap();
        assert_eq!(reports[0].action(), DiagnosticAction::Planned);
        assert!(reports[0].reason().unwrap().contains("enableNode(xyz)"));
        assert_eq!(ledger.submission_count(), 0);
    }
}
