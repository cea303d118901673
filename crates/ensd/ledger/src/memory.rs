//! In-memory registry ledger
//!
//! Implements [`LedgerClient`] with the registry semantics the engine relies
//! on: node owners, resolvers, named deployments, registrar controllers and
//! resolver interfaces. Calls execute at submission, in submission order,
//! the way an automining development chain behaves; `wait` returns the
//! stored outcome.
//!
//! Failure injection (unreachable ledger, rejected submissions, reverting or
//! stalled transactions) and an event log make it the test double for the
//! whole engine. It can also be seeded from and saved to a YAML snapshot.

use crate::call::{LedgerCall, ReadCall, ReadValue, Receipt, TxOutcome};
use crate::client::LedgerClient;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use ensd_types::{
    decode_wire, keccak256, namehash, Address, InterfaceId, NamespaceNode, NodeHash, TxHandle,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

type CallMatcher = Arc<dyn Fn(&LedgerCall) -> bool + Send + Sync>;
type ReadMatcher = Arc<dyn Fn(&ReadCall) -> bool + Send + Sync>;

struct FailureRule {
    matcher: CallMatcher,
    reason: String,
}

struct ReadFailureRule {
    matcher: ReadMatcher,
    reason: String,
}

/// Something observed by the ledger, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    Submitted { tx: TxHandle, call: LedgerCall },
    Confirmed { tx: TxHandle },
    Reverted { tx: TxHandle, reason: String },
}

#[derive(Default)]
struct LedgerState {
    block: u64,
    nonce: u64,
    reachable: bool,
    owners: HashMap<NodeHash, Address>,
    resolvers: HashMap<NodeHash, Address>,
    deployments: BTreeMap<String, Address>,
    controllers: HashMap<Address, BTreeSet<Address>>,
    interfaces: HashMap<(Address, NodeHash, InterfaceId), Address>,
    names: HashMap<NodeHash, String>,
    outcomes: HashMap<TxHandle, TxOutcome>,
    observed: HashSet<TxHandle>,
    stalled: HashSet<TxHandle>,
    events: Vec<LedgerEvent>,
    rejections: Vec<FailureRule>,
    reverts: Vec<FailureRule>,
    stalls: Vec<CallMatcher>,
    read_failures: Vec<ReadFailureRule>,
}

impl LedgerState {
    fn is_contract(&self, addr: &Address) -> bool {
        self.deployments.values().any(|a| a == addr)
    }

    fn remember_name(&mut self, path: &str) -> Option<NodeHash> {
        let node = namehash(path).ok()?;
        self.names.insert(node, path.to_string());
        Some(node)
    }

    fn next_handle(&mut self, signer: &Address) -> TxHandle {
        self.nonce += 1;
        let mut buf = Vec::with_capacity(28);
        buf.extend_from_slice(signer.as_bytes());
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        TxHandle::from_bytes(keccak256(buf))
    }

    /// Apply a call, returning the created contract address or a revert reason
    fn execute(
        &mut self,
        signer: &Address,
        tx: &TxHandle,
        call: &LedgerCall,
    ) -> std::result::Result<Option<Address>, String> {
        match call {
            LedgerCall::Deploy { module, .. } => {
                let address = Address::from_word(keccak256(tx.as_bytes()));
                self.deployments.insert(module.clone(), address);
                Ok(Some(address))
            }
            LedgerCall::RootSetSubnodeOwner { root, label, owner } => {
                if !self.is_contract(root) {
                    return Err(format!("call to non-contract {}", root));
                }
                let node = child_node(NodeHash::ZERO, label);
                self.owners.insert(node, *owner);
                Ok(None)
            }
            LedgerCall::RegistrySetSubnodeOwner {
                registry,
                parent,
                label,
                owner,
            } => {
                if !self.is_contract(registry) {
                    return Err(format!("call to non-contract {}", registry));
                }
                let parent_owner = self.owners.get(parent).copied().unwrap_or(Address::ZERO);
                if parent_owner != *signer {
                    return Err(format!(
                        "not authorised: {} does not own {}",
                        signer, parent
                    ));
                }
                self.owners.insert(child_node(*parent, label), *owner);
                Ok(None)
            }
            LedgerCall::EnableNode { registrar, name } => {
                if !self.is_contract(registrar) {
                    return Err(format!("call to non-contract {}", registrar));
                }
                let path = decode_wire(name).map_err(|e| e.to_string())?;
                let node = self
                    .remember_name(&path)
                    .ok_or_else(|| format!("invalid name {:?}", path))?;
                self.owners.insert(node, *registrar);
                Ok(None)
            }
            LedgerCall::AddController {
                registrar,
                controller,
            } => {
                if !self.is_contract(registrar) {
                    return Err(format!("call to non-contract {}", registrar));
                }
                self.controllers
                    .entry(*registrar)
                    .or_default()
                    .insert(*controller);
                Ok(None)
            }
            LedgerCall::SetInterface {
                resolver,
                node,
                interface_id,
                implementer,
            } => {
                if !self.is_contract(resolver) {
                    return Err(format!("call to non-contract {}", resolver));
                }
                self.interfaces
                    .insert((*resolver, *node, *interface_id), *implementer);
                Ok(None)
            }
        }
    }
}

fn child_node(parent: NodeHash, label: &[u8; 32]) -> NodeHash {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(parent.as_bytes());
    buf[32..].copy_from_slice(label);
    NodeHash::from_bytes(keccak256(buf))
}

/// In-memory ledger with registry semantics
pub struct InMemoryLedger {
    signer: Address,
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    /// Create an empty, reachable ledger sending from `signer`
    pub fn new(signer: Address) -> Self {
        Self {
            signer,
            state: Mutex::new(LedgerState {
                reachable: true,
                ..LedgerState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Seeding ──────────────────────────────────────────────────────

    /// Set the owner of a node by path
    pub fn set_owner(&self, path: &str, owner: Address) -> Result<()> {
        let mut state = self.state();
        let node = state
            .remember_name(path)
            .ok_or_else(|| LedgerError::Snapshot(format!("invalid name {:?}", path)))?;
        state.owners.insert(node, owner);
        Ok(())
    }

    /// Set the resolver of a node by path
    pub fn set_resolver(&self, path: &str, resolver: Address) -> Result<()> {
        let mut state = self.state();
        let node = state
            .remember_name(path)
            .ok_or_else(|| LedgerError::Snapshot(format!("invalid name {:?}", path)))?;
        state.resolvers.insert(node, resolver);
        Ok(())
    }

    /// Record an existing deployment
    pub fn set_deployment(&self, module: impl Into<String>, address: Address) {
        self.state().deployments.insert(module.into(), address);
    }

    pub fn add_controller(&self, registrar: Address, controller: Address) {
        self.state()
            .controllers
            .entry(registrar)
            .or_default()
            .insert(controller);
    }

    pub fn set_interface(
        &self,
        resolver: Address,
        node: NodeHash,
        interface_id: InterfaceId,
        implementer: Address,
    ) {
        self.state()
            .interfaces
            .insert((resolver, node, interface_id), implementer);
    }

    // ── Failure injection ────────────────────────────────────────────

    /// Toggle reachability; every call fails with `Unavailable` while false
    pub fn set_reachable(&self, reachable: bool) {
        self.state().reachable = reachable;
    }

    /// Reject matching calls at submission
    pub fn reject_when<F>(&self, matcher: F, reason: impl Into<String>)
    where
        F: Fn(&LedgerCall) -> bool + Send + Sync + 'static,
    {
        self.state().rejections.push(FailureRule {
            matcher: Arc::new(matcher),
            reason: reason.into(),
        });
    }

    /// Accept matching calls but revert them without effect
    pub fn revert_when<F>(&self, matcher: F, reason: impl Into<String>)
    where
        F: Fn(&LedgerCall) -> bool + Send + Sync + 'static,
    {
        self.state().reverts.push(FailureRule {
            matcher: Arc::new(matcher),
            reason: reason.into(),
        });
    }

    /// Accept matching calls but never confirm them
    pub fn stall_when<F>(&self, matcher: F)
    where
        F: Fn(&LedgerCall) -> bool + Send + Sync + 'static,
    {
        self.state().stalls.push(Arc::new(matcher));
    }

    /// Fail matching reads with `Unavailable`
    pub fn fail_reads_when<F>(&self, matcher: F, reason: impl Into<String>)
    where
        F: Fn(&ReadCall) -> bool + Send + Sync + 'static,
    {
        self.state().read_failures.push(ReadFailureRule {
            matcher: Arc::new(matcher),
            reason: reason.into(),
        });
    }

    // ── Inspection ───────────────────────────────────────────────────

    pub fn owner_of(&self, path: &str) -> Option<Address> {
        let node = namehash(path).ok()?;
        self.state().owners.get(&node).copied()
    }

    pub fn deployment(&self, module: &str) -> Option<Address> {
        self.state().deployments.get(module).copied()
    }

    pub fn is_controller(&self, registrar: &Address, controller: &Address) -> bool {
        self.state()
            .controllers
            .get(registrar)
            .map(|set| set.contains(controller))
            .unwrap_or(false)
    }

    pub fn interface_implementer(
        &self,
        resolver: Address,
        node: NodeHash,
        interface_id: InterfaceId,
    ) -> Option<Address> {
        self.state()
            .interfaces
            .get(&(resolver, node, interface_id))
            .copied()
    }

    /// Everything the ledger has observed, in order
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.state().events.clone()
    }

    /// Calls submitted so far, in order
    pub fn submitted_calls(&self) -> Vec<LedgerCall> {
        self.state()
            .events
            .iter()
            .filter_map(|e| match e {
                LedgerEvent::Submitted { call, .. } => Some(call.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn submission_count(&self) -> usize {
        self.submitted_calls().len()
    }

    // ── Snapshots ────────────────────────────────────────────────────

    /// Build a ledger from a snapshot
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self> {
        let ledger = Self::new(snapshot.signer);
        {
            let mut state = ledger.state();
            state.deployments = snapshot.deployments;
            for (key, owner) in snapshot.owners {
                let node = snapshot_node(&mut state, &key)?;
                state.owners.insert(node, owner);
            }
            for (key, resolver) in snapshot.resolvers {
                let node = snapshot_node(&mut state, &key)?;
                state.resolvers.insert(node, resolver);
            }
            for (registrar, controllers) in snapshot.controllers {
                state
                    .controllers
                    .entry(registrar)
                    .or_default()
                    .extend(controllers);
            }
            for entry in snapshot.interfaces {
                let node = snapshot_node(&mut state, &entry.node)?;
                state.interfaces.insert(
                    (entry.resolver, node, entry.interface_id),
                    entry.implementer,
                );
            }
        }
        Ok(ledger)
    }

    /// Load a YAML snapshot file
    pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Snapshot(format!("{}: {}", path.display(), e)))?;
        let snapshot: LedgerSnapshot = serde_yaml::from_str(&contents)
            .map_err(|e| LedgerError::Snapshot(format!("{}: {}", path.display(), e)))?;
        Self::from_snapshot(snapshot)
    }

    /// Capture current state; nodes with a known path are keyed by path
    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state();
        let key = |node: &NodeHash| {
            state
                .names
                .get(node)
                .cloned()
                .unwrap_or_else(|| node.to_string())
        };
        let mut interfaces: Vec<InterfaceEntry> = state
            .interfaces
            .iter()
            .map(|((resolver, node, id), implementer)| InterfaceEntry {
                resolver: *resolver,
                node: key(node),
                interface_id: *id,
                implementer: *implementer,
            })
            .collect();
        interfaces.sort_by(|a, b| {
            (a.resolver, &a.node, a.interface_id).cmp(&(b.resolver, &b.node, b.interface_id))
        });
        LedgerSnapshot {
            signer: self.signer,
            deployments: state.deployments.clone(),
            owners: state.owners.iter().map(|(n, a)| (key(n), *a)).collect(),
            resolvers: state.resolvers.iter().map(|(n, a)| (key(n), *a)).collect(),
            controllers: state
                .controllers
                .iter()
                .map(|(r, set)| (*r, set.iter().copied().collect()))
                .collect(),
            interfaces,
        }
    }

    /// Write the current state as a YAML snapshot
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(&self.snapshot())
            .map_err(|e| LedgerError::Snapshot(e.to_string()))?;
        std::fs::write(path, yaml)
            .map_err(|e| LedgerError::Snapshot(format!("{}: {}", path.display(), e)))
    }
}

fn snapshot_node(state: &mut LedgerState, key: &str) -> Result<NodeHash> {
    if key.starts_with("0x") && key.len() == 66 {
        return key
            .parse()
            .map_err(|e| LedgerError::Snapshot(format!("node {}: {}", key, e)));
    }
    let node = NamespaceNode::new(key)
        .map_err(|e| LedgerError::Snapshot(format!("node {}: {}", key, e)))?;
    state.names.insert(node.node(), node.path().to_string());
    Ok(node.node())
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn submit(&self, call: LedgerCall) -> Result<TxHandle> {
        let mut state = self.state();
        if !state.reachable {
            return Err(LedgerError::Unavailable("ledger unreachable".into()));
        }
        if let Some(rule) = state.rejections.iter().find(|r| (r.matcher)(&call)) {
            return Err(LedgerError::Rejected {
                reason: rule.reason.clone(),
            });
        }

        let tx = state.next_handle(&self.signer);
        state.events.push(LedgerEvent::Submitted {
            tx,
            call: call.clone(),
        });

        if state.stalls.iter().any(|m| m(&call)) {
            state.stalled.insert(tx);
            debug!(tx = %tx, call = %call, "Transaction stalled");
            return Ok(tx);
        }

        let revert = state
            .reverts
            .iter()
            .find(|r| (r.matcher)(&call))
            .map(|r| r.reason.clone());
        let result = match revert {
            Some(reason) => Err(reason),
            None => state.execute(&self.signer, &tx, &call),
        };

        state.block += 1;
        let outcome = match result {
            Ok(contract_address) => TxOutcome::Confirmed(Receipt {
                tx,
                block: state.block,
                contract_address,
            }),
            Err(reason) => TxOutcome::Reverted { tx, reason },
        };
        debug!(tx = %tx, call = %call, outcome = ?outcome, "Transaction executed");
        state.outcomes.insert(tx, outcome);
        Ok(tx)
    }

    async fn wait(&self, tx: &TxHandle) -> Result<TxOutcome> {
        let outcome = {
            let mut state = self.state();
            if !state.reachable {
                return Err(LedgerError::Unavailable("ledger unreachable".into()));
            }
            if state.stalled.contains(tx) {
                None
            } else {
                let outcome = state
                    .outcomes
                    .get(tx)
                    .cloned()
                    .ok_or(LedgerError::UnknownTransaction(*tx))?;
                if state.observed.insert(*tx) {
                    let event = match &outcome {
                        TxOutcome::Confirmed(_) => LedgerEvent::Confirmed { tx: *tx },
                        TxOutcome::Reverted { reason, .. } => LedgerEvent::Reverted {
                            tx: *tx,
                            reason: reason.clone(),
                        },
                    };
                    state.events.push(event);
                }
                Some(outcome)
            }
        };

        match outcome {
            Some(outcome) => Ok(outcome),
            None => std::future::pending().await,
        }
    }

    async fn query(&self, read: ReadCall) -> Result<ReadValue> {
        let state = self.state();
        if !state.reachable {
            return Err(LedgerError::Unavailable("ledger unreachable".into()));
        }
        if let Some(rule) = state.read_failures.iter().find(|r| (r.matcher)(&read)) {
            return Err(LedgerError::Unavailable(rule.reason.clone()));
        }
        let address =
            |found: Option<&Address>| ReadValue::Address(found.copied().unwrap_or(Address::ZERO));
        Ok(match read {
            ReadCall::Owner { node } => address(state.owners.get(&node)),
            ReadCall::Resolver { node } => address(state.resolvers.get(&node)),
            ReadCall::Deployment { module } => match state.deployments.get(&module) {
                Some(addr) => ReadValue::Address(*addr),
                None => ReadValue::Missing,
            },
            ReadCall::IsController {
                registrar,
                controller,
            } => ReadValue::Bool(
                state
                    .controllers
                    .get(&registrar)
                    .map(|set| set.contains(&controller))
                    .unwrap_or(false),
            ),
            ReadCall::InterfaceImplementer {
                resolver,
                node,
                interface_id,
            } => address(state.interfaces.get(&(resolver, node, interface_id))),
        })
    }

    fn signer(&self) -> Address {
        self.signer
    }
}

/// Serializable ledger state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub signer: Address,
    #[serde(default)]
    pub deployments: BTreeMap<String, Address>,
    /// Keyed by path, or by `0x` node hash when the path is unknown
    #[serde(default)]
    pub owners: BTreeMap<String, Address>,
    #[serde(default)]
    pub resolvers: BTreeMap<String, Address>,
    #[serde(default)]
    pub controllers: BTreeMap<Address, Vec<Address>>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceEntry>,
}

/// One resolver interface record in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceEntry {
    pub resolver: Address,
    pub node: String,
    pub interface_id: InterfaceId,
    pub implementer: Address,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensd_types::{encode, labelhash};

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    #[tokio::test]
    async fn test_deploy_assigns_address_and_receipt() {
        let ledger = InMemoryLedger::new(addr(1));
        let tx = ledger
            .submit(LedgerCall::Deploy {
                module: "ENSRegistry".into(),
                args: vec![],
            })
            .await
            .unwrap();
        let outcome = ledger.wait(&tx).await.unwrap();
        let TxOutcome::Confirmed(receipt) = outcome else {
            panic!("deploy should confirm");
        };
        assert_eq!(receipt.contract_address, ledger.deployment("ENSRegistry"));
        assert!(receipt.contract_address.is_some());
    }

    #[tokio::test]
    async fn test_enable_node_sets_registrar_owner() {
        let ledger = InMemoryLedger::new(addr(1));
        ledger.set_deployment("DNSRegistrar", addr(9));
        let (_, wire) = encode("xyz").unwrap();
        let tx = ledger
            .submit(LedgerCall::EnableNode {
                registrar: addr(9),
                name: wire,
            })
            .await
            .unwrap();
        assert!(matches!(
            ledger.wait(&tx).await.unwrap(),
            TxOutcome::Confirmed(_)
        ));
        assert_eq!(ledger.owner_of("xyz"), Some(addr(9)));
    }

    #[tokio::test]
    async fn test_registry_subnode_requires_parent_ownership() {
        let ledger = InMemoryLedger::new(addr(1));
        ledger.set_deployment("ENSRegistry", addr(2));
        let call = LedgerCall::RegistrySetSubnodeOwner {
            registry: addr(2),
            parent: namehash("reverse").unwrap(),
            label: labelhash("addr"),
            owner: addr(5),
        };

        let tx = ledger.submit(call.clone()).await.unwrap();
        assert!(matches!(
            ledger.wait(&tx).await.unwrap(),
            TxOutcome::Reverted { .. }
        ));
        assert_eq!(ledger.owner_of("addr.reverse"), None);

        ledger.set_owner("reverse", addr(1)).unwrap();
        let tx = ledger.submit(call).await.unwrap();
        assert!(matches!(
            ledger.wait(&tx).await.unwrap(),
            TxOutcome::Confirmed(_)
        ));
        assert_eq!(ledger.owner_of("addr.reverse"), Some(addr(5)));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let ledger = InMemoryLedger::new(addr(1));
        ledger.reject_when(
            |c| matches!(c, LedgerCall::Deploy { module, .. } if module == "Bad"),
            "gas estimation failed",
        );
        ledger.revert_when(
            |c| matches!(c, LedgerCall::Deploy { module, .. } if module == "Reverts"),
            "constructor reverted",
        );

        let err = ledger
            .submit(LedgerCall::Deploy {
                module: "Bad".into(),
                args: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected { .. }));

        let tx = ledger
            .submit(LedgerCall::Deploy {
                module: "Reverts".into(),
                args: vec![],
            })
            .await
            .unwrap();
        assert!(matches!(
            ledger.wait(&tx).await.unwrap(),
            TxOutcome::Reverted { .. }
        ));
        assert_eq!(ledger.deployment("Reverts"), None);
        assert_eq!(ledger.submission_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_reads_only_match_their_calls() {
        let ledger = InMemoryLedger::new(addr(1));
        ledger.set_owner("xyz", addr(2)).unwrap();
        ledger.set_deployment("ENSRegistry", addr(3));
        let xyz = namehash("xyz").unwrap();
        ledger.fail_reads_when(
            move |r| matches!(r, ReadCall::Owner { node } if *node == xyz),
            "rpc timeout",
        );

        let err = ledger
            .query(ReadCall::Owner { node: xyz })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unavailable(ref reason) if reason == "rpc timeout"));
        assert_eq!(
            ledger
                .query(ReadCall::Deployment {
                    module: "ENSRegistry".into()
                })
                .await
                .unwrap(),
            ReadValue::Address(addr(3))
        );
    }

    #[tokio::test]
    async fn test_stalled_transaction_never_confirms() {
        let ledger = InMemoryLedger::new(addr(1));
        ledger.stall_when(|c| matches!(c, LedgerCall::Deploy { .. }));
        let tx = ledger
            .submit(LedgerCall::Deploy {
                module: "Slow".into(),
                args: vec![],
            })
            .await
            .unwrap();
        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(20), ledger.wait(&tx)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip_keeps_paths() {
        let ledger = InMemoryLedger::new(addr(1));
        ledger.set_deployment("DNSRegistrar", addr(9));
        ledger.set_owner("xyz", addr(9)).unwrap();
        ledger.set_resolver("eth", addr(4)).unwrap();
        ledger.add_controller(addr(3), addr(7));

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.owners.get("xyz"), Some(&addr(9)));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.yaml");
        ledger.save_snapshot(&path).unwrap();
        let restored = InMemoryLedger::load_snapshot(&path).unwrap();
        assert_eq!(restored.owner_of("xyz"), Some(addr(9)));
        assert_eq!(restored.deployment("DNSRegistrar"), Some(addr(9)));
        assert!(restored.is_controller(&addr(3), &addr(7)));
        assert_eq!(restored.snapshot(), snapshot);
    }

    #[tokio::test]
    async fn test_event_log_orders_submission_and_confirmation() {
        let ledger = InMemoryLedger::new(addr(1));
        let tx = ledger
            .submit(LedgerCall::Deploy {
                module: "A".into(),
                args: vec![],
            })
            .await
            .unwrap();
        ledger.wait(&tx).await.unwrap();
        ledger.wait(&tx).await.unwrap();
        let events = ledger.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], LedgerEvent::Submitted { .. }));
        assert_eq!(events[1], LedgerEvent::Confirmed { tx });
    }
}
