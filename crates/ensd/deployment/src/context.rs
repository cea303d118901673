//! Run context
//!
//! Everything shared by the stages of one run: the network profile, the
//! ledger client and reader, the policy guard, named accounts and the module
//! records produced so far. Module records are the only state that changes
//! during a run, and each is written once.

use crate::error::ResolveError;
use dashmap::DashMap;
use ensd_ledger::{ArtifactRepository, InterfaceIdComputer, LedgerClient, LedgerStateReader};
use ensd_policy::NetworkPolicyGuard;
use ensd_types::{
    namehash, Address, AddressRef, ConstructorArg, ModuleRecord, NetworkProfile, Token,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Account name that falls back to the client's signer when not configured
pub const DEPLOYER_ACCOUNT: &str = "deployer";

/// Default time to wait for a single confirmation
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Whether mutations are submitted or only reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Apply,
    DryRun,
}

impl RunMode {
    pub fn is_dry_run(&self) -> bool {
        matches!(self, RunMode::DryRun)
    }
}

/// Named accounts available to declarations as `account:<name>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamedAccounts(BTreeMap<String, Address>);

impl NamedAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, address: Address) -> Self {
        self.0.insert(name.into(), address);
        self
    }

    pub fn get(&self, name: &str) -> Option<Address> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Address)> {
        self.0.iter()
    }
}

#[derive(Debug, Clone)]
enum ModuleEntry {
    Ready(ModuleRecord),
    /// Would be deployed by this dry run
    Pending,
}

/// Shared state of a single run
pub struct RunContext {
    network: NetworkProfile,
    mode: RunMode,
    client: Arc<dyn LedgerClient>,
    reader: LedgerStateReader,
    guard: NetworkPolicyGuard,
    accounts: NamedAccounts,
    interfaces: Option<InterfaceIdComputer>,
    confirmation_timeout: Duration,
    modules: DashMap<String, ModuleEntry>,
}

impl RunContext {
    pub fn new(
        network: &str,
        client: Arc<dyn LedgerClient>,
        guard: NetworkPolicyGuard,
    ) -> Self {
        Self {
            network: guard.classify(network),
            mode: RunMode::Apply,
            reader: LedgerStateReader::new(client.clone()),
            client,
            guard,
            accounts: NamedAccounts::default(),
            interfaces: None,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            modules: DashMap::new(),
        }
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_accounts(mut self, accounts: NamedAccounts) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_artifacts(mut self, artifacts: Arc<dyn ArtifactRepository>) -> Self {
        self.interfaces = Some(InterfaceIdComputer::new(artifacts));
        self
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn network(&self) -> &NetworkProfile {
        &self.network
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn client(&self) -> &Arc<dyn LedgerClient> {
        &self.client
    }

    pub fn reader(&self) -> &LedgerStateReader {
        &self.reader
    }

    pub fn guard(&self) -> &NetworkPolicyGuard {
        &self.guard
    }

    pub fn interfaces(&self) -> Option<&InterfaceIdComputer> {
        self.interfaces.as_ref()
    }

    pub fn confirmation_timeout(&self) -> Duration {
        self.confirmation_timeout
    }

    // ── Module records ───────────────────────────────────────────────

    /// The record created for `module` in this run, with its original fresh flag
    pub fn module(&self, module: &str) -> Option<ModuleRecord> {
        match self.modules.get(module).as_deref() {
            Some(ModuleEntry::Ready(record)) => Some(record.clone()),
            _ => None,
        }
    }

    pub fn is_pending(&self, module: &str) -> bool {
        matches!(self.modules.get(module).as_deref(), Some(ModuleEntry::Pending))
    }

    /// Whether `module` was deployed by this run
    pub fn was_freshly_deployed(&self, module: &str) -> bool {
        self.module(module)
            .map(|r| r.freshly_deployed)
            .unwrap_or(false)
    }

    /// Store the first record for a module; later records are ignored
    pub(crate) fn record_module(&self, record: ModuleRecord) {
        self.modules
            .entry(record.name.clone())
            .or_insert(ModuleEntry::Ready(record));
    }

    pub(crate) fn mark_pending(&self, module: &str) {
        self.modules
            .entry(module.to_string())
            .or_insert(ModuleEntry::Pending);
    }

    /// Every module recorded so far, ordered by name
    pub fn modules(&self) -> Vec<ModuleRecord> {
        let mut records: Vec<ModuleRecord> = self
            .modules
            .iter()
            .filter_map(|entry| match entry.value() {
                ModuleEntry::Ready(record) => Some(record.clone()),
                ModuleEntry::Pending => None,
            })
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    // ── Reference resolution ─────────────────────────────────────────

    pub fn account(&self, name: &str) -> Result<Address, ResolveError> {
        match self.accounts.get(name) {
            Some(address) => Ok(address),
            None if name == DEPLOYER_ACCOUNT => Ok(self.client.signer()),
            None => Err(ResolveError::UnknownAccount(name.to_string())),
        }
    }

    /// Address of a module, from this run's records or else the ledger
    pub async fn module_address(&self, module: &str) -> Result<Address, ResolveError> {
        let entry = self.modules.get(module).map(|e| e.value().clone());
        match entry {
            Some(ModuleEntry::Ready(record)) => return Ok(record.address),
            Some(ModuleEntry::Pending) => {
                return Err(ResolveError::ModulePending(module.to_string()))
            }
            None => {}
        }
        self.reader
            .deployed_address(module)
            .await?
            .ok_or_else(|| ResolveError::ModuleNotDeployed(module.to_string()))
    }

    pub async fn resolve_address(&self, reference: &AddressRef) -> Result<Address, ResolveError> {
        match reference {
            AddressRef::Literal(address) => Ok(*address),
            AddressRef::Account(name) => self.account(name),
            AddressRef::Module(name) => self.module_address(name).await,
        }
    }

    /// Turn a declared constructor argument into a call token
    pub async fn resolve_arg(&self, arg: &ConstructorArg) -> Result<Token, ResolveError> {
        Ok(match arg {
            ConstructorArg::Address(reference) => {
                Token::Address(self.resolve_address(reference).await?)
            }
            ConstructorArg::Node(path) => {
                Token::Bytes32(namehash(path).map_err(|e| ResolveError::InvalidNode {
                    path: path.clone(),
                    reason: e.to_string(),
                })?)
            }
            ConstructorArg::Uint(n) => Token::Uint(*n),
            ConstructorArg::Bytes(bytes) => Token::Bytes(bytes.clone()),
            ConstructorArg::Str(s) => Token::String(s.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensd_ledger::InMemoryLedger;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn context(ledger: &Arc<InMemoryLedger>) -> RunContext {
        RunContext::new("hardhat", ledger.clone(), NetworkPolicyGuard::default())
    }

    #[tokio::test]
    async fn test_deployer_account_defaults_to_signer() {
        let ledger = Arc::new(InMemoryLedger::new(addr(1)));
        let ctx = context(&ledger);
        assert_eq!(ctx.account(DEPLOYER_ACCOUNT).unwrap(), addr(1));
        assert!(matches!(
            ctx.account("owner"),
            Err(ResolveError::UnknownAccount(_))
        ));

        let ctx = context(&ledger).with_accounts(NamedAccounts::new().with("deployer", addr(4)));
        assert_eq!(ctx.account("deployer").unwrap(), addr(4));
    }

    #[tokio::test]
    async fn test_module_resolution_prefers_run_records() {
        let ledger = Arc::new(InMemoryLedger::new(addr(1)));
        ledger.set_deployment("ENSRegistry", addr(2));
        let ctx = context(&ledger);

        let registry = AddressRef::module("ENSRegistry");
        assert_eq!(ctx.resolve_address(&registry).await.unwrap(), addr(2));
        assert!(matches!(
            ctx.resolve_address(&AddressRef::module("Root")).await,
            Err(ResolveError::ModuleNotDeployed(_))
        ));

        ctx.record_module(ModuleRecord::existing("Root", addr(3)));
        assert_eq!(
            ctx.resolve_address(&AddressRef::module("Root")).await.unwrap(),
            addr(3)
        );

        ctx.mark_pending("NameWrapper");
        assert!(matches!(
            ctx.resolve_address(&AddressRef::module("NameWrapper")).await,
            Err(ResolveError::ModulePending(_))
        ));
    }

    #[tokio::test]
    async fn test_first_record_wins() {
        let ledger = Arc::new(InMemoryLedger::new(addr(1)));
        let ctx = context(&ledger);
        let record = ModuleRecord::deployed("NameWrapper", addr(5), ensd_types::TxHandle::ZERO);
        ctx.record_module(record.clone());
        ctx.record_module(record.seen_again());
        assert!(ctx.was_freshly_deployed("NameWrapper"));
        assert_eq!(ctx.modules(), vec![record]);
    }

    #[tokio::test]
    async fn test_resolve_constructor_args() {
        let ledger = Arc::new(InMemoryLedger::new(addr(1)));
        ledger.set_deployment("ENSRegistry", addr(2));
        let ctx = context(&ledger);

        let args: Vec<ConstructorArg> = vec![
            "module:ENSRegistry".parse().unwrap(),
            "node:eth".parse().unwrap(),
            "0x57f1887a8bf19b14fc0df6fd9b2acc9af147ea85".parse().unwrap(),
            "uint:7".parse().unwrap(),
            "https://ens.domains/name/{id}".parse().unwrap(),
        ];
        let mut tokens = Vec::new();
        for arg in &args {
            tokens.push(ctx.resolve_arg(arg).await.unwrap());
        }
        assert_eq!(tokens[0], Token::Address(addr(2)));
        assert_eq!(tokens[1], Token::Bytes32(namehash("eth").unwrap()));
        assert!(matches!(tokens[2], Token::Address(_)));
        assert_eq!(tokens[3], Token::Uint(7));
        assert!(matches!(tokens[4], Token::String(_)));
    }

    #[tokio::test]
    async fn test_unreachable_ledger_is_not_treated_as_missing() {
        let ledger = Arc::new(InMemoryLedger::new(addr(1)));
        ledger.set_reachable(false);
        let ctx = context(&ledger);
        assert!(matches!(
            ctx.module_address("ENSRegistry").await,
            Err(ResolveError::Read(_))
        ));
    }
}
