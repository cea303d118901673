//! Desired-state declarations
//!
//! A [`Declaration`] maps network names to ordered lists of
//! [`DesiredBinding`]s. It is the single source of truth for what should be
//! true on a ledger; the reconciler turns it into the minimal set of calls.

use crate::ids::{Address, IdParseError, InterfaceId};
use crate::name::NamespaceNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error parsing a reference written in a declaration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefParseError {
    #[error("empty {kind} reference")]
    Empty { kind: &'static str },

    #[error("unknown reference form: {0}")]
    Unknown(String),

    #[error(transparent)]
    Id(#[from] IdParseError),
}

/// An address as written in a declaration, resolved at run time
///
/// Textual forms: `0x…` literal, `account:<name>` named account,
/// `module:<name>` deployed module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AddressRef {
    Literal(Address),
    Account(String),
    Module(String),
}

impl AddressRef {
    pub fn module(name: impl Into<String>) -> Self {
        Self::Module(name.into())
    }

    pub fn account(name: impl Into<String>) -> Self {
        Self::Account(name.into())
    }
}

impl FromStr for AddressRef {
    type Err = RefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(name) = s.strip_prefix("module:") {
            if name.is_empty() {
                return Err(RefParseError::Empty { kind: "module" });
            }
            Ok(Self::Module(name.to_string()))
        } else if let Some(name) = s.strip_prefix("account:") {
            if name.is_empty() {
                return Err(RefParseError::Empty { kind: "account" });
            }
            Ok(Self::Account(name.to_string()))
        } else if s.starts_with("0x") || s.starts_with("0X") {
            Ok(Self::Literal(s.parse()?))
        } else {
            Err(RefParseError::Unknown(s.to_string()))
        }
    }
}

impl TryFrom<String> for AddressRef {
    type Error = RefParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AddressRef> for String {
    fn from(value: AddressRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for AddressRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressRef::Literal(addr) => write!(f, "{}", addr),
            AddressRef::Account(name) => write!(f, "account:{}", name),
            AddressRef::Module(name) => write!(f, "module:{}", name),
        }
    }
}

/// Which contract carries out an ownership change
///
/// Textual forms: `root`, `registry`, `registrar:<module>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OwnershipRoute {
    /// `Root.setSubnodeOwner(labelhash, owner)`, top-level labels only
    Root,
    /// `Registry.setSubnodeOwner(parent, labelhash, owner)`
    Registry,
    /// `registrar.enableNode(wire)`; the registrar itself becomes owner
    Registrar(AddressRef),
}

impl FromStr for OwnershipRoute {
    type Err = RefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(Self::Root),
            "registry" => Ok(Self::Registry),
            other => match other.strip_prefix("registrar:") {
                Some(rest) if rest.starts_with("0x") || rest.contains(':') => {
                    Ok(Self::Registrar(rest.parse()?))
                }
                Some("") => Err(RefParseError::Empty { kind: "registrar" }),
                Some(name) => Ok(Self::Registrar(AddressRef::module(name))),
                None => Err(RefParseError::Unknown(other.to_string())),
            },
        }
    }
}

impl TryFrom<String> for OwnershipRoute {
    type Error = RefParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OwnershipRoute> for String {
    fn from(value: OwnershipRoute) -> Self {
        value.to_string()
    }
}

impl fmt::Display for OwnershipRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnershipRoute::Root => write!(f, "root"),
            OwnershipRoute::Registry => write!(f, "registry"),
            OwnershipRoute::Registrar(AddressRef::Module(name)) => {
                write!(f, "registrar:{}", name)
            }
            OwnershipRoute::Registrar(other) => write!(f, "registrar:{}", other),
        }
    }
}

/// Where an interface identifier comes from
///
/// Textual forms: `0x…` (4 bytes) or `artifact:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InterfaceSource {
    Literal(InterfaceId),
    /// Computed from the function signatures of an artifact
    Artifact(String),
}

impl FromStr for InterfaceSource {
    type Err = RefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(name) = s.strip_prefix("artifact:") {
            if name.is_empty() {
                return Err(RefParseError::Empty { kind: "artifact" });
            }
            Ok(Self::Artifact(name.to_string()))
        } else if s.starts_with("0x") {
            Ok(Self::Literal(s.parse()?))
        } else {
            Err(RefParseError::Unknown(s.to_string()))
        }
    }
}

impl TryFrom<String> for InterfaceSource {
    type Error = RefParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InterfaceSource> for String {
    fn from(value: InterfaceSource) -> Self {
        value.to_string()
    }
}

impl fmt::Display for InterfaceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceSource::Literal(id) => write!(f, "{}", id),
            InterfaceSource::Artifact(name) => write!(f, "artifact:{}", name),
        }
    }
}

/// Category of a mutating call, used for policy decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// Transfer of an existing node to a new owner
    OwnershipTransfer,
    /// Creation or reassignment of a subnode under a parent
    SubnodeCreation,
    /// Granting a contract controller rights on a registrar
    ControllerGrant,
    /// Binding an interface implementer on a resolver
    InterfaceBinding,
}

impl MutationKind {
    /// Whether this kind of mutation must be withheld on frozen networks
    pub fn is_irreversible(&self) -> bool {
        match self {
            MutationKind::OwnershipTransfer
            | MutationKind::SubnodeCreation
            | MutationKind::ControllerGrant
            | MutationKind::InterfaceBinding => true,
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::OwnershipTransfer => write!(f, "ownership-transfer"),
            MutationKind::SubnodeCreation => write!(f, "subnode-creation"),
            MutationKind::ControllerGrant => write!(f, "controller-grant"),
            MutationKind::InterfaceBinding => write!(f, "interface-binding"),
        }
    }
}

/// Target state for a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BindingTarget {
    /// The node is owned by `owner`, changed through `via`
    Owner { owner: AddressRef, via: OwnershipRoute },

    /// `controller` is a controller of `registrar`
    Controller {
        registrar: AddressRef,
        controller: AddressRef,
    },

    /// The node's resolver advertises `interface` as implemented by `implementer`
    Interface {
        interface: InterfaceSource,
        implementer: AddressRef,
    },
}

impl BindingTarget {
    pub fn mutation_kind(&self) -> MutationKind {
        match self {
            BindingTarget::Owner {
                via: OwnershipRoute::Registrar(_),
                ..
            } => MutationKind::OwnershipTransfer,
            BindingTarget::Owner { .. } => MutationKind::SubnodeCreation,
            BindingTarget::Controller { .. } => MutationKind::ControllerGrant,
            BindingTarget::Interface { .. } => MutationKind::InterfaceBinding,
        }
    }
}

/// A node paired with the state it should have
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredBinding {
    pub node: NamespaceNode,
    #[serde(flatten)]
    pub target: BindingTarget,
}

impl DesiredBinding {
    pub fn owner(node: NamespaceNode, owner: AddressRef, via: OwnershipRoute) -> Self {
        Self {
            node,
            target: BindingTarget::Owner { owner, via },
        }
    }

    pub fn controller(node: NamespaceNode, registrar: AddressRef, controller: AddressRef) -> Self {
        Self {
            node,
            target: BindingTarget::Controller {
                registrar,
                controller,
            },
        }
    }

    pub fn interface(
        node: NamespaceNode,
        interface: InterfaceSource,
        implementer: AddressRef,
    ) -> Self {
        Self {
            node,
            target: BindingTarget::Interface {
                interface,
                implementer,
            },
        }
    }

    pub fn mutation_kind(&self) -> MutationKind {
        self.target.mutation_kind()
    }

    /// Short subject line used in diagnostics
    pub fn subject(&self) -> String {
        match &self.target {
            BindingTarget::Owner { .. } => format!("{} owner", self.node),
            BindingTarget::Controller { controller, .. } => {
                format!("{} controller {}", self.node, controller)
            }
            BindingTarget::Interface { interface, .. } => {
                format!("{} interface {}", self.node, interface)
            }
        }
    }
}

/// Per-network desired bindings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// Bindings keyed by network name
    #[serde(default)]
    pub networks: BTreeMap<String, Vec<DesiredBinding>>,

    /// Bindings for networks without their own entry
    #[serde(default)]
    pub fallback: Vec<DesiredBinding>,
}

impl Declaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declaration whose bindings apply on every network
    pub fn everywhere(bindings: Vec<DesiredBinding>) -> Self {
        Self {
            networks: BTreeMap::new(),
            fallback: bindings,
        }
    }

    pub fn with_network(mut self, network: impl Into<String>, bindings: Vec<DesiredBinding>) -> Self {
        self.networks.insert(network.into(), bindings);
        self
    }

    /// Bindings in effect on `network`; empty when nothing is declared for it
    pub fn bindings_for(&self, network: &str) -> &[DesiredBinding] {
        self.networks
            .get(network)
            .map(Vec::as_slice)
            .unwrap_or(&self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(path: &str) -> NamespaceNode {
        NamespaceNode::new(path).unwrap()
    }

    #[test]
    fn test_address_ref_forms() {
        assert_eq!(
            "module:NameWrapper".parse::<AddressRef>().unwrap(),
            AddressRef::module("NameWrapper")
        );
        assert_eq!(
            "account:deployer".parse::<AddressRef>().unwrap(),
            AddressRef::account("deployer")
        );
        assert!(matches!(
            "0x57f1887a8bf19b14fc0df6fd9b2acc9af147ea85".parse::<AddressRef>(),
            Ok(AddressRef::Literal(_))
        ));
        assert!(matches!(
            "module:".parse::<AddressRef>(),
            Err(RefParseError::Empty { .. })
        ));
        assert!(matches!(
            "deployer".parse::<AddressRef>(),
            Err(RefParseError::Unknown(_))
        ));
    }

    #[test]
    fn test_route_forms() {
        assert_eq!("root".parse::<OwnershipRoute>().unwrap(), OwnershipRoute::Root);
        assert_eq!(
            "registrar:DNSRegistrar".parse::<OwnershipRoute>().unwrap(),
            OwnershipRoute::Registrar(AddressRef::module("DNSRegistrar"))
        );
        assert_eq!(
            OwnershipRoute::Registrar(AddressRef::module("DNSRegistrar")).to_string(),
            "registrar:DNSRegistrar"
        );
        assert!("sideways".parse::<OwnershipRoute>().is_err());
    }

    #[test]
    fn test_mutation_kinds() {
        let tld = DesiredBinding::owner(
            node("xyz"),
            AddressRef::module("DNSRegistrar"),
            OwnershipRoute::Registrar(AddressRef::module("DNSRegistrar")),
        );
        assert_eq!(tld.mutation_kind(), MutationKind::OwnershipTransfer);

        let sub = DesiredBinding::owner(
            node("addr.reverse"),
            AddressRef::module("ReverseRegistrar"),
            OwnershipRoute::Registry,
        );
        assert_eq!(sub.mutation_kind(), MutationKind::SubnodeCreation);
        assert!(sub.mutation_kind().is_irreversible());
    }

    #[test]
    fn test_every_mutation_kind_is_irreversible() {
        for kind in [
            MutationKind::OwnershipTransfer,
            MutationKind::SubnodeCreation,
            MutationKind::ControllerGrant,
            MutationKind::InterfaceBinding,
        ] {
            assert!(kind.is_irreversible(), "{}", kind);
        }
    }

    #[test]
    fn test_bindings_for_network_and_fallback() {
        let xyz = DesiredBinding::owner(
            node("xyz"),
            AddressRef::module("DNSRegistrar"),
            OwnershipRoute::Registrar(AddressRef::module("DNSRegistrar")),
        );
        let decl = Declaration::new().with_network("mainnet", vec![xyz.clone()]);
        assert_eq!(decl.bindings_for("mainnet"), &[xyz.clone()]);
        assert!(decl.bindings_for("sepolia").is_empty());

        let everywhere = Declaration::everywhere(vec![xyz.clone()]);
        assert_eq!(everywhere.bindings_for("anything").len(), 1);
    }

    #[test]
    fn test_declaration_from_yaml() {
        let yaml = r#"
networks:
  hardhat:
    - node: xyz
      kind: owner
      owner: module:DNSRegistrar
      via: registrar:DNSRegistrar
fallback:
  - node: eth
    kind: interface
    interface: artifact:INameWrapper
    implementer: module:NameWrapper
  - node: eth
    kind: controller
    registrar: module:BaseRegistrarImplementation
    controller: module:NameWrapper
"#;
        let decl: Declaration = serde_yaml::from_str(yaml).unwrap();
        let hardhat = decl.bindings_for("hardhat");
        assert_eq!(hardhat.len(), 1);
        assert_eq!(hardhat[0].node.path(), "xyz");
        assert_eq!(hardhat[0].mutation_kind(), MutationKind::OwnershipTransfer);

        let other = decl.bindings_for("goerli");
        assert_eq!(other.len(), 2);
        assert_eq!(
            other[0].target,
            BindingTarget::Interface {
                interface: InterfaceSource::Artifact("INameWrapper".into()),
                implementer: AddressRef::module("NameWrapper"),
            }
        );
        assert_eq!(other[1].mutation_kind(), MutationKind::ControllerGrant);
    }

    #[test]
    fn test_subject_lines() {
        let b = DesiredBinding::owner(node("reverse"), AddressRef::account("deployer"), OwnershipRoute::Root);
        assert_eq!(b.subject(), "reverse owner");
    }
}
