//! Calls exchanged with the ledger client
//!
//! The engine never builds raw transactions. It describes what it wants with
//! a [`LedgerCall`] (mutating) or a [`ReadCall`] (read-only) and leaves
//! encoding, signing and broadcast to the client.

use ensd_types::{decode_wire, Address, InterfaceId, NodeHash, Token, TxHandle};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A mutating call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum LedgerCall {
    /// Deploy a module with resolved constructor arguments
    Deploy { module: String, args: Vec<Token> },

    /// `Root.setSubnodeOwner(label, owner)`
    RootSetSubnodeOwner {
        root: Address,
        label: [u8; 32],
        owner: Address,
    },

    /// `Registry.setSubnodeOwner(parent, label, owner)`
    RegistrySetSubnodeOwner {
        registry: Address,
        parent: NodeHash,
        label: [u8; 32],
        owner: Address,
    },

    /// `DNSRegistrar.enableNode(name)`
    EnableNode { registrar: Address, name: Vec<u8> },

    /// `BaseRegistrar.addController(controller)`
    AddController {
        registrar: Address,
        controller: Address,
    },

    /// `Resolver.setInterface(node, interfaceId, implementer)`
    SetInterface {
        resolver: Address,
        node: NodeHash,
        interface_id: InterfaceId,
        implementer: Address,
    },
}

impl LedgerCall {
    /// Short method name for logs
    pub fn method(&self) -> &'static str {
        match self {
            LedgerCall::Deploy { .. } => "deploy",
            LedgerCall::RootSetSubnodeOwner { .. } => "Root.setSubnodeOwner",
            LedgerCall::RegistrySetSubnodeOwner { .. } => "Registry.setSubnodeOwner",
            LedgerCall::EnableNode { .. } => "DNSRegistrar.enableNode",
            LedgerCall::AddController { .. } => "BaseRegistrar.addController",
            LedgerCall::SetInterface { .. } => "Resolver.setInterface",
        }
    }
}

impl fmt::Display for LedgerCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerCall::Deploy { module, args } => {
                write!(f, "deploy {} ({} args)", module, args.len())
            }
            LedgerCall::RootSetSubnodeOwner { label, owner, .. } => write!(
                f,
                "Root.setSubnodeOwner(0x{}, {})",
                hex::encode(label),
                owner
            ),
            LedgerCall::RegistrySetSubnodeOwner {
                parent,
                label,
                owner,
                ..
            } => write!(
                f,
                "Registry.setSubnodeOwner({}, 0x{}, {})",
                parent,
                hex::encode(label),
                owner
            ),
            LedgerCall::EnableNode { registrar, name } => match decode_wire(name) {
                Ok(path) => write!(f, "{}.enableNode({})", registrar, path),
                Err(_) => write!(f, "{}.enableNode(0x{})", registrar, hex::encode(name)),
            },
            LedgerCall::AddController {
                registrar,
                controller,
            } => write!(f, "{}.addController({})", registrar, controller),
            LedgerCall::SetInterface {
                resolver,
                node,
                interface_id,
                implementer,
            } => write!(
                f,
                "{}.setInterface({}, {}, {})",
                resolver, node, interface_id, implementer
            ),
        }
    }
}

/// A read-only query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum ReadCall {
    /// `Registry.owner(node)`
    Owner { node: NodeHash },
    /// `Registry.resolver(node)`
    Resolver { node: NodeHash },
    /// Address of a named deployment, if any
    Deployment { module: String },
    /// `BaseRegistrar.controllers(controller)`
    IsController {
        registrar: Address,
        controller: Address,
    },
    /// `Resolver.interfaceImplementer(node, interfaceId)`
    InterfaceImplementer {
        resolver: Address,
        node: NodeHash,
        interface_id: InterfaceId,
    },
}

impl fmt::Display for ReadCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadCall::Owner { node } => write!(f, "owner({})", node),
            ReadCall::Resolver { node } => write!(f, "resolver({})", node),
            ReadCall::Deployment { module } => write!(f, "deployment({})", module),
            ReadCall::IsController {
                registrar,
                controller,
            } => write!(f, "{}.controllers({})", registrar, controller),
            ReadCall::InterfaceImplementer {
                resolver,
                node,
                interface_id,
            } => write!(
                f,
                "{}.interfaceImplementer({}, {})",
                resolver, node, interface_id
            ),
        }
    }
}

/// Response to a [`ReadCall`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadValue {
    Address(Address),
    Bool(bool),
    /// Nothing recorded (e.g. no deployment under that name)
    Missing,
}

/// Confirmation details of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx: TxHandle,
    pub block: u64,
    /// Set for deployments
    pub contract_address: Option<Address>,
}

/// Final outcome of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    Confirmed(Receipt),
    Reverted { tx: TxHandle, reason: String },
}

impl TxOutcome {
    pub fn tx(&self) -> TxHandle {
        match self {
            TxOutcome::Confirmed(receipt) => receipt.tx,
            TxOutcome::Reverted { tx, .. } => *tx,
        }
    }
}
