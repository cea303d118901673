//! Deployable modules and their constructor arguments

use crate::binding::{AddressRef, RefParseError};
use crate::ids::{Address, NodeHash, TxHandle};
use crate::name::{namehash, NameError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A module as known within a single run
///
/// Created once per run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Module name, e.g. `NameWrapper`
    pub name: String,
    /// Deployed address
    pub address: Address,
    /// Whether this run submitted the deployment
    pub freshly_deployed: bool,
    /// Deployment transaction, when freshly deployed
    pub tx: Option<TxHandle>,
}

impl ModuleRecord {
    pub fn existing(name: impl Into<String>, address: Address) -> Self {
        Self {
            name: name.into(),
            address,
            freshly_deployed: false,
            tx: None,
        }
    }

    pub fn deployed(name: impl Into<String>, address: Address, tx: TxHandle) -> Self {
        Self {
            name: name.into(),
            address,
            freshly_deployed: true,
            tx: Some(tx),
        }
    }

    /// The same module as seen by a later caller in the same run
    pub fn seen_again(&self) -> Self {
        Self {
            freshly_deployed: false,
            ..self.clone()
        }
    }
}

/// Constructor argument as declared
///
/// Textual forms: `module:<name>`, `account:<name>`, `0x…` (20 bytes is an
/// address, anything else raw bytes), `node:<path>`, `uint:<n>`, `str:<text>`;
/// any other text is a string argument. Strings that start with one of these
/// prefixes are written with `str:`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ConstructorArg {
    Address(AddressRef),
    Node(String),
    Uint(u128),
    Bytes(Vec<u8>),
    Str(String),
}

/// Constructor argument error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgParseError {
    #[error(transparent)]
    Ref(#[from] RefParseError),

    #[error(transparent)]
    Name(#[from] NameError),

    #[error("invalid integer {0:?}")]
    Uint(String),

    #[error("invalid hex bytes {0:?}")]
    Bytes(String),
}

const RESERVED_PREFIXES: [&str; 6] = ["module:", "account:", "node:", "uint:", "0x", "str:"];

impl FromStr for ConstructorArg {
    type Err = ArgParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(text) = s.strip_prefix("str:") {
            return Ok(Self::Str(text.to_string()));
        }
        if s.starts_with("module:") || s.starts_with("account:") {
            return Ok(Self::Address(s.parse()?));
        }
        if let Some(path) = s.strip_prefix("node:") {
            namehash(path)?;
            return Ok(Self::Node(path.to_string()));
        }
        if let Some(n) = s.strip_prefix("uint:") {
            return n
                .parse()
                .map(Self::Uint)
                .map_err(|_| ArgParseError::Uint(n.to_string()));
        }
        if let Some(digits) = s.strip_prefix("0x") {
            if digits.len() == 40 {
                return Ok(Self::Address(s.parse()?));
            }
            return hex::decode(digits)
                .map(Self::Bytes)
                .map_err(|_| ArgParseError::Bytes(s.to_string()));
        }
        Ok(Self::Str(s.to_string()))
    }
}

impl TryFrom<String> for ConstructorArg {
    type Error = ArgParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConstructorArg> for String {
    fn from(value: ConstructorArg) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ConstructorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructorArg::Address(r) => write!(f, "{}", r),
            ConstructorArg::Node(path) => write!(f, "node:{}", path),
            ConstructorArg::Uint(n) => write!(f, "uint:{}", n),
            ConstructorArg::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            ConstructorArg::Str(s) if RESERVED_PREFIXES.iter().any(|p| s.starts_with(p)) => {
                write!(f, "str:{}", s)
            }
            ConstructorArg::Str(s) => write!(f, "{}", s),
        }
    }
}

/// A constructor argument after references are resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Token {
    Address(Address),
    Bytes32(NodeHash),
    Uint(u128),
    Bytes(Vec<u8>),
    String(String),
}
