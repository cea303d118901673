//! Name encoding for the naming registry
//!
//! A namespace path such as `addr.reverse` has two on-ledger forms:
//!
//! - its node identifier, the recursive namehash over the label hierarchy
//! - its wire form, DNS length-prefixed labels terminated by a zero byte
//!
//! Both are pure functions of the path.

use crate::ids::NodeHash;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use thiserror::Error;

/// Longest label the wire encoding can carry
pub const MAX_LABEL_LEN: usize = 63;

/// Name encoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("empty label in name: {0:?}")]
    EmptyLabel(String),

    #[error("label {label:?} is {len} bytes, maximum is {MAX_LABEL_LEN}")]
    LabelTooLong { label: String, len: usize },

    #[error("malformed wire name: {0}")]
    MalformedWire(String),
}

/// Keccak-256 digest
pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    Keccak256::digest(data.as_ref()).into()
}

/// Hash of a single label, as taken by subnode calls
pub fn labelhash(label: &str) -> [u8; 32] {
    keccak256(label.as_bytes())
}

fn labels(path: &str) -> Result<Vec<&str>, NameError> {
    let trimmed = path.strip_suffix('.').unwrap_or(path);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    trimmed
        .split('.')
        .map(|label| {
            if label.is_empty() {
                Err(NameError::EmptyLabel(path.to_string()))
            } else if label.len() > MAX_LABEL_LEN {
                Err(NameError::LabelTooLong {
                    label: label.to_string(),
                    len: label.len(),
                })
            } else {
                Ok(label)
            }
        })
        .collect()
}

/// Encode a path into its node identifier and wire bytes
pub fn encode(path: &str) -> Result<(NodeHash, Vec<u8>), NameError> {
    let labels = labels(path)?;

    let mut node = [0u8; 32];
    for label in labels.iter().rev() {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&node);
        buf[32..].copy_from_slice(&labelhash(label));
        node = keccak256(buf);
    }

    let mut wire = Vec::with_capacity(path.len() + 2);
    for label in &labels {
        // label length bounded by MAX_LABEL_LEN above
        wire.push(label.len() as u8);
        wire.extend_from_slice(label.as_bytes());
    }
    wire.push(0);

    Ok((NodeHash::from_bytes(node), wire))
}

/// Decode wire bytes back into a dotted path
pub fn decode_wire(wire: &[u8]) -> Result<String, NameError> {
    let mut labels = Vec::new();
    let mut pos = 0;
    loop {
        let len = *wire
            .get(pos)
            .ok_or_else(|| NameError::MalformedWire("missing terminator".into()))?
            as usize;
        pos += 1;
        if len == 0 {
            break;
        }
        let label = wire
            .get(pos..pos + len)
            .ok_or_else(|| NameError::MalformedWire("label overruns buffer".into()))?;
        let label = std::str::from_utf8(label)
            .map_err(|e| NameError::MalformedWire(e.to_string()))?;
        labels.push(label);
        pos += len;
    }
    if pos != wire.len() {
        return Err(NameError::MalformedWire("trailing bytes".into()));
    }
    Ok(labels.join("."))
}

/// Namehash of a path
pub fn namehash(path: &str) -> Result<NodeHash, NameError> {
    encode(path).map(|(node, _)| node)
}

/// A node in the naming hierarchy, with its derived identifiers
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamespaceNode {
    path: String,
    node: NodeHash,
    wire: Vec<u8>,
}

impl NamespaceNode {
    /// Parse and encode a path
    pub fn new(path: impl Into<String>) -> Result<Self, NameError> {
        let mut path = path.into();
        let (node, wire) = encode(&path)?;
        if path.ends_with('.') {
            path.pop();
        }
        Ok(Self { path, node, wire })
    }

    /// The registry root
    pub fn root() -> Self {
        Self {
            path: String::new(),
            node: NodeHash::ZERO,
            wire: vec![0],
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn node(&self) -> NodeHash {
        self.node
    }

    pub fn wire(&self) -> &[u8] {
        &self.wire
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Leftmost label, `None` for the root
    pub fn label(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.path.split('.').next()
        }
    }

    /// Hash of the leftmost label
    pub fn label_hash(&self) -> Option<[u8; 32]> {
        self.label().map(labelhash)
    }

    /// Number of labels in the path
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.path.split('.').count()
        }
    }

    /// Parent node, `None` for the root
    pub fn parent(&self) -> Option<NamespaceNode> {
        if self.is_root() {
            return None;
        }
        match self.path.split_once('.') {
            // Suffix of an already-validated path cannot fail encoding
            Some((_, rest)) => NamespaceNode::new(rest).ok(),
            None => Some(NamespaceNode::root()),
        }
    }
}

impl TryFrom<String> for NamespaceNode {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NamespaceNode> for String {
    fn from(value: NamespaceNode) -> Self {
        value.path
    }
}

impl fmt::Display for NamespaceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "[root]")
        } else {
            write!(f, "{}", self.path)
        }
    }
}

impl fmt::Debug for NamespaceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NamespaceNode({} {})", self.path, self.node)
    }
}
