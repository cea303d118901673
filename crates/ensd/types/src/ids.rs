//! Strongly-typed identifiers for ledger entities
//!
//! Fixed-width byte identifiers are wrapped in newtype structs and travel as
//! `0x`-prefixed lowercase hex in configuration, snapshots and reports.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error parsing a hex identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("missing 0x prefix: {0}")]
    MissingPrefix(String),

    #[error("invalid hex in {input}: {reason}")]
    InvalidHex { input: String, reason: String },

    #[error("expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

fn parse_fixed<const N: usize>(s: &str) -> Result<[u8; N], IdParseError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| IdParseError::MissingPrefix(s.to_string()))?;
    let bytes = hex::decode(digits).map_err(|e| IdParseError::InvalidHex {
        input: s.to_string(),
        reason: e.to_string(),
    })?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| IdParseError::WrongLength {
        expected: N,
        actual,
    })
}

macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const ZERO: Self = Self([0u8; $len]);

            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_fixed::<$len>(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

hex_id!(
    /// 20-byte account or contract address
    Address,
    20
);

hex_id!(
    /// 32-byte namespace node identifier (namehash)
    NodeHash,
    32
);

hex_id!(
    /// 4-byte capability identifier advertised through a resolver
    InterfaceId,
    4
);

hex_id!(
    /// Opaque handle of a submitted transaction (its hash)
    TxHandle,
    32
);

impl Address {
    /// Take the low 20 bytes of a 32-byte word, the way contract addresses are derived
    pub fn from_word(word: [u8; 32]) -> Self {
        let mut out = [0u8; 20];
        out.copy_from_slice(&word[12..]);
        Self(out)
    }
}

/// Unique identifier for a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip_display() {
        let addr: Address = "0x57f1887a8bf19b14fc0df6fd9b2acc9af147ea85".parse().unwrap();
        assert_eq!(
            addr.to_string(),
            "0x57f1887a8bf19b14fc0df6fd9b2acc9af147ea85"
        );
    }

    #[test]
    fn test_mixed_case_address_is_normalised() {
        let addr: Address = "0x57F1887A8BF19B14FC0DF6FD9B2ACC9AF147EA85".parse().unwrap();
        assert_eq!(
            addr.to_string(),
            "0x57f1887a8bf19b14fc0df6fd9b2acc9af147ea85"
        );
    }

    #[test]
    fn test_rejects_missing_prefix_and_bad_length() {
        assert!(matches!(
            "57f1887a8bf19b14fc0df6fd9b2acc9af147ea85".parse::<Address>(),
            Err(IdParseError::MissingPrefix(_))
        ));
        assert!(matches!(
            "0x1234".parse::<Address>(),
            Err(IdParseError::WrongLength {
                expected: 20,
                actual: 2
            })
        ));
        assert!(matches!(
            "0xzz".parse::<InterfaceId>(),
            Err(IdParseError::InvalidHex { .. })
        ));
    }

    #[test]
    fn test_serde_uses_hex_strings() {
        let id = InterfaceId::from_bytes([0x01, 0xff, 0xc9, 0xa7]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0x01ffc9a7\"");
        let back: InterfaceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_zero_detection() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_bytes([1u8; 20]).is_zero());
    }

    #[test]
    fn test_run_id_generation() {
        let a = RunId::generate();
        let b = RunId::generate();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("run:"));
    }
}
