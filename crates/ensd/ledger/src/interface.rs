//! Interface-id computation
//!
//! A capability identifier is the XOR of the 4-byte selectors of every
//! function a module exposes. Signatures are normalised, deduplicated and
//! sorted first so the id is stable across runs.

use crate::artifacts::ArtifactRepository;
use crate::error::ArtifactError;
use ensd_types::{keccak256, InterfaceId};
use std::collections::BTreeSet;
use std::sync::Arc;

/// First four bytes of the keccak of a function signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// XOR of the selectors of `signatures`
pub fn compute_interface_id<I, S>(signatures: I) -> InterfaceId
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let sorted: BTreeSet<String> = signatures
        .into_iter()
        .map(|s| s.as_ref().chars().filter(|c| !c.is_whitespace()).collect())
        .collect();

    let mut id = [0u8; 4];
    for signature in &sorted {
        for (acc, byte) in id.iter_mut().zip(selector(signature)) {
            *acc ^= byte;
        }
    }
    InterfaceId::from_bytes(id)
}

/// Computes interface ids from artifacts
#[derive(Clone)]
pub struct InterfaceIdComputer {
    artifacts: Arc<dyn ArtifactRepository>,
}

impl InterfaceIdComputer {
    pub fn new(artifacts: Arc<dyn ArtifactRepository>) -> Self {
        Self { artifacts }
    }

    /// Interface id of every function in the module's ABI
    pub fn interface_id_for(&self, module: &str) -> Result<InterfaceId, ArtifactError> {
        let signatures = self.artifacts.function_signatures(module)?;
        Ok(compute_interface_id(signatures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::InMemoryArtifacts;
    use proptest::prelude::*;

    const ERC721: [&str; 9] = [
        "balanceOf(address)",
        "ownerOf(uint256)",
        "approve(address,uint256)",
        "getApproved(uint256)",
        "setApprovalForAll(address,bool)",
        "isApprovedForAll(address,address)",
        "transferFrom(address,address,uint256)",
        "safeTransferFrom(address,address,uint256)",
        "safeTransferFrom(address,address,uint256,bytes)",
    ];

    #[test]
    fn test_single_selector() {
        assert_eq!(
            compute_interface_id(["supportsInterface(bytes4)"]).to_string(),
            "0x01ffc9a7"
        );
    }

    #[test]
    fn test_erc721_interface_id() {
        assert_eq!(compute_interface_id(ERC721).to_string(), "0x80ac58cd");
    }

    #[test]
    fn test_empty_set_is_zero() {
        assert!(compute_interface_id(Vec::<String>::new()).is_zero());
    }

    #[test]
    fn test_duplicates_and_whitespace_are_normalised() {
        let id = compute_interface_id([
            "supportsInterface(bytes4)",
            "supportsInterface( bytes4 )",
        ]);
        assert_eq!(id.to_string(), "0x01ffc9a7");
    }

    #[test]
    fn test_computer_reads_artifacts() {
        let artifacts = InMemoryArtifacts::new().with_module("IERC721", ERC721);
        let computer = InterfaceIdComputer::new(Arc::new(artifacts));
        assert_eq!(
            computer.interface_id_for("IERC721").unwrap().to_string(),
            "0x80ac58cd"
        );
        assert!(computer.interface_id_for("INameWrapper").is_err());
    }

    proptest! {
        #[test]
        fn prop_order_does_not_matter(mut sigs in proptest::collection::vec("[a-z]{1,8}\\((uint256|address|bytes)\\)", 1..8)) {
            let forward = compute_interface_id(&sigs);
            sigs.reverse();
            prop_assert_eq!(forward, compute_interface_id(&sigs));
        }
    }
}
