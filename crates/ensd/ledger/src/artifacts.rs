//! Contract artifact repository
//!
//! Supplies the function signatures of a module's ABI, used only for
//! interface-id computation.

use crate::error::ArtifactError;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Source of module function signatures
pub trait ArtifactRepository: Send + Sync {
    /// Canonical signatures (`name(type,...)`) of every function in the ABI
    fn function_signatures(&self, module: &str) -> Result<Vec<String>, ArtifactError>;
}

/// Artifacts held in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryArtifacts {
    signatures: HashMap<String, Vec<String>>,
}

impl InMemoryArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module<I, S>(mut self, module: impl Into<String>, signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(module, signatures);
        self
    }

    pub fn insert<I, S>(&mut self, module: impl Into<String>, signatures: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signatures.insert(
            module.into(),
            signatures.into_iter().map(Into::into).collect(),
        );
    }
}

impl ArtifactRepository for InMemoryArtifacts {
    fn function_signatures(&self, module: &str) -> Result<Vec<String>, ArtifactError> {
        self.signatures
            .get(module)
            .cloned()
            .ok_or_else(|| ArtifactError::NotFound(module.to_string()))
    }
}

/// Hardhat-style artifact directory
///
/// Looks for `<Module>.json` anywhere under the root and reads its `abi`.
#[derive(Debug, Clone)]
pub struct ArtifactDirectory {
    root: PathBuf,
}

impl ArtifactDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Shallowest `file_name` under the root; symlinked directories are not followed
    fn find(&self, file_name: &str) -> Result<Option<PathBuf>, ArtifactError> {
        let mut found: Option<(usize, PathBuf)> = None;
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                ArtifactError::Io {
                    path,
                    source: e.into(),
                }
            })?;
            if !entry.file_type().is_file() || entry.file_name().to_str() != Some(file_name) {
                continue;
            }
            if found.as_ref().map_or(true, |(depth, _)| entry.depth() < *depth) {
                found = Some((entry.depth(), entry.into_path()));
            }
        }
        Ok(found.map(|(_, path)| path))
    }
}

impl ArtifactRepository for ArtifactDirectory {
    fn function_signatures(&self, module: &str) -> Result<Vec<String>, ArtifactError> {
        let file_name = format!("{}.json", module);
        let path = self
            .find(&file_name)?
            .ok_or_else(|| ArtifactError::NotFound(module.to_string()))?;

        let contents = std::fs::read_to_string(&path).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;
        let artifact: Value =
            serde_json::from_str(&contents).map_err(|e| ArtifactError::Malformed {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        abi_function_signatures(&artifact["abi"]).map_err(|reason| ArtifactError::Malformed {
            path,
            reason,
        })
    }
}

/// Signatures of every `function` fragment in a JSON ABI
pub fn abi_function_signatures(abi: &Value) -> Result<Vec<String>, String> {
    let fragments = abi.as_array().ok_or("abi is not an array")?;
    fragments
        .iter()
        .filter(|f| f["type"].as_str() == Some("function"))
        .map(|f| -> Result<String, String> {
            let name = f["name"].as_str().ok_or("function without a name")?;
            let inputs = match f.get("inputs") {
                Some(Value::Array(inputs)) => inputs
                    .iter()
                    .map(canonical_type)
                    .collect::<Result<Vec<_>, _>>()?,
                _ => Vec::new(),
            };
            Ok(format!("{}({})", name, inputs.join(",")))
        })
        .collect()
}

/// Canonical type of one ABI parameter, expanding tuples
fn canonical_type(param: &Value) -> Result<String, String> {
    let ty = param["type"].as_str().ok_or("parameter without a type")?;
    match ty.strip_prefix("tuple") {
        Some(suffix) => {
            let components = param["components"]
                .as_array()
                .ok_or("tuple without components")?
                .iter()
                .map(canonical_type)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("({}){}", components.join(","), suffix))
        }
        None => Ok(ty.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_in_memory_lookup() {
        let artifacts =
            InMemoryArtifacts::new().with_module("IERC165", ["supportsInterface(bytes4)"]);
        assert_eq!(
            artifacts.function_signatures("IERC165").unwrap(),
            vec!["supportsInterface(bytes4)".to_string()]
        );
        assert!(matches!(
            artifacts.function_signatures("Missing"),
            Err(ArtifactError::NotFound(_))
        ));
    }

    #[test]
    fn test_abi_signatures_skip_events_and_expand_tuples() {
        let abi = json!([
            {"type": "event", "name": "Transfer", "inputs": []},
            {"type": "function", "name": "ownerOf", "inputs": [{"name": "id", "type": "uint256"}]},
            {"type": "function", "name": "setData", "inputs": [
                {"type": "tuple[]", "components": [
                    {"type": "address"},
                    {"type": "tuple", "components": [{"type": "uint64"}, {"type": "bytes"}]}
                ]},
                {"type": "bytes32"}
            ]},
            {"type": "function", "name": "name"}
        ]);
        let sigs = abi_function_signatures(&abi).unwrap();
        assert_eq!(
            sigs,
            vec![
                "ownerOf(uint256)".to_string(),
                "setData((address,(uint64,bytes))[],bytes32)".to_string(),
                "name()".to_string(),
            ]
        );
    }

    #[test]
    fn test_artifact_directory_finds_nested_json() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("contracts").join("INameWrapper.sol");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            nested.join("INameWrapper.json"),
            json!({
                "contractName": "INameWrapper",
                "abi": [
                    {"type": "function", "name": "ownerOf", "inputs": [{"type": "uint256"}]}
                ]
            })
            .to_string(),
        )
        .unwrap();

        let repo = ArtifactDirectory::new(dir.path());
        assert_eq!(
            repo.function_signatures("INameWrapper").unwrap(),
            vec!["ownerOf(uint256)".to_string()]
        );
        assert!(matches!(
            repo.function_signatures("Nope"),
            Err(ArtifactError::NotFound(_))
        ));
    }

    #[test]
    fn test_artifact_directory_prefers_shallowest_match() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("a").join("b");
        std::fs::create_dir_all(&deep).unwrap();
        let artifact = |name: &str| {
            json!({"abi": [{"type": "function", "name": name, "inputs": []}]}).to_string()
        };
        std::fs::write(deep.join("Root.json"), artifact("deep")).unwrap();
        std::fs::write(dir.path().join("Root.json"), artifact("top")).unwrap();

        let repo = ArtifactDirectory::new(dir.path());
        assert_eq!(
            repo.function_signatures("Root").unwrap(),
            vec!["top()".to_string()]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_artifact_directory_ignores_symlink_loops() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("build");
        std::fs::create_dir_all(&nested).unwrap();
        std::os::unix::fs::symlink(dir.path(), nested.join("loop")).unwrap();

        let repo = ArtifactDirectory::new(dir.path());
        assert!(matches!(
            repo.function_signatures("Missing"),
            Err(ArtifactError::NotFound(_))
        ));
    }

    #[test]
    fn test_malformed_artifact() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Broken.json"), "{\"abi\": 3}").unwrap();
        let repo = ArtifactDirectory::new(dir.path());
        assert!(matches!(
            repo.function_signatures("Broken"),
            Err(ArtifactError::Malformed { .. })
        ));
    }
}
