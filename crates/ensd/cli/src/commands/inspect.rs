//! `encode`, `interface-id` and `stages`

use crate::config::PipelineConfig;
use crate::error::{CliError, CliResult};
use crate::output::{self, OutputFormat};
use ensd_ledger::{compute_interface_id, ArtifactDirectory, InterfaceIdComputer};
use ensd_pipeline::{Stage, StageGraph};
use ensd_types::{encode, InterfaceId, NodeHash};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::Tabled;

#[derive(Debug, Tabled, Serialize)]
pub struct EncodedName {
    #[tabled(rename = "NAME")]
    pub name: String,
    #[tabled(rename = "NODE")]
    pub node: NodeHash,
    #[tabled(rename = "WIRE")]
    pub wire: String,
}

pub fn encode_name(name: &str) -> CliResult<EncodedName> {
    let (node, wire) = encode(name)?;
    Ok(EncodedName {
        name: name.to_string(),
        node,
        wire: format!("0x{}", hex::encode(wire)),
    })
}

pub fn execute_encode(name: &str, format: OutputFormat) -> CliResult<()> {
    output::print_output(vec![encode_name(name)?], format)
}

/// Where to take function signatures from
pub enum SignatureSource {
    Literal(Vec<String>),
    Artifact { module: String, dir: PathBuf },
}

#[derive(Debug, Tabled, Serialize)]
struct InterfaceRow {
    #[tabled(rename = "SOURCE")]
    source: String,
    #[tabled(rename = "INTERFACE ID")]
    interface_id: InterfaceId,
}

pub fn interface_id(source: &SignatureSource) -> CliResult<InterfaceId> {
    match source {
        SignatureSource::Literal(signatures) => Ok(compute_interface_id(signatures)),
        SignatureSource::Artifact { module, dir } => {
            let computer = InterfaceIdComputer::new(Arc::new(ArtifactDirectory::new(dir)));
            Ok(computer.interface_id_for(module)?)
        }
    }
}

pub fn execute_interface_id(
    signatures: Vec<String>,
    artifact: Option<String>,
    artifacts: Option<PathBuf>,
    config: &PipelineConfig,
    format: OutputFormat,
) -> CliResult<()> {
    let source = match artifact {
        Some(module) => {
            let dir = artifacts.or_else(|| config.artifacts.clone()).ok_or_else(|| {
                CliError::Config("--artifact needs --artifacts or an artifacts directory in the config".into())
            })?;
            SignatureSource::Artifact { module, dir }
        }
        None if signatures.is_empty() => {
            return Err(CliError::Config(
                "give function signatures or --artifact".into(),
            ))
        }
        None => SignatureSource::Literal(signatures),
    };

    let label = match &source {
        SignatureSource::Literal(signatures) => signatures.join(", "),
        SignatureSource::Artifact { module, .. } => module.clone(),
    };
    let row = InterfaceRow {
        source: label,
        interface_id: interface_id(&source)?,
    };
    output::print_output(vec![row], format)
}

#[derive(Debug, Tabled, Serialize)]
struct StageRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "STAGE")]
    name: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "TARGET")]
    target: String,
    #[tabled(rename = "DEPENDS ON")]
    depends_on: String,
    #[tabled(rename = "ONLY IF FRESH")]
    only_if_fresh: String,
}

fn stage_row(position: usize, stage: &Stage) -> StageRow {
    let depends_on = stage
        .depends_on
        .iter()
        .map(|d| {
            if d.is_scoped() {
                format!("{} [{}]", d.stage, d.nodes.join(", "))
            } else {
                d.stage.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    StageRow {
        position,
        name: stage.name.clone(),
        kind: stage.kind().to_string(),
        target: stage.module().unwrap_or("-").to_string(),
        depends_on,
        only_if_fresh: stage.only_if_fresh.clone().unwrap_or_default(),
    }
}

pub fn execute_stages(config: &PipelineConfig, format: OutputFormat) -> CliResult<()> {
    let graph = StageGraph::new(config.stages()?)?;
    let rows = graph
        .ordered()
        .enumerate()
        .map(|(i, stage)| stage_row(i + 1, stage))
        .collect();
    output::print_output(rows, format)
}
