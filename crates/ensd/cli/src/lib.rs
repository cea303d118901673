//! ensd CLI - rehearse and apply naming-registry rollouts
//!
//! This CLI lets operators:
//! - Run the rollout pipeline against a ledger snapshot
//! - Preview the calls a run would make (`plan`)
//! - Encode names and compute interface ids
//! - Inspect the stage graph

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
pub mod config;
mod error;
mod output;

use commands::inspect;
use commands::run::{self as run_cmd, RunOptions};
use config::PipelineConfig;
use ensd_deployment::RunMode;
pub use error::{CliError, CliResult};
pub use output::OutputFormat;

/// ensd CLI application
#[derive(Parser)]
#[command(name = "ensd")]
#[command(about = "ensd - naming-registry rollout pipeline", long_about = None)]
#[command(version)]
struct Cli {
    /// Pipeline configuration file
    #[arg(short, long, env = "ENSD_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "ENSD_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Log as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table", global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline
    Run {
        /// Target network
        #[arg(short, long, env = "ENSD_NETWORK")]
        network: String,

        /// Ledger snapshot to run against
        #[arg(short, long)]
        ledger: Option<PathBuf>,

        /// Report what would happen without submitting anything
        #[arg(long)]
        dry_run: bool,

        /// Write the resulting ledger state here
        #[arg(long)]
        save_ledger: Option<PathBuf>,
    },

    /// Show the calls a run would make
    Plan {
        /// Target network
        #[arg(short, long, env = "ENSD_NETWORK")]
        network: String,

        /// Ledger snapshot to plan against
        #[arg(short, long)]
        ledger: Option<PathBuf>,
    },

    /// Print the node id and wire form of a name
    Encode {
        /// Dot-separated name, e.g. addr.reverse
        name: String,
    },

    /// Compute an interface id
    InterfaceId {
        /// Function signatures, e.g. "supportsInterface(bytes4)"
        signatures: Vec<String>,

        /// Take the signatures from this artifact instead
        #[arg(long, conflicts_with = "signatures")]
        artifact: Option<String>,

        /// Artifact directory
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },

    /// List stages in execution order
    Stages,
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    // Logs go to stderr so reports on stdout stay machine readable
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Run using the current process arguments.
pub async fn run() -> CliResult<()> {
    run_with_args(std::env::args_os()).await
}

/// Run using the provided argument iterator.
pub async fn run_with_args<I, T>(args: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_tracing(&cli.log_level, cli.log_json);

    let config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            network,
            ledger,
            dry_run,
            save_ledger,
        } => {
            let mode = if dry_run { RunMode::DryRun } else { RunMode::Apply };
            let options = RunOptions {
                network,
                ledger,
                save_ledger,
                mode,
            };
            run_cmd::execute(options, &config, cli.output).await
        }
        Commands::Plan { network, ledger } => {
            let options = RunOptions {
                network,
                ledger,
                save_ledger: None,
                mode: RunMode::DryRun,
            };
            run_cmd::execute(options, &config, cli.output).await
        }
        Commands::Encode { name } => inspect::execute_encode(&name, cli.output),
        Commands::InterfaceId {
            signatures,
            artifact,
            artifacts,
        } => inspect::execute_interface_id(signatures, artifact, artifacts, &config, cli.output),
        Commands::Stages => inspect::execute_stages(&config, cli.output),
    }
}
