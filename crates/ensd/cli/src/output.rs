//! Output formatting

use crate::error::CliResult;
use colored::*;
use ensd_types::{DiagnosticAction, DiagnosticEntry, RunReport, RunStatus, StageSummary};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Print rows as a table, or the rows themselves as JSON/YAML
pub fn print_output<T: Serialize + Tabled>(data: Vec<T>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                println!("{}", "No results".dimmed());
            } else {
                println!("{}", Table::new(data));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&data)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&data)?),
    }
    Ok(())
}

/// Print a single item; tables fall back to JSON
pub fn print_single<T: Serialize>(data: &T, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Table | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?)
        }
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(data)?),
    }
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

#[derive(Tabled, Serialize)]
struct StageRow {
    #[tabled(rename = "STAGE")]
    stage: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "TXS")]
    transactions: usize,
}

impl From<&StageSummary> for StageRow {
    fn from(summary: &StageSummary) -> Self {
        let status = summary.status.to_string();
        let status = if summary.status.is_failed() {
            status.red().to_string()
        } else if summary.status.did_not_run() {
            status.yellow().to_string()
        } else {
            status.green().to_string()
        };
        Self {
            stage: summary.name.clone(),
            status,
            transactions: summary.transactions,
        }
    }
}

#[derive(Tabled, Serialize)]
struct EntryRow {
    #[tabled(rename = "STAGE")]
    stage: String,
    #[tabled(rename = "SUBJECT")]
    subject: String,
    #[tabled(rename = "ACTION")]
    action: String,
    #[tabled(rename = "DETAIL")]
    detail: String,
    #[tabled(rename = "TX")]
    tx: String,
}

impl From<&DiagnosticEntry> for EntryRow {
    fn from(entry: &DiagnosticEntry) -> Self {
        Self {
            stage: entry.stage.clone(),
            subject: entry.subject.clone(),
            action: colorize_action(entry.action),
            detail: entry.reason.clone().unwrap_or_default(),
            tx: entry.tx.map(|tx| short_hex(&tx.to_string())).unwrap_or_default(),
        }
    }
}

fn colorize_action(action: DiagnosticAction) -> String {
    let text = action.to_string();
    match action {
        DiagnosticAction::Deployed | DiagnosticAction::Applied => text.green().to_string(),
        DiagnosticAction::Reused | DiagnosticAction::Unchanged => text.dimmed().to_string(),
        DiagnosticAction::Planned => text.cyan().to_string(),
        DiagnosticAction::PolicySkip
        | DiagnosticAction::Skipped
        | DiagnosticAction::Blocked
        | DiagnosticAction::Cancelled => text.yellow().to_string(),
        DiagnosticAction::Failed | DiagnosticAction::Unresolved => text.red().to_string(),
    }
}

fn short_hex(hex: &str) -> String {
    if hex.len() > 14 {
        format!("{}…{}", &hex[..8], &hex[hex.len() - 4..])
    } else {
        hex.to_string()
    }
}

/// Print a run report
pub fn print_report(report: &RunReport, format: OutputFormat) -> CliResult<()> {
    if !matches!(format, OutputFormat::Table) {
        return print_single(report, format);
    }

    let mode = if report.dry_run { " (dry run)" } else { "" };
    print_info(&format!("Run {} on {}{}", report.run_id, report.network, mode));
    println!("{}", Table::new(report.stages.iter().map(StageRow::from)));
    if !report.entries.is_empty() {
        println!("{}", Table::new(report.entries.iter().map(EntryRow::from)));
    }

    let summary = format!(
        "{} transaction(s), {} policy skip(s)",
        report.transactions(),
        report.count(DiagnosticAction::PolicySkip)
    );
    match report.status {
        RunStatus::Cancelled => print_warning(&format!("Run cancelled: {}", summary)),
        RunStatus::Completed if report.has_failures() => {
            print_warning(&format!("Run completed with failures: {}", summary))
        }
        RunStatus::Completed => print_success(&format!("Run completed: {}", summary)),
    }
    Ok(())
}
