//! Status command - counters of the running instance
//!
//! `start` persists a [`StatusReport`] periodically; this command reads it.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use whydpi_core::StatsSnapshot;

/// Status command arguments
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Status file to read (default: from configuration)
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Print the raw JSON
    #[arg(long)]
    pub json: bool,
}

/// Snapshot persisted by a running instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Whether the instance was still running when this was written
    pub running: bool,
    /// Process id of the writer
    pub pid: u32,
    /// NFQUEUE number in use
    pub queue_id: u16,
    /// Intercepted destination ports
    pub ports: Vec<u16>,
    /// Egress interface decoys are bound to
    pub interface: Option<String>,
    /// Active decoy strategy
    pub strategy: String,
    /// Unix time the instance started
    pub started_at: u64,
    /// Unix time of this snapshot
    pub updated_at: u64,
    /// Dispatch counters
    pub stats: StatsSnapshot,
}

/// Seconds since the Unix epoch
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Write `report` to `path` atomically (temp file, then rename)
pub fn write_report(path: &Path, report: &StatusReport) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let json = serde_json::to_string_pretty(report).context("Failed to serialize status")?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// Read a persisted report
pub fn read_report(path: &Path) -> Result<StatusReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("No status at {} (is whydpi running?)", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Malformed status file {}", path.display()))
}

/// Execute status command
pub fn execute(args: StatusArgs, config_path: Option<&Path>) -> Result<()> {
    let path = match args.file {
        Some(path) => path,
        None => super::load_config(config_path)?.status.path,
    };

    let report = read_report(&path)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let state = if report.running {
        "running".green().bold()
    } else {
        "stopped".yellow().bold()
    };
    let age = unix_now().saturating_sub(report.updated_at);

    println!("whyDPI {} (pid {}, updated {}s ago)", state, report.pid, age);
    println!("  Queue:            {}", report.queue_id);
    println!("  Ports:            {:?}", report.ports);
    println!("  Interface:        {}", report.interface.as_deref().unwrap_or("auto"));
    println!("  Strategy:         {}", report.strategy);
    println!();
    println!("  Processed:        {}", report.stats.processed);
    println!("  Bypassed:         {}", report.stats.bypassed);
    println!("  Accepted:         {}", report.stats.accepted);
    println!("  Decoys sent:      {}", report.stats.injected);
    println!("  Decoy failures:   {}", report.stats.injection_errors);

    Ok(())
}
