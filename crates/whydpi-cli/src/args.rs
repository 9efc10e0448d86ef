//! Command-line argument parsing

use crate::commands::Command;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// whyDPI - educational DPI bypass tool
///
/// Injects a low-TTL garbage segment ahead of every TLS ClientHello and HTTP
/// request so that on-path inspection reassembles noise instead of the
/// real handshake. Linux only; requires root.
#[derive(Parser, Debug)]
#[command(name = "whydpi")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", env = "WHYDPI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format for logs
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Log file path
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// Compact format
    Compact,
}
