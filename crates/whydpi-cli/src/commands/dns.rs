//! DNS command - system resolver management

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use whydpi_platform::linux::{DnsConfigurator, SystemCommand};

/// DNS command arguments
#[derive(Args, Debug)]
pub struct DnsArgs {
    #[command(subcommand)]
    pub action: DnsAction,
}

/// DNS subcommands
#[derive(Subcommand, Debug)]
pub enum DnsAction {
    /// Point the system resolver at the configured servers
    Configure {
        /// Rewrite resolv.conf even if it already lists the servers
        #[arg(long)]
        force: bool,
    },

    /// Restore the resolver configuration saved by `configure`
    Restore,
}

/// Execute dns command
pub fn execute(args: DnsArgs, config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    config.validate().context("Invalid configuration")?;

    let dns = DnsConfigurator::new(Arc::new(SystemCommand), &config.dns);

    match args.action {
        DnsAction::Configure { force } => {
            if dns.is_configured() && !force {
                info!("DNS already configured");
                println!("DNS already configured");
                return Ok(());
            }
            dns.configure().context("DNS configuration failed")?;
            println!("DNS configured");
        }
        DnsAction::Restore => {
            dns.restore().context("DNS restore failed")?;
            println!("DNS restored");
        }
    }
    Ok(())
}
