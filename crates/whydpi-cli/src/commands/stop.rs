//! Stop command - remove interception rules

use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use whydpi_platform::linux::{IptablesRules, SystemCommand};

/// Stop command arguments
#[derive(Args, Debug)]
pub struct StopArgs {
    /// NFQUEUE number the rules target
    #[arg(short = 'q', long, value_name = "NUM")]
    pub queue: Option<u16>,

    /// Destination ports whose rules to remove
    #[arg(
        short = 'p',
        long,
        num_args = 1..,
        value_name = "PORT",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub ports: Option<Vec<u16>>,
}

/// Execute stop command
pub fn execute(args: StopArgs, config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let queue = args.queue.unwrap_or(config.queue.queue_id);
    let ports = args.ports.unwrap_or(config.intercept.ports);

    let rules = IptablesRules::new(Arc::new(SystemCommand), queue, ports);
    let removed = rules.remove().context("Failed to remove iptables rules")?;

    if removed == 0 {
        println!("No whyDPI rules found for queue {queue}");
    } else {
        println!("Removed {removed} rule(s) for queue {queue}");
    }
    Ok(())
}
