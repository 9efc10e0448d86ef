//! Config command - configuration management

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use whydpi_core::Config;

/// Config command arguments
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Config file to show (default: detect)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Generate a configuration file with defaults
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "whydpi.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Config file to validate
        file: PathBuf,
    },

    /// Show config file locations
    Paths,
}

/// Execute config command
pub fn execute(args: ConfigArgs, config_path: Option<&Path>) -> Result<()> {
    match args.action {
        ConfigAction::Show { file } => show_config(file.as_deref().or(config_path)),
        ConfigAction::Generate { output } => generate_config(&output),
        ConfigAction::Validate { file } => validate_config(&file),
        ConfigAction::Paths => show_paths(),
    }
}

fn show_config(file: Option<&Path>) -> Result<()> {
    let config = super::load_config(file)?;
    println!("{}", config.to_toml().context("Failed to serialize config")?);
    Ok(())
}

fn generate_config(output: &Path) -> Result<()> {
    let toml_str = Config::default().to_toml().context("Failed to serialize config")?;

    let content = format!(
        "# whyDPI configuration\n\
         # Every key is optional; omitted keys take the values shown here\n\n\
         {toml_str}"
    );

    std::fs::write(output, content)
        .with_context(|| format!("Failed to write config to {}", output.display()))?;

    info!(path = %output.display(), "Generated config file");
    println!("Configuration file generated: {}", output.display());
    Ok(())
}

fn validate_config(file: &Path) -> Result<()> {
    let config = Config::load(file)
        .with_context(|| format!("Failed to load config from {}", file.display()))?;

    config.validate().context("Configuration validation failed")?;

    println!("✓ Configuration is valid");
    println!("  Queue:     {}", config.queue.queue_id);
    println!("  Ports:     {:?}", config.intercept.ports);
    println!("  Strategy:  {}", config.decoy.strategy.name());
    println!("  TTL:       {}", config.decoy.ttl);
    println!("  Payload:   {} bytes", config.decoy.fake_payload_size);

    Ok(())
}

fn show_paths() -> Result<()> {
    println!("Configuration file search paths:");
    println!();
    for (i, path) in super::config_search_paths().iter().enumerate() {
        let marker = if path.is_file() { " (found)" } else { "" };
        println!("  {}. {}{}", i + 1, path.display(), marker);
    }
    Ok(())
}
