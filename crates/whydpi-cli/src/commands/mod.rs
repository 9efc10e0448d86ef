//! CLI commands

pub mod completions;
pub mod config;
pub mod dns;
pub mod start;
pub mod status;
pub mod stop;

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use tracing::debug;
use whydpi_core::Config;

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install interception rules and run the decoy injector
    Start(start::StartArgs),

    /// Remove interception rules left behind by a previous run
    Stop(stop::StopArgs),

    /// Show counters of the running instance
    Status(status::StatusArgs),

    /// System DNS management
    Dns(dns::DnsArgs),

    /// Configuration management
    Config(config::ConfigArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Configuration file search paths, in priority order
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("whydpi.toml"), PathBuf::from("config.toml")];
    if let Some(dirs) = directories::ProjectDirs::from("", "", "whydpi") {
        paths.push(dirs.config_dir().join("config.toml"));
    }
    paths.push(PathBuf::from("/etc/whydpi/config.toml"));
    paths
}

/// First existing configuration file on the search path
pub fn find_config_file() -> Option<PathBuf> {
    config_search_paths().into_iter().find(|p| p.is_file())
}

/// Load the explicit config file, else the first one found, else defaults
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration");
            Config::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => {
            debug!("No configuration file found, using defaults");
            Ok(Config::default())
        }
    }
}
