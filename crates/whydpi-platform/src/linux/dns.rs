//! System resolver reconfiguration
//!
//! Points the host at fixed nameservers so that hijacked ISP resolvers do
//! not undo the bypass, and puts everything back on [`restore`].
//!
//! [`restore`]: DnsConfigurator::restore

use super::command::{args, CommandRunner};
use crate::error::{PlatformError, Result};
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use whydpi_core::config::DnsConfig;

const RESOLVED_UNIT: &str = "systemd-resolved";

/// NetworkManager connection types we touch
const NM_CONNECTION_TYPES: [&str; 4] = ["802-3-ethernet", "802-11-wireless", "ethernet", "wifi"];

/// Rewrites resolv.conf and related services
pub struct DnsConfigurator {
    runner: Arc<dyn CommandRunner>,
    servers: Vec<Ipv4Addr>,
    resolv_conf: PathBuf,
    backup_path: PathBuf,
}

impl DnsConfigurator {
    /// Create from configuration
    pub fn new(runner: Arc<dyn CommandRunner>, config: &DnsConfig) -> Self {
        Self {
            runner,
            servers: config.servers.clone(),
            resolv_conf: config.resolv_conf.clone(),
            backup_path: config.backup_path.clone(),
        }
    }

    /// Whether resolv.conf already names the primary server
    pub fn is_configured(&self) -> bool {
        let Some(primary) = self.servers.first() else {
            return false;
        };
        match fs::read_to_string(&self.resolv_conf) {
            Ok(content) => nameservers(&content).any(|ns| ns == primary.to_string()),
            Err(e) => {
                debug!(path = %self.resolv_conf.display(), error = %e, "Cannot read resolver config");
                false
            }
        }
    }

    /// Install the configured nameservers
    pub fn configure(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(PlatformError::Dns("no nameservers configured".into()));
        }

        self.backup()?;

        if self.succeeds("systemctl", &["is-active", RESOLVED_UNIT]) {
            info!("Stopping and masking {RESOLVED_UNIT}");
            for action in ["stop", "disable", "mask"] {
                if !self.succeeds("systemctl", &[action, RESOLVED_UNIT]) {
                    warn!(action, "systemctl {action} {RESOLVED_UNIT} failed");
                }
            }
        }

        self.set_immutable(false);

        if is_symlink(&self.resolv_conf) {
            info!(path = %self.resolv_conf.display(), "Replacing symlink with a regular file");
            fs::remove_file(&self.resolv_conf)?;
        }

        fs::write(&self.resolv_conf, self.render())?;

        if self.set_immutable(true) {
            info!(path = %self.resolv_conf.display(), "Resolver config made immutable");
        } else {
            warn!(path = %self.resolv_conf.display(), "Failed to make resolver config immutable");
        }

        let servers = self
            .servers
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        for conn in self.active_connections() {
            self.modify_connection(&conn, &servers, "yes");
            info!(connection = %conn, "NetworkManager connection configured");
        }

        info!(servers = %servers, "DNS configured");
        Ok(())
    }

    /// Undo [`configure`](Self::configure)
    pub fn restore(&self) -> Result<()> {
        self.set_immutable(false);

        if self.backup_path.exists() {
            info!(backup = %self.backup_path.display(), "Restoring resolver config");
            fs::copy(&self.backup_path, &self.resolv_conf)?;
            fs::remove_file(&self.backup_path)?;
        } else {
            warn!(backup = %self.backup_path.display(), "No resolver config backup found");
        }

        for conn in self.active_connections() {
            self.modify_connection(&conn, "", "no");
            info!(connection = %conn, "NetworkManager connection restored");
        }

        for action in ["unmask", "enable", "start"] {
            if !self.succeeds("systemctl", &[action, RESOLVED_UNIT]) {
                debug!(action, "systemctl {action} {RESOLVED_UNIT} failed");
            }
        }

        info!("DNS configuration restored");
        Ok(())
    }

    /// resolv.conf content for the configured servers
    pub fn render(&self) -> String {
        let mut content = format!(
            "# Generated by whyDPI\n# Backup saved to {}\n",
            self.backup_path.display()
        );
        for server in &self.servers {
            content.push_str(&format!("nameserver {server}\n"));
        }
        content
    }

    fn backup(&self) -> Result<()> {
        if fs::symlink_metadata(&self.resolv_conf).is_err() {
            debug!(path = %self.resolv_conf.display(), "No resolver config to back up");
            return Ok(());
        }
        if self.backup_path.exists() {
            warn!(backup = %self.backup_path.display(), "Backup already present, keeping it");
            return Ok(());
        }

        if is_symlink(&self.resolv_conf) {
            info!(path = %self.resolv_conf.display(), "Resolver config is a symlink, backing up its target");
            if let Err(e) = fs::copy(&self.resolv_conf, &self.backup_path) {
                warn!(error = %e, "Symlink target unreadable, continuing without backup");
            }
            return Ok(());
        }

        info!(backup = %self.backup_path.display(), "Backing up resolver config");
        fs::copy(&self.resolv_conf, &self.backup_path).map_err(|e| {
            PlatformError::Dns(format!("backup of {} failed: {e}", self.resolv_conf.display()))
        })?;
        Ok(())
    }

    fn set_immutable(&self, immutable: bool) -> bool {
        let flag = if immutable { "+i" } else { "-i" };
        let path = self.resolv_conf.display().to_string();
        self.succeeds("chattr", &[flag, path.as_str()])
    }

    fn active_connections(&self) -> Vec<String> {
        let cmd = args(["-t", "-f", "NAME,TYPE", "connection", "show", "--active"]);
        match self.runner.run("nmcli", &cmd) {
            Ok(output) if output.success => parse_nm_connections(&output.stdout),
            Ok(_) => Vec::new(),
            Err(e) => {
                debug!(error = %e, "nmcli unavailable");
                Vec::new()
            }
        }
    }

    fn modify_connection(&self, conn: &str, servers: &str, ignore_auto: &str) {
        let steps = [
            args(["connection", "modify", conn, "ipv4.dns", servers]),
            args(["connection", "modify", conn, "ipv4.ignore-auto-dns", ignore_auto]),
            args(["connection", "up", conn]),
        ];
        for step in steps {
            if !self.run_ok("nmcli", &step) {
                warn!(connection = %conn, command = %step.join(" "), "nmcli step failed");
            }
        }
    }

    fn succeeds(&self, program: &str, arguments: &[&str]) -> bool {
        self.run_ok(program, &args(arguments.iter().copied()))
    }

    fn run_ok(&self, program: &str, arguments: &[String]) -> bool {
        match self.runner.run(program, arguments) {
            Ok(output) => output.success,
            Err(e) => {
                debug!(program, error = %e, "Command could not be started");
                false
            }
        }
    }
}

/// Names of active ethernet and wifi connections in `nmcli -t` output
pub fn parse_nm_connections(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.rsplit_once(':'))
        .filter(|(_, kind)| NM_CONNECTION_TYPES.contains(kind))
        .map(|(name, _)| name.to_string())
        .collect()
}

fn nameservers(content: &str) -> impl Iterator<Item = &str> {
    content.lines().filter_map(|line| {
        let mut tokens = line.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some("nameserver"), Some(addr)) => Some(addr),
            _ => None,
        }
    })
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}
