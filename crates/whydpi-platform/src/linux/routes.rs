//! Routing-table queries
//!
//! Answers the two questions the interface resolver asks: which interface
//! carries the default route, and which one the kernel would use toward a
//! probe address.

use super::command::{args, CommandRunner};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use whydpi_core::resolver::LOOPBACK;
use whydpi_core::{RouteError, RouteSource};

/// Kernel IPv4 routing table
pub const PROC_NET_ROUTE: &str = "/proc/net/route";

/// Route is up
const RTF_UP: u32 = 0x0001;

/// [`RouteSource`] backed by procfs and `ip route get`
pub struct SystemRoutes {
    runner: Arc<dyn CommandRunner>,
    route_table: PathBuf,
}

impl SystemRoutes {
    /// Query the live system
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_route_table(runner, PROC_NET_ROUTE)
    }

    /// Read the routing table from a different path
    pub fn with_route_table(runner: Arc<dyn CommandRunner>, path: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            route_table: path.into(),
        }
    }
}

impl RouteSource for SystemRoutes {
    fn default_route_interface(&self) -> Result<Option<String>, RouteError> {
        let table = std::fs::read_to_string(&self.route_table)?;
        Ok(parse_default_route(&table)?.map(canonical_name))
    }

    fn route_to(&self, addr: Ipv4Addr) -> Result<Option<String>, RouteError> {
        let addr = addr.to_string();
        let output = self
            .runner
            .run("ip", &args(["-4", "route", "get", addr.as_str()]))?;
        if !output.success {
            return Err(RouteError::Unavailable(output.stderr));
        }
        Ok(parse_route_get(&output.stdout).map(canonical_name))
    }
}

/// Interface of the lowest-metric up default route in `/proc/net/route`
pub fn parse_default_route(table: &str) -> Result<Option<String>, RouteError> {
    let mut best: Option<(u32, &str)> = None;

    for line in table.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < 8 {
            return Err(RouteError::Malformed(format!("short route line: {line}")));
        }

        let (iface, destination, flags, metric, mask) =
            (fields[0], fields[1], fields[3], fields[6], fields[7]);
        let flags = u32::from_str_radix(flags, 16)
            .map_err(|_| RouteError::Malformed(format!("bad flags field: {flags}")))?;
        let metric: u32 = metric
            .parse()
            .map_err(|_| RouteError::Malformed(format!("bad metric field: {metric}")))?;

        if destination != "00000000" || mask != "00000000" || flags & RTF_UP == 0 {
            continue;
        }
        if best.map_or(true, |(m, _)| metric < m) {
            best = Some((metric, iface));
        }
    }

    Ok(best.map(|(_, iface)| iface.to_string()))
}

/// Interface named after `dev` in `ip route get` output
pub fn parse_route_get(output: &str) -> Option<String> {
    let mut tokens = output.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == "dev" {
            return tokens.next().map(str::to_string);
        }
    }
    None
}

/// Report any interface the system flags as loopback as `lo`
fn canonical_name(name: String) -> String {
    let loopback = pnet::datalink::interfaces()
        .iter()
        .any(|iface| iface.name == name && iface.is_loopback());
    if loopback && name != LOOPBACK {
        debug!(interface = %name, "Interface is a loopback device");
        return LOOPBACK.to_string();
    }
    name
}
