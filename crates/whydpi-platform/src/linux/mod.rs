//! Linux backend
//!
//! NFQUEUE delivery, raw-socket injection, iptables rules, routing queries
//! and resolver configuration.

mod command;
mod dns;
mod firewall;
mod nfqueue;
mod raw_socket;
mod routes;

pub use command::{CommandOutput, CommandRunner, SystemCommand};
pub use dns::{parse_nm_connections, DnsConfigurator};
pub use firewall::{IptablesRules, DECOY_MARK, MAX_DELETES_PER_PORT};
pub use nfqueue::{NfMessage, NfQueue};
pub use raw_socket::RawSocketSender;
pub use routes::{parse_default_route, parse_route_get, SystemRoutes, PROC_NET_ROUTE};
