//! # whyDPI Core
//!
//! Platform-independent core of the whyDPI decoy injector.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Packet parsing and construction** - zero-copy IPv4/TCP views and a
//!   checksummed datagram builder
//! - **Classification** - TLS ClientHello / HTTP request detection
//! - **Decoy strategies** - pluggable forging of low-TTL garbage
//! - **Dispatch** - the always-accept verdict path with counters
//! - **Interface resolution** - boot-time egress discovery with backoff
//! - **Configuration** - TOML-backed settings
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use whydpi_core::{Classifier, Config, Dispatcher, Injector, Stats};
//! use whydpi_core::strategies::StrategyBuilder;
//! # use whydpi_core::injector::RawSender;
//! # fn sender() -> Box<dyn RawSender> { unimplemented!() }
//!
//! let config = Config::load("config.toml")?;
//! let stats = Arc::new(Stats::new());
//! let injector = Injector::new(
//!     StrategyBuilder::from_config(&config.decoy),
//!     sender(),
//!     None,
//!     stats.clone(),
//! );
//! let dispatcher = Dispatcher::new(
//!     Classifier::new(config.intercept.ports.iter().copied()),
//!     injector,
//!     stats,
//! );
//!
//! let verdict = dispatcher.handle(&[0x45, 0x00]);
//! # Ok::<(), whydpi_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod classifier;
pub mod config;
pub mod error;
pub mod injector;
pub mod packet;
pub mod pipeline;
pub mod resolver;
pub mod strategies;

// Re-exports for convenience
pub use classifier::{Classification, Classifier, PassReason};
pub use config::Config;
pub use error::{Error, InjectionError, Result, RouteError};
pub use injector::{Injector, RawSender};
pub use packet::{Flow, Packet};
pub use pipeline::{Dispatcher, Stats, StatsSnapshot, Verdict};
pub use resolver::{InterfaceResolver, RouteSource};
