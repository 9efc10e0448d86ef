//! Start command - main decoy injection loop

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use whydpi_core::config::{Config, StrategyKind};
use whydpi_core::strategies::StrategyBuilder;
use whydpi_core::{Classifier, Dispatcher, Injector, InterfaceResolver, Stats};
use whydpi_platform::linux::{
    CommandRunner, DnsConfigurator, IptablesRules, NfQueue, RawSocketSender, SystemCommand, SystemRoutes,
};

use super::status::{unix_now, write_report, StatusReport};

/// Start command arguments
#[derive(Args, Debug)]
pub struct StartArgs {
    /// NFQUEUE number
    #[arg(short = 'q', long, value_name = "NUM")]
    pub queue: Option<u16>,

    /// TTL of decoy packets
    #[arg(short = 't', long, value_parser = clap::value_parser!(u8).range(1..))]
    pub ttl: Option<u8>,

    /// Destination ports to intercept
    #[arg(
        short = 'p',
        long,
        num_args = 1..,
        value_name = "PORT",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub ports: Option<Vec<u16>>,

    /// Decoy payload size in bytes
    #[arg(long, value_name = "BYTES")]
    pub fake_size: Option<usize>,

    /// Decoy strategy
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Point the system resolver at the configured DNS servers first
    #[arg(long)]
    pub configure_dns: bool,

    /// Let the routing table pick the egress instead of binding the raw socket
    #[arg(long)]
    pub no_bind_interface: bool,
}

/// Decoy strategy names accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Reuse the real sequence number
    #[value(name = "same_seq", alias = "same-seq")]
    SameSeq,
    /// Trail the real sequence number
    #[value(name = "stale_seq", alias = "stale-seq")]
    StaleSeq,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::SameSeq => StrategyKind::SameSeq,
            StrategyArg::StaleSeq => StrategyKind::StaleSeq,
        }
    }
}

impl StartArgs {
    /// Apply command-line overrides on top of file configuration
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(queue) = self.queue {
            config.queue.queue_id = queue;
        }
        if let Some(ttl) = self.ttl {
            config.decoy.ttl = ttl;
        }
        if let Some(ports) = &self.ports {
            config.intercept.ports = ports.clone();
        }
        if let Some(size) = self.fake_size {
            config.decoy.fake_payload_size = size;
        }
        if let Some(strategy) = self.strategy {
            config.decoy.strategy = strategy.into();
        }
        if self.no_bind_interface {
            config.send.bind_interface = false;
        }
        config
    }
}

/// Execute the start command
pub fn execute(args: StartArgs, config_path: Option<&Path>) -> Result<()> {
    let config = args.apply(super::load_config(config_path)?);
    config.validate().context("Invalid configuration")?;

    info!(
        queue = config.queue.queue_id,
        ports = ?config.intercept.ports,
        ttl = config.decoy.ttl,
        strategy = config.decoy.strategy.name(),
        payload = config.decoy.fake_payload_size,
        "Starting whyDPI"
    );

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommand);

    if args.configure_dns {
        let dns = DnsConfigurator::new(runner.clone(), &config.dns);
        if dns.is_configured() {
            info!("DNS already configured");
        } else {
            dns.configure().context("DNS configuration failed")?;
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received termination signal, shutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let rules = IptablesRules::new(
        runner.clone(),
        config.queue.queue_id,
        config.intercept.ports.iter().copied(),
    );

    let result = rules
        .install()
        .context("Failed to install iptables rules")
        .and_then(|()| run_injector(&config, runner, &running));

    if let Err(e) = rules.remove() {
        warn!(error = %e, "Failed to remove iptables rules; run `whydpi stop`");
    }

    info!("whyDPI stopped");
    result
}

fn run_injector(config: &Config, runner: Arc<dyn CommandRunner>, running: &Arc<AtomicBool>) -> Result<()> {
    let interface = if config.send.bind_interface {
        InterfaceResolver::from_config(SystemRoutes::new(runner), &config.resolver).resolve()
    } else {
        info!("Interface binding disabled, kernel routing selects the egress");
        None
    };

    let sender = RawSocketSender::open(interface.as_deref(), config.send.timeout())
        .context("Failed to open raw socket")?;

    let stats = Arc::new(Stats::new());
    let injector = Injector::new(
        StrategyBuilder::from_config(&config.decoy),
        Box::new(sender),
        interface.clone(),
        stats.clone(),
    );
    let dispatcher = Dispatcher::new(
        Classifier::new(config.intercept.ports.iter().copied()),
        injector,
        stats.clone(),
    );

    let mut queue = NfQueue::bind(config.queue.queue_id).context("Failed to bind NFQUEUE")?;

    let template = StatusReport {
        running: true,
        pid: std::process::id(),
        queue_id: config.queue.queue_id,
        ports: config.intercept.ports.clone(),
        interface,
        strategy: config.decoy.strategy.name().to_string(),
        started_at: unix_now(),
        updated_at: unix_now(),
        stats: stats.snapshot(),
    };
    let reporter = spawn_reporter(config, template, stats, running.clone());

    info!(queue = queue.queue_id(), "Intercepting, press Ctrl+C to stop");
    let served = whydpi_platform::serve(&mut queue, &dispatcher, running);

    running.store(false, Ordering::SeqCst);
    if reporter.join().is_err() {
        warn!("Status reporter panicked");
    }

    let handled = served.context("Packet loop failed")?;
    let final_stats = dispatcher.stats();
    info!(
        handled,
        processed = final_stats.processed,
        bypassed = final_stats.bypassed,
        injected = final_stats.injected,
        injection_errors = final_stats.injection_errors,
        "Final counters"
    );
    Ok(())
}

/// Persist status every `status.interval_secs` until `running` clears
fn spawn_reporter(
    config: &Config,
    mut report: StatusReport,
    stats: Arc<Stats>,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    let path = config.status.path.clone();
    let interval = Duration::from_secs(config.status.interval_secs);
    let tick = Duration::from_millis(100);

    thread::spawn(move || {
        let mut warned = false;
        let mut write = |report: &StatusReport| {
            if let Err(e) = write_report(&path, report) {
                if !warned {
                    warn!(error = %e, "Cannot persist status");
                    warned = true;
                }
            }
        };

        let mut elapsed = interval;
        while running.load(Ordering::SeqCst) {
            if elapsed >= interval {
                report.stats = stats.snapshot();
                report.updated_at = unix_now();
                write(&report);
                elapsed = Duration::ZERO;
            }
            thread::sleep(tick);
            elapsed += tick;
        }

        report.running = false;
        report.stats = stats.snapshot();
        report.updated_at = unix_now();
        write(&report);
    })
}
