//! whyDPI CLI
//!
//! Command-line interface for the decoy injector.

mod args;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use args::Args;
use commands::Command;

fn main() -> Result<()> {
    let args = Args::parse();

    // Held until exit so buffered file output is flushed
    let _guard = logging::init(&args)?;

    if matches!(args.command, Command::Start(_)) && !args.quiet {
        print_banner();
    }

    let result = run(args);

    if let Err(ref e) = result {
        error!("Fatal error: {:#}", e);
    }

    result
}

fn run(args: Args) -> Result<()> {
    let config = args.config.as_deref();
    match args.command {
        Command::Start(start_args) => commands::start::execute(start_args, config),
        Command::Stop(stop_args) => commands::stop::execute(stop_args, config),
        Command::Status(status_args) => commands::status::execute(status_args, config),
        Command::Dns(dns_args) => commands::dns::execute(dns_args, config),
        Command::Config(config_args) => commands::config::execute(config_args, config),
        Command::Completions(comp_args) => commands::completions::execute(comp_args),
    }
}

fn print_banner() {
    use colored::Colorize;

    let version = format!("whyDPI v{}", env!("CARGO_PKG_VERSION"));

    println!();
    println!("{}", "╔═══════════════════════════════════════════════════════╗".cyan());
    println!("{}{:<53}{}", "║  ".cyan(), version.green().bold(), "║".cyan());
    println!("{}{:<53}{}", "║  ".cyan(), "Educational DPI bypass via decoy injection".white(), "║".cyan());
    println!("{}", "╚═══════════════════════════════════════════════════════╝".cyan());
    println!();
}
