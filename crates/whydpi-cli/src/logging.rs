//! Logging initialization

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::args::{Args, LogFormat};

/// Initialize logging based on CLI arguments
///
/// The returned guard flushes the log file on drop; keep it alive until
/// the process exits.
pub fn init(args: &Args) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level(args).into())
        .from_env_lossy();

    let ansi = atty::is(atty::Stream::Stdout);

    let (file_writer, guard) = match &args.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    match args.log_format {
        LogFormat::Text => {
            let stdout = fmt::layer()
                .with_ansi(ansi)
                .with_target(args.verbose >= 2)
                .with_thread_ids(args.verbose >= 3)
                .with_file(args.verbose >= 3)
                .with_line_number(args.verbose >= 3);
            let file = file_writer.map(|w| fmt::layer().with_ansi(false).with_writer(w));
            registry.with(stdout).with(file).try_init()
        }
        LogFormat::Json => {
            let file = file_writer.map(|w| fmt::layer().json().with_writer(w));
            registry.with(fmt::layer().json()).with(file).try_init()
        }
        LogFormat::Compact => {
            let file = file_writer.map(|w| fmt::layer().compact().with_ansi(false).with_writer(w));
            registry
                .with(fmt::layer().compact().with_ansi(ansi))
                .with(file)
                .try_init()
        }
    }
    .context("Failed to initialize logging")?;

    Ok(guard)
}

fn level(args: &Args) -> Level {
    if args.quiet {
        Level::ERROR
    } else {
        match args.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_level_from_flags() {
        assert_eq!(level(&Args::parse_from(["whydpi", "status"])), Level::INFO);
        assert_eq!(level(&Args::parse_from(["whydpi", "-vv", "status"])), Level::TRACE);
        assert_eq!(level(&Args::parse_from(["whydpi", "-q", "-v", "status"])), Level::ERROR);
    }
}
