//! External command execution
//!
//! iptables, ip, systemctl, chattr and nmcli are all driven through
//! [`CommandRunner`] so their argument vectors can be checked in tests.

use std::io;
use std::process::Command;
use tracing::trace;

/// Captured result of one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status was zero
    pub success: bool,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Successful result with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed result with the given stderr
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs external programs
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, capturing its output
    ///
    /// `Err` means the program could not be started at all.
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommand;

impl CommandRunner for SystemCommand {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        trace!(program, ?args, "Running command");
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Build an owned argument vector
pub(crate) fn args<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: ToString,
{
    items.into_iter().map(|s| s.to_string()).collect()
}
