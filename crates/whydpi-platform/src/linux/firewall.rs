//! iptables NFQUEUE rules
//!
//! One mangle/POSTROUTING rule per intercepted port. `--queue-bypass` lets
//! traffic through untouched if no process is bound to the queue. Packets
//! carrying [`DECOY_MARK`] are excluded, so decoys sent from the raw socket
//! go straight to the wire instead of back into the queue.

use super::command::{args, CommandRunner};
use crate::error::{PlatformError, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Firewall mark set on the raw socket that sends decoys
pub const DECOY_MARK: u32 = 0x7768;

/// Upper bound on deletions of one rule, in case iptables keeps succeeding
pub const MAX_DELETES_PER_PORT: usize = 64;

const IPTABLES: &str = "iptables";

/// Installs and removes the interception rules
pub struct IptablesRules {
    runner: Arc<dyn CommandRunner>,
    queue_id: u16,
    ports: Vec<u16>,
}

impl IptablesRules {
    /// Rules sending `ports` to queue `queue_id`
    pub fn new(runner: Arc<dyn CommandRunner>, queue_id: u16, ports: impl IntoIterator<Item = u16>) -> Self {
        Self {
            runner,
            queue_id,
            ports: ports.into_iter().collect(),
        }
    }

    /// Ports covered by these rules
    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    /// Argument vector for one rule with the given action (`-A`, `-D`, `-C`)
    pub fn rule_args(&self, action: &str, port: u16) -> Vec<String> {
        let port = port.to_string();
        let queue = self.queue_id.to_string();
        let mark = format!("{DECOY_MARK:#x}");
        args([
            "-t",
            "mangle",
            action,
            "POSTROUTING",
            "-p",
            "tcp",
            "--dport",
            port.as_str(),
            "-m",
            "mark",
            "!",
            "--mark",
            mark.as_str(),
            "-j",
            "NFQUEUE",
            "--queue-num",
            queue.as_str(),
            "--queue-bypass",
        ])
    }

    /// Install the rules, clearing stale copies first
    pub fn install(&self) -> Result<()> {
        for &port in &self.ports {
            let stale = self.remove_port(port)?;
            if stale > 0 {
                debug!(port, stale, "Removed stale rule copies");
            }

            let rule = self.rule_args("-A", port);
            let output = self.runner.run(IPTABLES, &rule)?;
            if !output.success {
                return Err(PlatformError::Firewall {
                    command: rule.join(" "),
                    stderr: output.stderr,
                });
            }
            info!(port, queue = self.queue_id, "NFQUEUE rule installed");
        }
        Ok(())
    }

    /// Remove every copy of the rules; returns how many were deleted
    pub fn remove(&self) -> Result<usize> {
        let mut removed = 0;
        for &port in &self.ports {
            removed += self.remove_port(port)?;
        }
        info!(removed, "NFQUEUE rules removed");
        Ok(removed)
    }

    fn remove_port(&self, port: u16) -> Result<usize> {
        let rule = self.rule_args("-D", port);
        for deleted in 0..MAX_DELETES_PER_PORT {
            if !self.runner.run(IPTABLES, &rule)?.success {
                return Ok(deleted);
            }
        }
        warn!(port, limit = MAX_DELETES_PER_PORT, "Rule deletion limit reached");
        Ok(MAX_DELETES_PER_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linux::command::CommandOutput;
    use std::io;
    use std::sync::Mutex;

    /// Fake iptables holding a multiset of installed rules
    #[derive(Default)]
    struct FakeIptables {
        rules: Mutex<Vec<Vec<String>>>,
        calls: Mutex<Vec<Vec<String>>>,
        reject_append: bool,
    }

    impl CommandRunner for FakeIptables {
        fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
            assert_eq!(program, "iptables");
            self.calls.lock().unwrap().push(args.to_vec());

            let mut key = args.to_vec();
            let action = key.remove(2);
            let mut rules = self.rules.lock().unwrap();
            match action.as_str() {
                "-A" if self.reject_append => Ok(CommandOutput::failed("iptables: No chain/target/match by that name.")),
                "-A" => {
                    rules.push(key);
                    Ok(CommandOutput::ok(""))
                }
                "-D" => match rules.iter().position(|r| *r == key) {
                    Some(i) => {
                        rules.remove(i);
                        Ok(CommandOutput::ok(""))
                    }
                    None => Ok(CommandOutput::failed("Bad rule (does a matching rule exist in that chain?).")),
                },
                other => panic!("unexpected action {other}"),
            }
        }
    }

    #[test]
    fn test_rule_args() {
        let rules = IptablesRules::new(Arc::new(FakeIptables::default()), 200, [443]);
        assert_eq!(
            rules.rule_args("-A", 443).join(" "),
            "-t mangle -A POSTROUTING -p tcp --dport 443 -m mark ! --mark 0x7768 \
             -j NFQUEUE --queue-num 200 --queue-bypass"
        );
    }

    #[test]
    fn test_rule_skips_marked_decoys() {
        let rules = IptablesRules::new(Arc::new(FakeIptables::default()), 200, [80]);
        for action in ["-A", "-D"] {
            let rule = rules.rule_args(action, 80);
            let negation = rule.iter().position(|a| a == "!").unwrap();
            assert_eq!(rule[negation - 2..negation], ["-m", "mark"]);
            assert_eq!(rule[negation + 1], "--mark");
            assert_eq!(rule[negation + 2], format!("{DECOY_MARK:#x}"));
            let jump = rule.iter().position(|a| a == "-j").unwrap();
            assert!(negation < jump);
        }
    }

    #[test]
    fn test_install_then_remove() {
        let fake = Arc::new(FakeIptables::default());
        let rules = IptablesRules::new(fake.clone(), 200, [80, 443]);

        rules.install().unwrap();
        assert_eq!(fake.rules.lock().unwrap().len(), 2);

        assert_eq!(rules.remove().unwrap(), 2);
        assert!(fake.rules.lock().unwrap().is_empty());
    }

    #[test]
    fn test_install_is_idempotent() {
        let fake = Arc::new(FakeIptables::default());
        let rules = IptablesRules::new(fake.clone(), 200, [80, 443]);

        rules.install().unwrap();
        rules.install().unwrap();
        assert_eq!(fake.rules.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_remove_deletes_duplicates() {
        let fake = Arc::new(FakeIptables::default());
        let rules = IptablesRules::new(fake.clone(), 200, [443]);
        let mut key = rules.rule_args("-A", 443);
        key.remove(2);
        for _ in 0..3 {
            fake.rules.lock().unwrap().push(key.clone());
        }

        assert_eq!(rules.remove().unwrap(), 3);
        // three successful deletes plus one that reports no match
        assert_eq!(fake.calls.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_install_failure_is_reported() {
        let fake = Arc::new(FakeIptables {
            reject_append: true,
            ..Default::default()
        });
        let rules = IptablesRules::new(fake, 200, [80]);
        let err = rules.install().unwrap_err();
        assert!(matches!(err, PlatformError::Firewall { .. }));
        assert!(err.to_string().contains("NFQUEUE"));
    }

    #[test]
    fn test_deletion_is_bounded() {
        struct AlwaysSucceeds;
        impl CommandRunner for AlwaysSucceeds {
            fn run(&self, _: &str, _: &[String]) -> io::Result<CommandOutput> {
                Ok(CommandOutput::ok(""))
            }
        }

        let rules = IptablesRules::new(Arc::new(AlwaysSucceeds), 200, [80]);
        assert_eq!(rules.remove().unwrap(), MAX_DELETES_PER_PORT);
    }
}
