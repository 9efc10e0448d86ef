//! Integration tests for configuration module

use std::io::Write;
use std::net::Ipv4Addr;
use whydpi_core::config::{Config, StrategyKind};
use whydpi_core::Error;

#[test]
fn test_full_config_file() {
    let toml_content = r#"
[queue]
queue_id = 7

[intercept]
ports = [80, 443, 8080]

[decoy]
strategy = "stale_seq"
ttl = 4
fake_payload_size = 1000
stale_seq_offset = 20000

[resolver]
max_retries = 3
initial_delay_ms = 250
backoff_factor = 2.0
probe_address = "1.1.1.1"

[send]
bind_interface = false
timeout_ms = 50

[dns]
servers = ["9.9.9.9"]

[status]
path = "/tmp/whydpi-status.json"
interval_secs = 2
"#;

    let config = Config::from_toml(toml_content).unwrap();
    config.validate().unwrap();

    assert_eq!(config.queue.queue_id, 7);
    assert_eq!(config.intercept.ports, vec![80, 443, 8080]);
    assert_eq!(config.decoy.strategy, StrategyKind::StaleSeq);
    assert_eq!(config.decoy.stale_seq_offset, 20000);
    assert_eq!(config.resolver.probe_address, Ipv4Addr::new(1, 1, 1, 1));
    assert_eq!(config.resolver.initial_delay().as_millis(), 250);
    assert!(!config.send.bind_interface);
    assert_eq!(config.send.timeout().as_millis(), 50);
    assert_eq!(config.dns.servers, vec![Ipv4Addr::new(9, 9, 9, 9)]);
    assert_eq!(
        config.dns.resolv_conf,
        std::path::PathBuf::from("/etc/resolv.conf")
    );
    assert_eq!(config.status.interval_secs, 2);
}

#[test]
fn test_empty_file_is_default() {
    let config = Config::from_toml("").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_load_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[decoy]\nttl = 6").unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.decoy.ttl, 6);
}

#[test]
fn test_generated_file_validates() {
    let generated = Config::default().to_toml().unwrap();
    assert!(generated.contains("[decoy]"));
    assert!(generated.contains("same_seq"));

    let parsed = Config::from_toml(&generated).unwrap();
    assert!(parsed.validate().is_ok());
}

#[test]
fn test_invalid_probe_address() {
    let result = Config::from_toml("[resolver]\nprobe_address = \"not-an-ip\"");
    assert!(matches!(result, Err(Error::TomlParse(_))));
}

#[test]
fn test_validation_messages_name_the_key() {
    let mut config = Config::default();
    config.dns.servers.clear();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("dns.servers"));
}
