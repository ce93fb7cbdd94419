//! Gateway configuration tests.

use pack_gateway::GatewayConfig;
use std::{io::Write, time::Duration};

#[test]
fn parse_minimal_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 8080
"#;
    let config = GatewayConfig::from_toml(toml).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert!(config.stale_after().is_none());
    assert_eq!(config.test_runners.count, 4);
}

#[test]
fn parse_full_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 4000

[session]
stale_after_secs = 120
sweep_interval_secs = 10

[test_runners]
names = ["Kim", "Lee"]
count = 2
base_latitude = 51.5
base_longitude = -0.12
spread = 0.01
"#;
    let config = GatewayConfig::from_toml(toml).unwrap();
    assert_eq!(config.stale_after(), Some(Duration::from_secs(120)));
    assert_eq!(config.sweep_interval(), Duration::from_secs(10));
    assert_eq!(config.test_runners.names, ["Kim", "Lee"]);
    assert_eq!(config.test_runners.count, 2);
    assert_eq!(config.test_runners.base_latitude, 51.5);
    assert_eq!(config.test_runners.base_longitude, -0.12);
    assert_eq!(config.test_runners.spread, 0.01);
}

#[test]
fn empty_config_uses_defaults() {
    let config = GatewayConfig::from_toml("").unwrap();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 3001);
    assert_eq!(config.session.sweep_interval_secs, 30);
    assert_eq!(config.test_runners.names.len(), 6);
    assert_eq!(config.test_runners.names[0], "Alex");
    assert_eq!(config.test_runners.base_latitude, 37.77);
    assert_eq!(config.test_runners.base_longitude, -122.43);
}

#[test]
fn bind_address() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 8080
"#;
    let config = GatewayConfig::from_toml(toml).unwrap();
    assert_eq!(config.bind_address(), "0.0.0.0:8080");
}

#[test]
fn port_override() {
    let mut config = GatewayConfig::default();
    config.apply_port_override(Some("4242"));
    assert_eq!(config.server.port, 4242);

    config.apply_port_override(Some("not-a-port"));
    assert_eq!(config.server.port, 4242);

    config.apply_port_override(None);
    assert_eq!(config.server.port, 4242);
}

#[test]
fn sweep_interval_is_never_zero() {
    let config = GatewayConfig::from_toml("[session]\nsweep_interval_secs = 0\n").unwrap();
    assert_eq!(config.sweep_interval(), Duration::from_secs(1));
}

#[test]
fn wrong_field_type_is_rejected() {
    assert!(GatewayConfig::from_toml("[server]\nport = \"high\"\n").is_err());
}

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[server]\nport = 5055").unwrap();

    let config = GatewayConfig::load(file.path()).unwrap();
    assert_eq!(config.server.port, 5055);
}

#[test]
fn load_missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = GatewayConfig::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("absent.toml"));
}
