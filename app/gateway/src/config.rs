//! Gateway configuration loaded from TOML.

use anyhow::{Context, Result};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Environment variable overriding `server.port`.
pub const PORT_ENV: &str = "PORT";

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "pack.toml";

/// Top-level gateway configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Server bind configuration.
    pub server: ServerConfig,
    /// Session housekeeping.
    pub session: SessionConfig,
    /// Synthetic runner generation.
    pub test_runners: TestRunnerConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3001,
        }
    }
}

/// Session housekeeping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Evict runners with no update for this many seconds. Eviction is
    /// disabled when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_after_secs: Option<u64>,
    /// How often the stale sweep runs.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: None,
            sweep_interval_secs: 30,
        }
    }
}

/// Synthetic runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestRunnerConfig {
    /// Names handed out in order; also caps how many runners one request
    /// creates.
    pub names: Vec<CompactString>,
    /// Runners created when a request gives no count.
    pub count: usize,
    /// Southern edge of the placement box.
    pub base_latitude: f64,
    /// Western edge of the placement box.
    pub base_longitude: f64,
    /// Side of the placement box in degrees.
    pub spread: f64,
}

impl Default for TestRunnerConfig {
    fn default() -> Self {
        Self {
            names: ["Alex", "Sam", "Jordan", "Taylor", "Casey", "Riley"]
                .into_iter()
                .map(CompactString::from)
                .collect(),
            count: 4,
            base_latitude: 37.77,
            base_longitude: -122.43,
            spread: 0.02,
        }
    }
}

impl GatewayConfig {
    /// Parse a TOML string into a `GatewayConfig`.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        Ok(config)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_port_override(std::env::var(PORT_ENV).ok().as_deref());
    }

    /// Override the port from a raw value, ignoring unparsable input.
    pub fn apply_port_override(&mut self, value: Option<&str>) {
        let Some(value) = value else {
            return;
        };
        match value.trim().parse::<u16>() {
            Ok(port) => self.server.port = port,
            Err(e) => tracing::warn!("ignoring {PORT_ENV}={value}: {e}"),
        }
    }

    /// The `host:port` address to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Idle time after which runners are evicted, if enabled.
    pub fn stale_after(&self) -> Option<Duration> {
        self.session.stale_after_secs.map(Duration::from_secs)
    }

    /// Interval between stale sweeps. Never zero.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session.sweep_interval_secs.max(1))
    }
}
