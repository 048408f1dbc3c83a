//! Configuration management for the node agent
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer built-in defaults, a `nodeagent.toml` file,
//! `NODEAGENT_` environment variables and command-line arguments, in that
//! order of precedence.

use crate::cli::Cli;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "nodeagent.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Sampling cadence and host identity.
    pub agent: AgentConfig,
    /// Where batches are sent.
    pub collector: CollectorConfig,
    /// Disk sampling settings.
    pub disk: DiskConfig,
    /// The agent's own Prometheus endpoint.
    pub metrics: MetricsConfig,
}

/// Sampling cadence, host identity overrides and envelope fields.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Seconds between reporting cycles.
    pub interval_seconds: u64,
    /// Overrides the system host name.
    pub host_name: Option<String>,
    /// Overrides the detected OS family (e.g. "linux").
    pub os_family: Option<String>,
    /// Source path stamped on every batch entry.
    pub source_path: String,
    /// Partition/shard id stamped on every batch entry.
    pub partition: i32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 10,
            host_name: None,
            os_family: None,
            source_path: crate::core::NODE_SOURCE_PATH.to_string(),
            partition: 0,
        }
    }
}

/// The transport used to ship batches.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Http,
    Stdout,
}

/// Configuration for the collector transport.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CollectorConfig {
    pub transport: TransportKind,
    /// The collector endpoint batches are POSTed to.
    pub url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Http,
            url: "http://127.0.0.1:9300/api/v1/metrics".to_string(),
            timeout_ms: 5000,
        }
    }
}

/// Disk sampling settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DiskConfig {
    /// Substrings a resolved device path must contain to count as physical.
    pub device_patterns: Vec<String>,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            device_patterns: vec!["/dev/sd".to_string()],
        }
    }
}

/// Configuration for the agent's own metrics endpoint.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_address: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: SocketAddr::from(([127, 0, 0, 1], 9301)),
        }
    }
}

impl Config {
    /// Loads the configuration, layering defaults, the TOML file, environment
    /// variables and CLI arguments.
    ///
    /// A missing file is not an error; the other layers still apply.
    pub fn load(cli: &Cli) -> Result<Self> {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            // e.g. NODEAGENT_COLLECTOR__URL=http://collector:9300/api/v1/metrics
            .merge(Env::prefixed("NODEAGENT_").split("__"))
            .merge(cli.clone())
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.agent.interval_seconds == 0 {
            anyhow::bail!("agent.interval_seconds must be greater than zero");
        }
        if self.collector.timeout_ms == 0 {
            anyhow::bail!("collector.timeout_ms must be greater than zero");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            agent: AgentConfig::default(),
            collector: CollectorConfig::default(),
            disk: DiskConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}
