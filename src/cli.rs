//! Command-Line Interface (CLI) argument parsing.
//!
//! Arguments parsed here are merged on top of the `nodeagent.toml` file and
//! environment variables, so any flag given wins.

use clap::Parser;
use figment::{
    providers::Serialized,
    value::{Dict, Map},
    Error, Figment, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// A node telemetry agent reporting load, CPU, memory and disk usage.
#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seconds between reporting cycles.
    #[arg(long, value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Collector endpoint batches are POSTed to.
    #[arg(long, value_name = "URL")]
    pub collector_url: Option<String>,

    /// Host name to report as.
    #[arg(long, value_name = "NAME")]
    pub hostname: Option<String>,

    /// Print batches to stdout instead of sending them.
    #[arg(long)]
    pub stdout: bool,

    /// Run a single reporting cycle and exit.
    #[arg(long)]
    pub once: bool,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut figment = Figment::new();

        if let Some(interval) = self.interval {
            figment = figment.merge(Serialized::default("agent.interval_seconds", interval));
        }
        if let Some(url) = &self.collector_url {
            figment = figment.merge(Serialized::default("collector.url", url));
        }
        if let Some(hostname) = &self.hostname {
            figment = figment.merge(Serialized::default("agent.host_name", hostname));
        }
        // Only an explicit flag overrides the configured transport.
        if self.stdout {
            figment = figment.merge(Serialized::default("collector.transport", "Stdout"));
        }

        figment.data()
    }
}
