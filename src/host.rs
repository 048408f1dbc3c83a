//! Host identity established once at startup.

use crate::config::AgentConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use sysinfo::System;
use tracing::debug;

/// The operating system family the agent reports for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OsFamily {
    Linux,
    Darwin,
    Windows,
    FreeBsd,
    Other(String),
}

impl OsFamily {
    /// Classifies the platform the binary is running on.
    pub fn current() -> Self {
        Self::from(std::env::consts::OS)
    }

    pub fn is_linux(&self) -> bool {
        matches!(self, OsFamily::Linux)
    }

    pub fn as_str(&self) -> &str {
        match self {
            OsFamily::Linux => "linux",
            OsFamily::Darwin => "darwin",
            OsFamily::Windows => "windows",
            OsFamily::FreeBsd => "freebsd",
            OsFamily::Other(name) => name,
        }
    }
}

impl From<&str> for OsFamily {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "linux" => OsFamily::Linux,
            "darwin" | "macos" => OsFamily::Darwin,
            "windows" => OsFamily::Windows,
            "freebsd" => OsFamily::FreeBsd,
            other => OsFamily::Other(other.to_string()),
        }
    }
}

impl From<String> for OsFamily {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<OsFamily> for String {
    fn from(family: OsFamily) -> Self {
        family.as_str().to_string()
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who this agent reports as. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub host_name: String,
    pub os_family: OsFamily,
}

impl HostIdentity {
    pub fn new(host_name: impl Into<String>, os_family: OsFamily) -> Self {
        Self {
            host_name: host_name.into(),
            os_family,
        }
    }

    /// Resolves the identity from configuration, falling back to the system
    /// host name and the compiled-in platform.
    pub fn detect(config: &AgentConfig) -> Result<Self> {
        let host_name = match &config.host_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => System::host_name()
                .filter(|name| !name.is_empty())
                .ok_or_else(|| anyhow::anyhow!("could not determine host name; set agent.host_name"))?,
        };
        let os_family = config
            .os_family
            .as_deref()
            .map(OsFamily::from)
            .unwrap_or_else(OsFamily::current);
        debug!(host = %host_name, os = %os_family, "Resolved host identity");
        Ok(Self { host_name, os_family })
    }
}
