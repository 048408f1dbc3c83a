//! Raw OS statistics consumed by the metric builders.
//!
//! The [`StatProvider`] trait is the only way builders reach the operating
//! system, which keeps them testable against [`test_utils::FakeStatProvider`].

pub mod procfs;
pub mod system;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use std::path::PathBuf;
use thiserror::Error;

pub use system::SystemStatProvider;

/// 1, 5 and 15 minute load averages.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadAverage {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

/// Cumulative CPU time for one core (or all cores), in seconds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CpuTimes {
    /// Provider naming: `cpu-total` for the aggregate, `cpuN` per core.
    pub label: String,
    pub user: f64,
    pub system: f64,
    pub idle: f64,
}

/// Virtual memory statistics in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VirtualMemory {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub used_percent: f64,
    pub free: u64,
    /// Only meaningful on Linux.
    pub buffers: u64,
    /// Only meaningful on Linux.
    pub cached: u64,
}

/// A mounted partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub mountpoint: PathBuf,
    pub device: PathBuf,
}

/// Filesystem usage for a path, in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskUsage {
    pub total: u64,
    pub free: u64,
    pub used: u64,
    /// The path the usage was resolved against.
    pub path: PathBuf,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{0} statistics are not supported on this platform")]
    Unsupported(&'static str),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error("no filesystem found for {0}")]
    NotFound(PathBuf),

    #[error("stat source unavailable: {0}")]
    Unavailable(String),
}

/// Source of raw host statistics.
///
/// Each call queries the OS independently; no two calls are guaranteed to
/// observe the same instant.
pub trait StatProvider: Send + Sync {
    fn load_average(&self) -> Result<LoadAverage, ProviderError>;

    /// Returns the aggregate sample when `per_core` is false, one sample per
    /// core otherwise.
    fn cpu_times(&self, per_core: bool) -> Result<Vec<CpuTimes>, ProviderError>;

    fn virtual_memory(&self) -> Result<VirtualMemory, ProviderError>;

    /// Lists physical (non-virtual) mounted partitions.
    fn partitions(&self) -> Result<Vec<Partition>, ProviderError>;

    /// Returns filesystem usage for a mountpoint or a device path.
    fn usage(&self, path: &std::path::Path) -> Result<DiskUsage, ProviderError>;
}
