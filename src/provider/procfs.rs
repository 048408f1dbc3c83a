//! Parsers for the Linux procfs files sysinfo does not cover.
//!
//! sysinfo reports CPU usage as a percentage and hides the buffer/page cache
//! split, so CPU times come from `/proc/stat` and buffers/cached from
//! `/proc/meminfo`.

use super::{CpuTimes, ProviderError};
use std::path::Path;

pub const PROC_STAT: &str = "/proc/stat";
pub const PROC_MEMINFO: &str = "/proc/meminfo";

/// Kernel USER_HZ; /proc/stat counts in these ticks.
const CLOCK_TICKS_PER_SEC: f64 = 100.0;

/// Label for the all-cores line.
pub const AGGREGATE_CPU_LABEL: &str = "cpu-total";

pub fn read(path: &str) -> Result<String, ProviderError> {
    std::fs::read_to_string(path).map_err(|source| ProviderError::Io {
        path: Path::new(path).to_path_buf(),
        source,
    })
}

/// Parses `/proc/stat` content.
///
/// Format:
/// ```text
/// cpu  user nice system idle iowait irq softirq steal guest guest_nice
/// cpu0 user nice system idle ...
/// ```
///
/// Returns only the aggregate `cpu` line when `per_core` is false, and only
/// the `cpuN` lines otherwise.
pub fn parse_cpu_times(content: &str, per_core: bool) -> Result<Vec<CpuTimes>, ProviderError> {
    let mut times = Vec::new();

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else { continue };
        if !name.starts_with("cpu") {
            continue;
        }
        let is_aggregate = name == "cpu";
        if is_aggregate == per_core {
            continue;
        }

        let fields = parts
            .take(4)
            .map(|v| v.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ProviderError::Parse {
                what: "/proc/stat",
                detail: format!("{}: {}", name, e),
            })?;
        let [user, _nice, system, idle] = fields[..] else {
            return Err(ProviderError::Parse {
                what: "/proc/stat",
                detail: format!("{}: expected at least 4 fields", name),
            });
        };

        let label = if is_aggregate {
            AGGREGATE_CPU_LABEL.to_string()
        } else {
            name.to_string()
        };
        times.push(CpuTimes {
            label,
            user: user as f64 / CLOCK_TICKS_PER_SEC,
            system: system as f64 / CLOCK_TICKS_PER_SEC,
            idle: idle as f64 / CLOCK_TICKS_PER_SEC,
        });
    }

    if times.is_empty() {
        return Err(ProviderError::Parse {
            what: "/proc/stat",
            detail: "no cpu lines found".to_string(),
        });
    }
    Ok(times)
}

/// Buffer and page cache sizes from `/proc/meminfo`, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheInfo {
    pub buffers: u64,
    pub cached: u64,
}

/// Parses the `Buffers:` and `Cached:` lines of `/proc/meminfo`.
///
/// A line the kernel does not report reads as 0. A line with an unparsable
/// value is an error.
pub fn parse_meminfo_caches(content: &str) -> Result<CacheInfo, ProviderError> {
    let mut info = CacheInfo::default();

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else { continue };
        let slot = match key {
            "Buffers" => &mut info.buffers,
            "Cached" => &mut info.cached,
            _ => continue,
        };
        let kib = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| ProviderError::Parse {
                what: "/proc/meminfo",
                detail: format!("bad value for {}", key),
            })?;
        *slot = kib.saturating_mul(1024);
    }

    Ok(info)
}
