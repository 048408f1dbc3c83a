//! # System Stat Provider
//!
//! Reads host statistics through the `sysinfo` crate, with procfs fallbacks
//! for the figures sysinfo does not expose.

use super::{
    procfs, CpuTimes, DiskUsage, LoadAverage, Partition, ProviderError, StatProvider, VirtualMemory,
};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use sysinfo::{Disks, System};
use tracing::{trace, warn};

/// A [`StatProvider`] backed by the running host.
pub struct SystemStatProvider {
    system: Mutex<System>,
    disks: Mutex<Disks>,
}

impl Default for SystemStatProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemStatProvider {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            disks: Mutex::new(Disks::new()),
        }
    }

    // The handles hold no invariant a panic can break; every query refreshes them.
    fn system(&self) -> MutexGuard<'_, System> {
        self.system.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn disks(&self) -> MutexGuard<'_, Disks> {
        self.disks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fills in buffers/cached, keeping the sysinfo figures when procfs fails.
fn with_caches(
    mut memory: VirtualMemory,
    caches: Result<procfs::CacheInfo, ProviderError>,
) -> VirtualMemory {
    match caches {
        Ok(caches) => {
            memory.buffers = caches.buffers;
            memory.cached = caches.cached;
        }
        Err(e) => warn!("Reporting buffers/cached as 0: {}", e),
    }
    memory
}

impl StatProvider for SystemStatProvider {
    fn load_average(&self) -> Result<LoadAverage, ProviderError> {
        if cfg!(windows) {
            return Err(ProviderError::Unsupported("load average"));
        }
        let avg = System::load_average();
        Ok(LoadAverage {
            load1: avg.one,
            load5: avg.five,
            load15: avg.fifteen,
        })
    }

    fn cpu_times(&self, per_core: bool) -> Result<Vec<CpuTimes>, ProviderError> {
        if !cfg!(target_os = "linux") {
            return Err(ProviderError::Unsupported("cpu time"));
        }
        let content = procfs::read(procfs::PROC_STAT)?;
        procfs::parse_cpu_times(&content, per_core)
    }

    fn virtual_memory(&self) -> Result<VirtualMemory, ProviderError> {
        let mut system = self.system();
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return Err(ProviderError::Unavailable("total memory reported as zero".to_string()));
        }
        let used = system.used_memory();
        let mut memory = VirtualMemory {
            total,
            available: system.available_memory(),
            used,
            used_percent: used as f64 / total as f64 * 100.0,
            free: system.free_memory(),
            buffers: 0,
            cached: 0,
        };

        if cfg!(target_os = "linux") {
            let caches = procfs::read(procfs::PROC_MEMINFO)
                .and_then(|content| procfs::parse_meminfo_caches(&content));
            memory = with_caches(memory, caches);
        }
        Ok(memory)
    }

    fn partitions(&self) -> Result<Vec<Partition>, ProviderError> {
        let mut disks = self.disks();
        // Re-enumerates and refreshes space figures for every disk.
        disks.refresh_list();

        // Pseudo filesystems (overlay, tmpfs, ...) are not backed by a device node.
        let partitions = disks
            .list()
            .iter()
            .filter(|disk| Path::new(disk.name()).is_absolute())
            .map(|disk| Partition {
                mountpoint: disk.mount_point().to_path_buf(),
                device: PathBuf::from(disk.name()),
            })
            .collect::<Vec<_>>();
        trace!(count = partitions.len(), "Enumerated partitions");
        Ok(partitions)
    }

    fn usage(&self, path: &Path) -> Result<DiskUsage, ProviderError> {
        // Follow /dev/disk/by-* symlinks and relative mountpoints.
        let resolved = std::fs::canonicalize(path).map_err(|source| ProviderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut disks = self.disks();
        let index = disks
            .list()
            .iter()
            .position(|disk| disk.mount_point() == resolved)
            .or_else(|| {
                disks.list().iter().position(|disk| {
                    let device = Path::new(disk.name());
                    device == resolved
                        || std::fs::canonicalize(device).map_or(false, |d| d == resolved)
                })
            })
            .ok_or_else(|| ProviderError::NotFound(path.to_path_buf()))?;

        // Only the matched filesystem is re-queried.
        let disk = &mut disks.list_mut()[index];
        disk.refresh();

        let total = disk.total_space();
        let free = disk.available_space();
        Ok(DiskUsage {
            total,
            free,
            used: total.saturating_sub(free),
            path: resolved,
        })
    }
}
