use super::{
    CpuTimes, DiskUsage, LoadAverage, Partition, ProviderError, StatProvider, VirtualMemory,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Fake stat provider for testing.
///
/// Every query succeeds with the configured value unless it was marked as
/// failing. Queries with nothing configured fail with `Unavailable`.
#[derive(Default)]
pub struct FakeStatProvider {
    load: Mutex<Option<LoadAverage>>,
    cpu_total: Mutex<Option<Vec<CpuTimes>>>,
    cpu_per_core: Mutex<Option<Vec<CpuTimes>>>,
    memory: Mutex<Option<VirtualMemory>>,
    partitions: Mutex<Option<Vec<Partition>>>,
    usage: Mutex<HashMap<PathBuf, Result<DiskUsage, String>>>,
    calls: Mutex<Vec<String>>,
    panic_on_load: Mutex<bool>,
}

impl FakeStatProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_load(self, load1: f64, load5: f64, load15: f64) -> Self {
        *self.load.lock().unwrap() = Some(LoadAverage { load1, load5, load15 });
        self
    }

    /// Sets the aggregate and per-core samples.
    pub fn with_cpu(self, total: CpuTimes, per_core: Vec<CpuTimes>) -> Self {
        *self.cpu_total.lock().unwrap() = Some(vec![total]);
        *self.cpu_per_core.lock().unwrap() = Some(per_core);
        self
    }

    pub fn with_memory(self, memory: VirtualMemory) -> Self {
        *self.memory.lock().unwrap() = Some(memory);
        self
    }

    pub fn with_partition(self, mountpoint: &str, device: &str) -> Self {
        self.partitions
            .lock()
            .unwrap()
            .get_or_insert_with(Vec::new)
            .push(Partition {
                mountpoint: PathBuf::from(mountpoint),
                device: PathBuf::from(device),
            });
        self
    }

    /// Sets the usage reported for `path`. The resolved path equals `path`.
    pub fn with_usage(self, path: &str, total: u64, free: u64) -> Self {
        self.set_usage_resolved(path, path, total, free);
        self
    }

    /// Sets the usage reported for `path` with a different resolved path.
    pub fn set_usage_resolved(&self, path: &str, resolved: &str, total: u64, free: u64) {
        self.usage.lock().unwrap().insert(
            PathBuf::from(path),
            Ok(DiskUsage {
                total,
                free,
                used: total - free,
                path: PathBuf::from(resolved),
            }),
        );
    }

    pub fn fail_usage(&self, path: &str, error: &str) {
        self.usage
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), Err(error.to_string()));
    }

    pub fn fail_load(&self) {
        *self.load.lock().unwrap() = None;
    }

    pub fn fail_per_core_cpu(&self) {
        *self.cpu_per_core.lock().unwrap() = None;
    }

    pub fn fail_memory(&self) {
        *self.memory.lock().unwrap() = None;
    }

    /// Makes the next load query panic instead of returning.
    pub fn panic_on_next_load(&self) {
        *self.panic_on_load.lock().unwrap() = true;
    }

    /// Returns the queries made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn unavailable(what: &str) -> ProviderError {
        ProviderError::Unavailable(format!("fake {} not configured", what))
    }
}

impl StatProvider for FakeStatProvider {
    fn load_average(&self) -> Result<LoadAverage, ProviderError> {
        self.record("load_average");
        let should_panic = std::mem::take(&mut *self.panic_on_load.lock().unwrap());
        if should_panic {
            panic!("fake load average query blew up");
        }
        self.load.lock().unwrap().ok_or_else(|| Self::unavailable("load"))
    }

    fn cpu_times(&self, per_core: bool) -> Result<Vec<CpuTimes>, ProviderError> {
        self.record(format!("cpu_times({})", per_core));
        let slot = if per_core { &self.cpu_per_core } else { &self.cpu_total };
        slot.lock().unwrap().clone().ok_or_else(|| Self::unavailable("cpu"))
    }

    fn virtual_memory(&self) -> Result<VirtualMemory, ProviderError> {
        self.record("virtual_memory");
        self.memory.lock().unwrap().ok_or_else(|| Self::unavailable("memory"))
    }

    fn partitions(&self) -> Result<Vec<Partition>, ProviderError> {
        self.record("partitions");
        self.partitions
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Self::unavailable("partitions"))
    }

    fn usage(&self, path: &Path) -> Result<DiskUsage, ProviderError> {
        self.record(format!("usage({})", path.display()));
        match self.usage.lock().unwrap().get(path) {
            Some(Ok(usage)) => Ok(usage.clone()),
            Some(Err(error)) => Err(ProviderError::Unavailable(error.clone())),
            None => Err(ProviderError::NotFound(path.to_path_buf())),
        }
    }
}
