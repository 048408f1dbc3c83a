use crate::core::{Label, MetricBuilder, MetricRecord, MetricRecordSet};
use crate::host::HostIdentity;
use crate::provider::{ProviderError, StatProvider};
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

/// Substring heuristic separating block devices from pseudo filesystems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    patterns: Vec<String>,
}

impl DeviceFilter {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// True if the resolved device path contains any configured pattern.
    pub fn is_physical(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.patterns.iter().any(|p| path.contains(p.as_str()))
    }
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self::new(vec!["/dev/sd".to_string()])
    }
}

/// Builds `node_disk_{total,free,used}` for every physical partition.
///
/// Any failed query aborts the builder; records already built for earlier
/// partitions are discarded with it.
pub struct DiskBuilder {
    identity: Arc<HostIdentity>,
    filter: DeviceFilter,
}

impl DiskBuilder {
    pub fn new(identity: Arc<HostIdentity>, filter: DeviceFilter) -> Self {
        Self { identity, filter }
    }
}

impl MetricBuilder for DiskBuilder {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn build(&self, provider: &dyn StatProvider) -> Result<MetricRecordSet, ProviderError> {
        let mut records = Vec::new();

        for part in provider.partitions()? {
            // The two queries are not atomic with respect to each other.
            let usage = provider.usage(&part.mountpoint)?;
            let device = provider.usage(&part.device)?;

            if !self.filter.is_physical(&device.path) {
                trace!(device = %device.path.display(), "Skipping non-physical partition");
                continue;
            }

            let label = Label::host(&self.identity.host_name);
            records.push(MetricRecord::gauge("node_disk_total", &label, usage.total as f64));
            records.push(MetricRecord::gauge("node_disk_free", &label, usage.free as f64));
            records.push(MetricRecord::gauge("node_disk_used", &label, usage.used as f64));
        }
        Ok(records)
    }
}
