use crate::core::{Label, MetricBuilder, MetricRecord, MetricRecordSet};
use crate::host::HostIdentity;
use crate::provider::{ProviderError, StatProvider};
use std::sync::Arc;

/// Builds `node_memory_*`.
///
/// Buffers and cached are only reported when the host identity says Linux;
/// the decision is made per call against the injected identity.
pub struct MemoryBuilder {
    identity: Arc<HostIdentity>,
}

impl MemoryBuilder {
    pub fn new(identity: Arc<HostIdentity>) -> Self {
        Self { identity }
    }
}

impl MetricBuilder for MemoryBuilder {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn build(&self, provider: &dyn StatProvider) -> Result<MetricRecordSet, ProviderError> {
        let mem = provider.virtual_memory()?;
        let label = Label::host(&self.identity.host_name);

        let mut records = vec![
            MetricRecord::gauge("node_memory_total", &label, mem.total as f64),
            MetricRecord::gauge("node_memory_available", &label, mem.available as f64),
            MetricRecord::gauge("node_memory_used", &label, mem.used as f64),
            MetricRecord::gauge("node_memory_used_percent", &label, mem.used_percent),
            MetricRecord::gauge("node_memory_free", &label, mem.free as f64),
        ];

        if self.identity.os_family.is_linux() {
            let linux = label.with("os", "linux");
            records.push(MetricRecord::gauge("node_memory_buffers", &linux, mem.buffers as f64));
            records.push(MetricRecord::gauge("node_memory_cached", &linux, mem.cached as f64));
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::OsFamily;
    use crate::provider::test_utils::FakeStatProvider;
    use crate::provider::VirtualMemory;

    fn provider() -> FakeStatProvider {
        FakeStatProvider::new().with_memory(VirtualMemory {
            total: 1000,
            available: 600,
            used: 400,
            used_percent: 40.0,
            free: 300,
            buffers: 50,
            cached: 250,
        })
    }

    fn build_for(os: OsFamily) -> MetricRecordSet {
        MemoryBuilder::new(Arc::new(HostIdentity::new("h1", os))).build_or_empty(&provider())
    }

    #[test]
    fn test_memory_on_linux_has_seven_gauges() {
        let records = build_for(OsFamily::Linux);
        assert_eq!(records.len(), 7);

        let buffers = records.iter().find(|r| r.name == "node_memory_buffers").unwrap();
        assert_eq!(buffers.label, "host=h1,os=linux");
        assert_eq!(buffers.value, 50.0);
        let cached = records.iter().find(|r| r.name == "node_memory_cached").unwrap();
        assert_eq!(cached.value, 250.0);
        assert_eq!(records[0].label, "host=h1");
    }

    #[test]
    fn test_memory_elsewhere_omits_linux_gauges() {
        for os in [OsFamily::Darwin, OsFamily::Windows, OsFamily::Other("plan9".into())] {
            let records = build_for(os);
            assert_eq!(records.len(), 5);
            assert!(records
                .iter()
                .all(|r| r.name != "node_memory_buffers" && r.name != "node_memory_cached"));
        }
    }

    #[test]
    fn test_memory_failure_yields_empty_set() {
        let provider = provider();
        provider.fail_memory();
        let builder = MemoryBuilder::new(Arc::new(HostIdentity::new("h1", OsFamily::Linux)));
        assert!(builder.build_or_empty(&provider).is_empty());
    }
}
