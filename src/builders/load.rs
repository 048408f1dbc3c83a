use crate::core::{Label, MetricBuilder, MetricRecord, MetricRecordSet};
use crate::host::HostIdentity;
use crate::provider::{ProviderError, StatProvider};
use std::sync::Arc;
use tracing::debug;

/// Builds `node_cpu_load_avg_{1,5,15}`.
pub struct LoadBuilder {
    identity: Arc<HostIdentity>,
}

impl LoadBuilder {
    pub fn new(identity: Arc<HostIdentity>) -> Self {
        Self { identity }
    }
}

impl MetricBuilder for LoadBuilder {
    fn name(&self) -> &'static str {
        "load"
    }

    fn build(&self, provider: &dyn StatProvider) -> Result<MetricRecordSet, ProviderError> {
        let avg = provider.load_average()?;
        debug!(
            "Load Avg. load1: {}, load5: {}, load15: {}",
            avg.load1, avg.load5, avg.load15
        );

        let label = Label::host(&self.identity.host_name);
        Ok(vec![
            MetricRecord::gauge("node_cpu_load_avg_1", &label, avg.load1),
            MetricRecord::gauge("node_cpu_load_avg_5", &label, avg.load5),
            MetricRecord::gauge("node_cpu_load_avg_15", &label, avg.load15),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MetricKind;
    use crate::host::OsFamily;
    use crate::provider::test_utils::FakeStatProvider;

    fn builder() -> LoadBuilder {
        LoadBuilder::new(Arc::new(HostIdentity::new("h1", OsFamily::Linux)))
    }

    #[test]
    fn test_load_builds_three_gauges() {
        let provider = FakeStatProvider::new().with_load(0.5, 0.8, 1.2);
        let records = builder().build_or_empty(&provider);

        let got: Vec<_> = records
            .iter()
            .map(|r| (r.name.as_str(), r.label.as_str(), r.value))
            .collect();
        assert_eq!(
            got,
            vec![
                ("node_cpu_load_avg_1", "host=h1", 0.5),
                ("node_cpu_load_avg_5", "host=h1", 0.8),
                ("node_cpu_load_avg_15", "host=h1", 1.2),
            ]
        );
        assert!(records.iter().all(|r| r.kind == MetricKind::Gauge));
    }

    #[test]
    fn test_load_failure_yields_empty_set() {
        let provider = FakeStatProvider::new();
        assert!(builder().build(&provider).is_err());
        assert!(builder().build_or_empty(&provider).is_empty());
    }
}
