use crate::core::{Label, MetricBuilder, MetricRecord, MetricRecordSet};
use crate::host::HostIdentity;
use crate::provider::{ProviderError, StatProvider};
use std::sync::Arc;

/// Builds `node_cpu_{user,system,idle}` for the aggregate and every core.
///
/// Both the aggregate and the per-core query must succeed; a failure in
/// either drops the whole contribution.
pub struct CpuBuilder {
    identity: Arc<HostIdentity>,
}

impl CpuBuilder {
    pub fn new(identity: Arc<HostIdentity>) -> Self {
        Self { identity }
    }
}

impl MetricBuilder for CpuBuilder {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn build(&self, provider: &dyn StatProvider) -> Result<MetricRecordSet, ProviderError> {
        let mut samples = provider.cpu_times(false)?;
        samples.extend(provider.cpu_times(true)?);

        let mut records = Vec::with_capacity(samples.len() * 3);
        for sample in samples {
            let label = Label::host(&self.identity.host_name).with("cpu", sample.label);
            records.push(MetricRecord::gauge("node_cpu_user", &label, sample.user));
            records.push(MetricRecord::gauge("node_cpu_system", &label, sample.system));
            records.push(MetricRecord::gauge("node_cpu_idle", &label, sample.idle));
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::OsFamily;
    use crate::provider::test_utils::FakeStatProvider;
    use crate::provider::CpuTimes;

    fn times(label: &str, user: f64, system: f64, idle: f64) -> CpuTimes {
        CpuTimes {
            label: label.to_string(),
            user,
            system,
            idle,
        }
    }

    fn provider() -> FakeStatProvider {
        FakeStatProvider::new().with_cpu(
            times("cpu-total", 10.0, 5.0, 80.0),
            vec![times("cpu0", 6.0, 3.0, 40.0), times("cpu1", 4.0, 2.0, 40.0)],
        )
    }

    fn builder() -> CpuBuilder {
        CpuBuilder::new(Arc::new(HostIdentity::new("h1", OsFamily::Linux)))
    }

    #[test]
    fn test_cpu_emits_aggregate_then_cores() {
        let records = builder().build_or_empty(&provider());
        assert_eq!(records.len(), 9);

        let labels: Vec<_> = records.iter().step_by(3).map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["host=h1,cpu=cpu-total", "host=h1,cpu=cpu0", "host=h1,cpu=cpu1"]);

        let names: Vec<_> = records[..3].iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["node_cpu_user", "node_cpu_system", "node_cpu_idle"]);
        assert_eq!(records[5].value, 40.0);
    }

    #[test]
    fn test_cpu_per_core_failure_discards_aggregate() {
        let provider = provider();
        provider.fail_per_core_cpu();

        let records = builder().build_or_empty(&provider);

        assert!(records.is_empty());
        // The aggregate query did run and succeed before the per-core one failed.
        assert_eq!(provider.calls(), vec!["cpu_times(false)", "cpu_times(true)"]);
    }

    #[test]
    fn test_cpu_aggregate_failure_skips_per_core_query() {
        let provider = FakeStatProvider::new();
        assert!(builder().build_or_empty(&provider).is_empty());
        assert_eq!(provider.calls(), vec!["cpu_times(false)"]);
    }
}
