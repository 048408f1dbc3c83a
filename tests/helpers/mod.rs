#![allow(dead_code)]
//! Shared fixtures for the integration tests.

use anyhow::Result;
use nodeagent::{
    app::{App, AppBuilder},
    config::Config,
    host::{HostIdentity, OsFamily},
    internal_metrics::Metrics,
    provider::{test_utils::FakeStatProvider, CpuTimes, VirtualMemory},
    transport::test_utils::RecordingTransport,
};
use std::sync::Arc;
use tokio::sync::watch;

pub fn cpu(label: &str) -> CpuTimes {
    CpuTimes {
        label: label.to_string(),
        user: 12.5,
        system: 3.25,
        idle: 400.0,
    }
}

/// A provider where every query succeeds: 3 load, 9 cpu (aggregate + 2
/// cores), 7 memory on Linux and 3 disk records.
pub fn healthy_provider() -> FakeStatProvider {
    FakeStatProvider::new()
        .with_load(0.5, 0.8, 1.2)
        .with_cpu(cpu("cpu-total"), vec![cpu("cpu0"), cpu("cpu1")])
        .with_memory(VirtualMemory {
            total: 8_000,
            available: 6_000,
            used: 2_000,
            used_percent: 25.0,
            free: 5_000,
            buffers: 100,
            cached: 900,
        })
        .with_partition("/", "/dev/sda1")
        .with_usage("/", 100_000, 40_000)
        .with_usage("/dev/sda1", 1, 1)
        .with_partition("/run", "tmpfs")
        .with_usage("/run", 10, 10)
        .with_usage("tmpfs", 10, 10)
}

pub const HEALTHY_ENTRIES: usize = 3 + 9 + 7 + 3;

/// A running agent wired to fakes.
pub struct TestAgent {
    pub app: App,
    pub provider: Arc<FakeStatProvider>,
    pub transport: Arc<RecordingTransport>,
    pub shutdown_tx: watch::Sender<bool>,
}

pub struct TestAgentBuilder {
    pub config: Config,
    provider: FakeStatProvider,
    os_family: OsFamily,
    start_scheduler: bool,
}

impl TestAgentBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            provider: healthy_provider(),
            os_family: OsFamily::Linux,
            start_scheduler: true,
        }
    }

    pub fn with_provider(mut self, provider: FakeStatProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_os_family(mut self, os_family: OsFamily) -> Self {
        self.os_family = os_family;
        self
    }

    pub fn without_scheduler(mut self) -> Self {
        self.start_scheduler = false;
        self
    }

    pub async fn build(self) -> Result<TestAgent> {
        let provider = Arc::new(self.provider);
        let transport = Arc::new(RecordingTransport::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let app = AppBuilder::new(self.config)
            .identity_override(HostIdentity::new("h1", self.os_family))
            .provider_override(provider.clone())
            .transport_override(transport.clone())
            .metrics_override(Metrics::new_for_test())
            .start_scheduler(self.start_scheduler)
            .build(shutdown_rx)
            .await?;

        Ok(TestAgent {
            app,
            provider,
            transport,
            shutdown_tx,
        })
    }
}
