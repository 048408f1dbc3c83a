//! The main application logic, decoupled from the entry point.

use crate::{
    builders::{node_builders, DeviceFilter},
    config::{Config, TransportKind},
    core::Transport,
    cycle::{CycleError, CycleReport, Envelope, ReportingCycle},
    host::HostIdentity,
    internal_metrics::{Metrics, MetricsBuilder},
    provider::{StatProvider, SystemStatProvider},
    scheduler::Scheduler,
    task_manager::TaskManager,
    transport::{HttpTransport, StdoutTransport},
};
use anyhow::Result;
use chrono::Utc;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{info, instrument};

/// A handle to the running application.
pub struct App {
    task_manager: TaskManager,
    metrics_addr: Option<SocketAddr>,
    cycle: Arc<ReportingCycle>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_addr
    }

    /// Runs a single reporting cycle immediately and returns its outcome.
    pub async fn run_once(&self) -> Result<CycleReport, CycleError> {
        self.cycle
            .run(Utc::now(), self.task_manager.get_shutdown_rx())
            .await
    }

    /// Waits for the shutdown signal and then gracefully shuts down all tasks.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.task_manager.get_shutdown_rx();
        let _ = shutdown_rx.wait_for(|stop| *stop).await;
        info!("Shutdown signal received. Waiting for tasks to complete...");

        let panicked = self.task_manager.shutdown().await;
        if !panicked.is_empty() {
            anyhow::bail!("tasks panicked during shutdown: {:?}", panicked);
        }
        Ok(())
    }
}

/// Builder for the main application.
///
/// Separates constructing the agent's components from running them, and lets
/// tests swap in fake collaborators.
pub struct AppBuilder {
    config: Config,
    provider_override: Option<Arc<dyn StatProvider>>,
    transport_override: Option<Arc<dyn Transport>>,
    identity_override: Option<HostIdentity>,
    metrics_override: Option<Metrics>,
    start_scheduler: bool,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            provider_override: None,
            transport_override: None,
            identity_override: None,
            metrics_override: None,
            start_scheduler: true,
        }
    }

    /// Overrides the stat provider for testing.
    pub fn provider_override(mut self, provider: Arc<dyn StatProvider>) -> Self {
        self.provider_override = Some(provider);
        self
    }

    /// Overrides the transport for testing.
    pub fn transport_override(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport_override = Some(transport);
        self
    }

    /// Overrides host identity detection.
    pub fn identity_override(mut self, identity: HostIdentity) -> Self {
        self.identity_override = Some(identity);
        self
    }

    /// Overrides the metrics system for testing.
    pub fn metrics_override(mut self, metrics: Metrics) -> Self {
        self.metrics_override = Some(metrics);
        self
    }

    /// Whether to spawn the periodic scheduler. Disabled for `--once`.
    pub fn start_scheduler(mut self, start: bool) -> Self {
        self.start_scheduler = start;
        self
    }

    /// Builds and initializes all application components, returning a runnable `App`.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        let task_manager = TaskManager::new(shutdown_rx);

        // =========================================================================
        // 1. Initialize Metrics
        // =========================================================================
        let (metrics, metrics_server_info) = match self.metrics_override {
            Some(m) => (m, None),
            None => MetricsBuilder::new(config.metrics.clone()).build(&task_manager)?,
        };
        let metrics = Arc::new(metrics);

        let metrics_addr = if let Some((server, addr)) = metrics_server_info {
            info!("Serving agent metrics on http://{}/metrics", addr);
            task_manager.spawn("MetricsServer", server.run());
            Some(addr)
        } else {
            None
        };

        // =========================================================================
        // 2. Host Identity and Collaborators
        // =========================================================================
        let identity = Arc::new(match self.identity_override {
            Some(identity) => identity,
            None => HostIdentity::detect(&config.agent)?,
        });
        info!(host = %identity.host_name, os = %identity.os_family, "Reporting as host");

        let provider: Arc<dyn StatProvider> = match self.provider_override {
            Some(provider) => provider,
            None => Arc::new(SystemStatProvider::new()),
        };

        let transport: Arc<dyn Transport> = match self.transport_override {
            Some(transport) => transport,
            None => match config.collector.transport {
                TransportKind::Http => Arc::new(HttpTransport::new(
                    &config.collector.url,
                    Duration::from_millis(config.collector.timeout_ms),
                )?),
                TransportKind::Stdout => Arc::new(StdoutTransport::new()),
            },
        };

        // =========================================================================
        // 3. Reporting Cycle
        // =========================================================================
        let builders = node_builders(
            identity.clone(),
            DeviceFilter::new(config.disk.device_patterns.clone()),
        );
        let cycle = Arc::new(ReportingCycle::new(
            identity,
            provider,
            builders,
            transport,
            Envelope {
                source_path: config.agent.source_path.clone(),
                partition: config.agent.partition,
                ..Envelope::default()
            },
            metrics,
        ));

        if self.start_scheduler {
            let scheduler = Scheduler::new(
                cycle.clone(),
                Duration::from_secs(config.agent.interval_seconds),
                task_manager.get_shutdown_rx(),
            );
            task_manager.spawn("Scheduler", scheduler.run());
        }

        Ok(App {
            task_manager,
            metrics_addr,
            cycle,
        })
    }
}
