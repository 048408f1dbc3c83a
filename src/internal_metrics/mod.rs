//! # Internal Metrics Module
//!
//! Self-observability for the agent, separate from the host metrics it ships
//! to the collector.
//!
//! ## Components:
//!
//! - **`MetricsBuilder`**: installs the Prometheus recorder, binds the
//!   metrics listener and constructs the `Metrics` handle.
//!
//! - **`Metrics`**: a cloneable set of handles the reporting cycle updates.
//!
//! - **`MetricsServer`**: (Defined in `server.rs`) An `axum`-based web server
//!   exposing `/metrics` for Prometheus to scrape.

use crate::config::MetricsConfig;
use crate::internal_metrics::server::MetricsServer;
use crate::task_manager::TaskManager;
use anyhow::{Context, Result};
use metrics::{Counter, Gauge, Histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

pub mod server;

/// The public API for the metrics system.
#[derive(Clone)]
pub struct Metrics {
    pub cycles_total: Counter,
    pub cycle_faults_total: Counter,
    pub transport_failures_total: Counter,
    batch_entries: Gauge,
    cycle_duration_seconds: Histogram,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Registers descriptions with the global recorder and creates handles.
    pub fn new() -> Self {
        metrics::describe_counter!("agent_cycles_total", Unit::Count, "Total number of reporting cycles run, whatever their outcome.");
        metrics::describe_counter!("agent_cycle_faults_total", Unit::Count, "Cycles aborted by an unexpected fault.");
        metrics::describe_counter!("agent_builder_failures_total", Unit::Count, "Builder invocations that contributed nothing because a stat query failed, labeled by builder.");
        metrics::describe_counter!("agent_transport_failures_total", Unit::Count, "Batches dropped because the transport failed.");
        metrics::describe_gauge!("agent_batch_entries", Unit::Count, "Number of entries in the most recently assembled batch.");
        metrics::describe_histogram!("agent_cycle_duration_seconds", Unit::Seconds, "Wall time of a reporting cycle, sampling and transmission included.");

        Self {
            cycles_total: metrics::counter!("agent_cycles_total"),
            cycle_faults_total: metrics::counter!("agent_cycle_faults_total"),
            transport_failures_total: metrics::counter!("agent_transport_failures_total"),
            batch_entries: metrics::gauge!("agent_batch_entries"),
            cycle_duration_seconds: metrics::histogram!("agent_cycle_duration_seconds"),
        }
    }

    pub fn set_batch_entries(&self, entries: usize) {
        self.batch_entries.set(entries as f64);
    }

    pub fn record_cycle_duration(&self, elapsed: Duration) {
        self.cycle_duration_seconds.record(elapsed.as_secs_f64());
    }

    /// Creates a `Metrics` instance suitable for testing.
    ///
    /// Without an installed recorder the `metrics` facade is a no-op, so the
    /// handles accept updates and discard them.
    pub fn new_for_test() -> Self {
        Self::new()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for the metrics system.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Initializes the metrics system.
    ///
    /// When disabled, returns no-op handles and no server. Otherwise installs
    /// the Prometheus recorder and returns the server with its bound address.
    pub fn build(self, task_manager: &TaskManager) -> Result<(Metrics, Option<(MetricsServer, SocketAddr)>)> {
        if !self.config.enabled {
            return Ok((Metrics::new(), None));
        }

        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            )
            .context("invalid histogram buckets")?
            .build_recorder();
        let handle = recorder.handle();

        let listener = std::net::TcpListener::bind(self.config.listen_address)
            .with_context(|| format!("failed to bind metrics server to {}", self.config.listen_address))?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(listener)?;

        metrics::set_global_recorder(recorder)
            .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {}", e))?;

        let metrics = Metrics::new();
        let server = MetricsServer::new(listener, handle, task_manager.get_shutdown_rx());
        Ok((metrics, Some((server, addr))))
    }
}
