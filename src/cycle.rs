//! The reporting cycle: sample every builder, assemble one batch, send it once.
//!
//! A cycle walks `Start → Sample(load) → Sample(cpu) → Sample(memory) →
//! Sample(disk) → Transmit → Done` unconditionally. A builder that fails
//! contributes nothing and the walk continues. The whole body runs behind a
//! panic boundary so one bad cycle never takes the agent down; at worst the
//! cycle's metrics are lost.

use crate::core::{Ack, CancelToken, MetricBatch, MetricBuilder, MetricCategory, Transport};
use crate::host::HostIdentity;
use crate::internal_metrics::Metrics;
use crate::provider::StatProvider;
use crate::transport::TransportError;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

/// Why a cycle's batch was lost.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("failed to send metrics: {0}")]
    Transport(#[from] TransportError),

    #[error("reporting cycle aborted by unexpected fault: {0}")]
    UnexpectedFault(String),
}

/// Outcome of a delivered cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Entries in the batch that was sent.
    pub entries: usize,
    /// What the transport acknowledged.
    pub ack: Ack,
}

/// Envelope fields shared by every entry the cycle produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub category: MetricCategory,
    pub source_path: String,
    pub partition: i32,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            category: MetricCategory::Node,
            source_path: crate::core::NODE_SOURCE_PATH.to_string(),
            partition: 0,
        }
    }
}

/// The sampling half of a cycle. Every query it makes may block.
struct Sampler {
    identity: Arc<HostIdentity>,
    provider: Arc<dyn StatProvider>,
    builders: Vec<Box<dyn MetricBuilder>>,
    envelope: Envelope,
}

impl Sampler {
    fn collect(&self, timestamp: DateTime<Utc>) -> MetricBatch {
        let mut batch = MetricBatch::new();
        for builder in &self.builders {
            let records = builder.build_or_empty(self.provider.as_ref());
            debug!(builder = builder.name(), records = records.len(), "Sampled");
            batch.append(
                records,
                self.envelope.category,
                &self.envelope.source_path,
                &self.identity.host_name,
                self.envelope.partition,
                timestamp,
            );
        }
        batch
    }
}

/// Drives the builders and the transport for one cycle at a time.
///
/// Holds no state that changes between cycles, so it can be shared behind an
/// `Arc` and invoked concurrently without locking.
pub struct ReportingCycle {
    sampler: Arc<Sampler>,
    transport: Arc<dyn Transport>,
    metrics: Arc<Metrics>,
}

impl ReportingCycle {
    pub fn new(
        identity: Arc<HostIdentity>,
        provider: Arc<dyn StatProvider>,
        builders: Vec<Box<dyn MetricBuilder>>,
        transport: Arc<dyn Transport>,
        envelope: Envelope,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            sampler: Arc::new(Sampler {
                identity,
                provider,
                builders,
                envelope,
            }),
            transport,
            metrics,
        }
    }

    /// Runs every builder in order and folds their output into a new batch.
    ///
    /// Runs on the blocking thread pool, since provider queries hit procfs
    /// and `statvfs`. A panic in a builder is resumed on the caller.
    pub async fn collect(&self, timestamp: DateTime<Utc>) -> Result<MetricBatch, CycleError> {
        let sampler = self.sampler.clone();
        let span = tracing::Span::current();
        let sample = move || span.in_scope(|| sampler.collect(timestamp));
        match tokio::task::spawn_blocking(sample).await {
            Ok(batch) => Ok(batch),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(CycleError::UnexpectedFault(e.to_string())),
        }
    }

    /// Runs one cycle and reports its outcome to the caller.
    ///
    /// Panics raised anywhere in the cycle are caught and returned as
    /// [`CycleError::UnexpectedFault`]. The batch is dropped before this
    /// returns, whatever the outcome.
    pub async fn run(&self, timestamp: DateTime<Utc>, cancel: CancelToken) -> Result<CycleReport, CycleError> {
        let body = async {
            let batch = self.collect(timestamp).await?;
            self.metrics.set_batch_entries(batch.len());
            let ack = self.transport.send(cancel, &batch).await?;
            Ok::<_, CycleError>(CycleReport {
                entries: batch.len(),
                ack,
            })
        };

        match AssertUnwindSafe(body).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(CycleError::UnexpectedFault(panic_message(payload.as_ref()))),
        }
    }

    /// Runs one cycle, logging any failure instead of returning it.
    #[instrument(skip(self, cancel), fields(host = %self.sampler.identity.host_name))]
    pub async fn run_guarded(&self, timestamp: DateTime<Utc>, cancel: CancelToken) {
        let start = Instant::now();
        let result = self.run(timestamp, cancel).await;
        self.metrics.record_cycle_duration(start.elapsed());
        self.metrics.cycles_total.increment(1);

        match result {
            Ok(report) => {
                info!(
                    "Sent {} metrics via {} transport",
                    report.entries,
                    self.transport.name()
                );
            }
            Err(e @ CycleError::Transport(_)) => {
                self.metrics.transport_failures_total.increment(1);
                error!("Failed sendMetrics via {}: {}", self.transport.name(), e);
            }
            Err(e @ CycleError::UnexpectedFault(_)) => {
                self.metrics.cycle_faults_total.increment(1);
                error!("{}", e);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
