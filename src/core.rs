//! Core domain types and service traits for the node agent
//!
//! This module defines the metric record model, the per-cycle batch envelope,
//! and the trait contracts for the collaborators the reporting pipeline talks
//! to (stat providers and transports).

use crate::provider::ProviderError;
use crate::transport::TransportError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

/// Source path stamped on every node-level batch entry.
pub const NODE_SOURCE_PATH: &str = "/node/metrics";

/// Cancellation signal handed to transports. It flips to `true` when the agent
/// is shutting down; the core never inspects it.
pub type CancelToken = watch::Receiver<bool>;

/// The kind of a metric. Only instantaneous gauges are produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    #[default]
    Gauge,
}

/// The category a batch entry is filed under at the collector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum MetricCategory {
    #[default]
    Node,
}

/// A single named measurement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    /// Metric identifier, e.g. `node_cpu_load_avg_1`.
    #[serde(rename = "metricName")]
    pub name: String,
    /// Comma-joined `key=value` tags.
    pub label: String,
    pub kind: MetricKind,
    pub value: f64,
}

impl MetricRecord {
    /// Creates a gauge record.
    pub fn gauge(name: impl Into<String>, label: &Label, value: f64) -> Self {
        Self {
            name: name.into(),
            label: label.to_string(),
            kind: MetricKind::Gauge,
            value,
        }
    }
}

/// The records produced by one builder invocation.
pub type MetricRecordSet = Vec<MetricRecord>;

/// An ordered set of `key=value` tags, rendered as `k1=v1,k2=v2`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Label {
    tags: Vec<(String, String)>,
}

impl Label {
    /// Starts a label carrying the host identity tag.
    pub fn host(host_name: &str) -> Self {
        Self::default().with("host", host_name)
    }

    /// Appends a tag. Tags render in insertion order.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.tags.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

/// One record wrapped in the batch envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub category: MetricCategory,
    pub source_path: String,
    pub node_id: String,
    pub partition: i32,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub record: MetricRecord,
}

/// The outgoing envelope for one reporting cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetricBatch {
    #[serde(rename = "metrics")]
    entries: Vec<BatchEntry>,
}

impl MetricBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entry per record, each stamped with the same envelope.
    ///
    /// Records keep their order; entries from earlier calls stay in front.
    pub fn append(
        &mut self,
        records: MetricRecordSet,
        category: MetricCategory,
        source_path: &str,
        node_id: &str,
        partition: i32,
        timestamp: DateTime<Utc>,
    ) {
        self.entries.reserve(records.len());
        self.entries.extend(records.into_iter().map(|record| BatchEntry {
            category,
            source_path: source_path.to_string(),
            node_id: node_id.to_string(),
            partition,
            timestamp,
            record,
        }));
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entries whose metric name matches `name`.
    pub fn by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a BatchEntry> + 'a {
        self.entries.iter().filter(move |e| e.record.name == name)
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// Turns raw OS statistics into a record set for one metric family.
pub trait MetricBuilder: Send + Sync {
    /// A short name for logs and self-metrics (e.g. "load", "disk").
    fn name(&self) -> &'static str;

    /// Queries the provider and builds the records.
    ///
    /// # Returns
    /// * `Ok(records)` on success
    /// * `Err` if a provider query failed; the builder's policy decides
    ///   whether a single failure discards everything
    fn build(&self, provider: &dyn crate::provider::StatProvider) -> Result<MetricRecordSet, ProviderError>;

    /// Builds the records, degrading to an empty set when the provider fails.
    fn build_or_empty(&self, provider: &dyn crate::provider::StatProvider) -> MetricRecordSet {
        match self.build(provider) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(builder = self.name(), "Failed to sample {} stats: {}", self.name(), e);
                metrics::counter!("agent_builder_failures_total", "builder" => self.name()).increment(1);
                Vec::new()
            }
        }
    }
}

/// Acknowledgement returned by a transport after a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ack {
    /// Number of entries handed over.
    pub entries: usize,
}

/// Ships a finished batch to the collector.
#[async_trait]
pub trait Transport: Send + Sync {
    /// A descriptive name for the transport (e.g., "http", "stdout").
    fn name(&self) -> &str;

    /// Sends a batch once. Implementations must not retry.
    ///
    /// # Arguments
    /// * `cancel` - Shutdown signal; implementations may abort early on it
    /// * `batch` - The batch to send
    async fn send(&self, cancel: CancelToken, batch: &MetricBatch) -> Result<Ack, TransportError>;
}
