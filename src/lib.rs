/// nodeagent - A node-level telemetry agent
///
/// This library samples host load, CPU, memory and disk usage, folds the
/// samples into one batch per reporting cycle and ships it to a collector,
/// isolating every failure to the cycle it happened in.
pub mod app;
pub mod builders;
pub mod cli;
pub mod config;
pub mod core;
pub mod cycle;
pub mod host;
pub mod internal_metrics;
pub mod provider;
pub mod scheduler;
pub mod task_manager;
pub mod transport;

// Re-export core types for convenience
pub use crate::core::*;
