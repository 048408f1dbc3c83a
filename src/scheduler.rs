//! Fixed-cadence driver for the reporting cycle.

use crate::cycle::ReportingCycle;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// Invokes the reporting cycle on a fixed interval until shutdown.
///
/// Cycles never overlap: a cycle that outlasts the interval makes the
/// scheduler skip the ticks it missed.
pub struct Scheduler {
    cycle: Arc<ReportingCycle>,
    period: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl Scheduler {
    pub fn new(cycle: Arc<ReportingCycle>, period: Duration, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            cycle,
            period,
            shutdown_rx,
        }
    }

    /// Runs the scheduling loop. The first cycle starts immediately.
    pub async fn run(mut self) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Reporting every {}s", self.period.as_secs_f64());

        loop {
            tokio::select! {
                biased;
                _ = shutdown_signalled(&mut self.shutdown_rx) => {
                    info!("Scheduler received shutdown signal.");
                    break;
                }
                _ = ticker.tick() => {
                    self.cycle.run_guarded(Utc::now(), self.shutdown_rx.clone()).await;
                }
            }
        }
        info!("Scheduler finished.");
    }
}

/// Resolves once shutdown is requested or the sender is gone.
async fn shutdown_signalled(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}
