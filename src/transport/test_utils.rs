use super::TransportError;
use crate::core::{Ack, CancelToken, MetricBatch, Transport};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// A transport that keeps every batch it receives.
///
/// It can be told to fail or panic on upcoming sends to exercise the
/// reporting cycle's error handling.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    batches: Arc<Mutex<Vec<MetricBatch>>>,
    attempts: Arc<Mutex<usize>>,
    fail: Arc<Mutex<bool>>,
    panic_next: Arc<Mutex<bool>>,
    notifier: Arc<Notify>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes all subsequent sends fail until reset.
    pub fn set_fail_on_send(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    /// Makes the next send panic.
    pub fn panic_on_next_send(&self) {
        *self.panic_next.lock().unwrap() = true;
    }

    /// Batches successfully delivered so far.
    pub fn batches(&self) -> Vec<MetricBatch> {
        self.batches.lock().unwrap().clone()
    }

    /// Number of send calls, successful or not.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    /// Waits until at least `count` send attempts were made.
    pub async fn wait_for_attempts(&self, count: usize, timeout: std::time::Duration) {
        let wait = async {
            loop {
                let notified = self.notifier.notified();
                if self.attempts() >= count {
                    break;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .expect("Timed out waiting for send attempts");
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording_mock"
    }

    async fn send(&self, _cancel: CancelToken, batch: &MetricBatch) -> Result<Ack, TransportError> {
        *self.attempts.lock().unwrap() += 1;
        self.notifier.notify_waiters();

        let should_panic = std::mem::take(&mut *self.panic_next.lock().unwrap());
        if should_panic {
            panic!("recording transport asked to panic");
        }
        if *self.fail.lock().unwrap() {
            return Err(TransportError::Status {
                status: 503,
                body: "recording transport configured to fail".to_string(),
            });
        }

        self.batches.lock().unwrap().push(batch.clone());
        Ok(Ack {
            entries: batch.len(),
        })
    }
}
