use super::TransportError;
use crate::core::{Ack, CancelToken, MetricBatch, Transport};
use async_trait::async_trait;
use std::io::Write;

/// Writes each batch to stdout as one JSON document per line.
#[derive(Debug, Default)]
pub struct StdoutTransport;

impl StdoutTransport {
    pub fn new() -> Self {
        Self
    }

    /// Renders a batch the way it is written to stdout.
    pub fn render(batch: &MetricBatch) -> Result<String, TransportError> {
        Ok(serde_json::to_string(batch)?)
    }
}

#[async_trait]
impl Transport for StdoutTransport {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn send(&self, _cancel: CancelToken, batch: &MetricBatch) -> Result<Ack, TransportError> {
        let line = Self::render(batch)?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        stdout.flush()?;
        Ok(Ack {
            entries: batch.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_batch() {
        assert_eq!(StdoutTransport::render(&MetricBatch::new()).unwrap(), r#"{"metrics":[]}"#);
    }
}
