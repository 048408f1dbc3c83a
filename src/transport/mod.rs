//! Transports that ship finished batches to the collector.

pub mod http;
pub mod stdout;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use thiserror::Error;

pub use crate::core::{Ack, Transport};
pub use http::HttpTransport;
pub use stdout::StdoutTransport;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request to collector failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("collector rejected batch: status {status}, body: {body}")]
    Status { status: u16, body: String },

    #[error("failed to encode batch: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write batch: {0}")]
    Io(#[from] std::io::Error),

    #[error("send cancelled due to shutdown")]
    Cancelled,
}
