//! The agent's own Prometheus endpoint. Kept in its own test binary because
//! it installs the process-global metrics recorder.

use anyhow::Result;
use nodeagent::{
    app::AppBuilder,
    config::Config,
    host::{HostIdentity, OsFamily},
    transport::test_utils::RecordingTransport,
};
use std::sync::Arc;
use tokio::sync::watch;

mod helpers;
use helpers::{healthy_provider, HEALTHY_ENTRIES};

#[tokio::test]
async fn test_metrics_endpoint_exposes_cycle_metrics() -> Result<()> {
    let mut config = Config::default();
    config.metrics.enabled = true;
    config.metrics.listen_address = "127.0.0.1:0".parse()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let app = AppBuilder::new(config)
        .identity_override(HostIdentity::new("h1", OsFamily::Linux))
        .provider_override(Arc::new(healthy_provider()))
        .transport_override(Arc::new(RecordingTransport::new()))
        .start_scheduler(false)
        .build(shutdown_rx)
        .await?;
    let addr = app.metrics_addr().expect("metrics server should be running");

    app.run_once().await?;

    let body = reqwest::get(format!("http://{}/metrics", addr))
        .await?
        .text()
        .await?;
    let entries = body
        .lines()
        .find_map(|line| line.strip_prefix("agent_batch_entries "))
        .and_then(|value| value.trim().parse::<f64>().ok());
    assert_eq!(entries, Some(HEALTHY_ENTRIES as f64), "unexpected metrics body:\n{}", body);

    shutdown_tx.send(true)?;
    app.run().await?;
    Ok(())
}
