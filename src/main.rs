//! nodeagent - Node Telemetry Agent
//!
//! Samples host resource usage on a fixed cadence and reports it to a remote
//! collector.

use anyhow::Result;
use clap::Parser;
use nodeagent::{app::App, cli::Cli, config::Config};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        tracing_subscriber::fmt().init();
        error!("Failed to load configuration: {:#}", err);
        std::process::exit(1);
    });

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("nodeagent starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Interval: {}s", config.agent.interval_seconds);
    info!("Transport: {:?}", config.collector.transport);
    info!("Collector URL: {}", config.collector.url);
    info!("Collector Timeout: {}ms", config.collector.timeout_ms);
    info!("Source Path: {}", config.agent.source_path);
    info!("Device Patterns: {}", config.disk.device_patterns.join(", "));
    info!(
        "Agent Metrics: {}",
        if config.metrics.enabled {
            config.metrics.listen_address.to_string()
        } else {
            "Disabled".to_string()
        }
    );
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let app = App::builder(config)
        .start_scheduler(!cli.once)
        .build(shutdown_rx)
        .await?;

    if cli.once {
        let report = app.run_once().await?;
        info!("Sent {} metrics.", report.entries);
        return Ok(());
    }

    let signal_task = tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received. Shutting down gracefully...");
        let _ = shutdown_tx.send(true);
    });

    app.run().await?;
    signal_task.abort();

    info!("All tasks shut down. Exiting.");
    Ok(())
}
