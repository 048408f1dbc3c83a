use nodeagent::cli::Cli;
use nodeagent::config::{Config, TransportKind};
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

fn cli_for(file: &NamedTempFile) -> Cli {
    Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    }
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

#[test]
#[serial]
fn test_load_full_valid_config() {
    let file = write_config(
        r#"
        log_level = "debug"
        [agent]
        interval_seconds = 30
        host_name = "worker-3"
        os_family = "linux"
        source_path = "/node/metrics"
        partition = 2
        [collector]
        transport = "Http"
        url = "http://collector.internal:9300/api/v1/metrics"
        timeout_ms = 1500
        [disk]
        device_patterns = ["/dev/sd", "/dev/nvme"]
        [metrics]
        enabled = true
        listen_address = "0.0.0.0:9400"
    "#,
    );

    let config = Config::load(&cli_for(&file)).unwrap();

    assert_eq!(config.log_level, "debug");
    assert_eq!(config.agent.interval_seconds, 30);
    assert_eq!(config.agent.host_name.as_deref(), Some("worker-3"));
    assert_eq!(config.agent.os_family.as_deref(), Some("linux"));
    assert_eq!(config.agent.partition, 2);
    assert_eq!(config.collector.transport, TransportKind::Http);
    assert_eq!(config.collector.url, "http://collector.internal:9300/api/v1/metrics");
    assert_eq!(config.collector.timeout_ms, 1500);
    assert_eq!(config.disk.device_patterns, vec!["/dev/sd", "/dev/nvme"]);
    assert!(config.metrics.enabled);
    assert_eq!(config.metrics.listen_address.port(), 9400);
}

#[test]
#[serial]
fn test_load_default_values() {
    let file = write_config("");

    let config = Config::load(&cli_for(&file)).unwrap();

    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn test_partial_section_keeps_other_defaults() {
    let file = write_config(
        r#"
        [collector]
        timeout_ms = 250
    "#,
    );

    let config = Config::load(&cli_for(&file)).unwrap();

    assert_eq!(config.collector.timeout_ms, 250);
    assert_eq!(config.collector.url, Config::default().collector.url);
    assert_eq!(config.agent, Config::default().agent);
}

#[test]
#[serial]
fn test_cli_overrides_file() {
    let file = write_config(
        r#"
        [agent]
        interval_seconds = 30
        host_name = "from-file"
    "#,
    );
    let cli = Cli {
        interval: Some(5),
        hostname: Some("from-cli".to_string()),
        collector_url: Some("http://other:1/ingest".to_string()),
        stdout: true,
        ..cli_for(&file)
    };

    let config = Config::load(&cli).unwrap();

    assert_eq!(config.agent.interval_seconds, 5);
    assert_eq!(config.agent.host_name.as_deref(), Some("from-cli"));
    assert_eq!(config.collector.url, "http://other:1/ingest");
    assert_eq!(config.collector.transport, TransportKind::Stdout);
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let file = write_config(
        r#"
        [collector]
        timeout_ms = 1000
    "#,
    );
    std::env::set_var("NODEAGENT_COLLECTOR__TIMEOUT_MS", "2500");

    let config = Config::load(&cli_for(&file));
    std::env::remove_var("NODEAGENT_COLLECTOR__TIMEOUT_MS");

    assert_eq!(config.unwrap().collector.timeout_ms, 2500);
}

#[test]
#[serial]
fn test_invalid_value_type() {
    let file = write_config(
        r#"
        [agent]
        interval_seconds = "ten"
    "#,
    );

    assert!(Config::load(&cli_for(&file)).is_err());
}

#[test]
#[serial]
fn test_zero_interval_is_rejected() {
    let file = write_config(
        r#"
        [agent]
        interval_seconds = 0
    "#,
    );

    assert!(Config::load(&cli_for(&file)).is_err());
}
