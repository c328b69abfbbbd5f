use redis_trace_fit::config::HarnessConfig;
use redis_trace_fit::harness::VerificationHarness;
use redis_trace_fit::redis::EmbeddedRedisServer;
use redis_trace_fit::telemetry::TelemetrySink;
use std::net::TcpListener;

/// Get an available port from the OS
pub fn get_available_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to port 0");
    listener.local_addr().expect("Failed to get local addr").port()
}

/// Embedded-mode config on a free port, or None when redis-server is not installed
pub fn embedded_config(test_name: &str) -> Option<HarnessConfig> {
    let binary = std::env::var("REDIS_SERVER_BINARY").unwrap_or_else(|_| "redis-server".to_string());
    if !EmbeddedRedisServer::binary_available(&binary) {
        eprintln!("Skipping '{}': {} not found", test_name, binary);
        return None;
    }

    Some(HarnessConfig {
        redis_server_embedded: true,
        redis_server_host: "127.0.0.1".to_string(),
        redis_server_port: get_available_port(),
        redis_server_binary: binary,
        startup_timeout_ms: 10_000,
        transaction_wait_ms: 2_000,
        poll_interval_ms: 10,
        ..HarnessConfig::default()
    })
}

/// Start an embedded store and a harness bound to it
pub async fn setup_harness(test_name: &str) -> Option<(VerificationHarness, TelemetrySink)> {
    let config = embedded_config(test_name)?;
    let sink = TelemetrySink::with_poll_interval(config.poll_interval());
    let harness = VerificationHarness::setup(config, sink.clone())
        .await
        .expect("Failed to set up harness with embedded redis-server");
    Some((harness, sink))
}
