//! Modbus register-block polling binding.
//!
//! Polls the configured devices over a shared TCP or RTU endpoint and
//! writes decoded measurements as JSON lines to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use regpoll_binding::binding::PollBinding;
use regpoll_binding::config::BindingConfig;
use regpoll_binding::status::{MeasurementSink, TracingStatusSink};
use regpoll_binding::transport::TransportBridge;
use regpoll_common::Measurement;

/// Modbus register-block polling binding (TCP/RTU).
#[derive(Parser, Debug)]
#[command(name = "regpoll-binding")]
#[command(about = "Polls Modbus devices and emits decoded measurements")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format)
    #[arg(short, long, default_value = "regpoll.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

/// Writes each measurement as one JSON line to stdout.
struct JsonLineSink;

impl MeasurementSink for JsonLineSink {
    fn publish(&self, measurement: &Measurement) {
        match serde_json::to_string(measurement) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(error = %e, "Failed to encode measurement"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = BindingConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Initialize logging
    let mut log_config = config.logging.clone();
    if let Some(level) = args.log_level.clone() {
        log_config.level = level;
    }
    regpoll_common::init_tracing(&log_config)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    info!("Starting regpoll-binding");
    info!("Loaded configuration from {:?}", args.config);

    if !config.registers.is_empty() {
        warn!("'registers' is reserved for future use and currently ignored");
    }

    // Establish the shared endpoint
    let label = config.connection.label();
    info!("Connecting to {}...", label);
    let bridge = TransportBridge::connect(label.as_str(), &config.connection, config.connect_timeout())
        .await
        .with_context(|| format!("Failed to connect to {}", label))?;
    info!("Connected to {}", label);

    // Wire the binding to its host seams
    let binding = PollBinding::new(
        &config,
        Some(Arc::new(bridge)),
        Arc::new(TracingStatusSink),
        Arc::new(JsonLineSink),
    );

    match binding.channels() {
        Ok(channels) => info!("Exposing {} channel(s): {:?}", channels.len(), channels),
        Err(e) => warn!(error = %e, "Invalid device id list"),
    }

    binding
        .initialize()
        .await
        .context("Failed to initialize binding")?;

    info!(
        "Binding running with {} poll job(s). Press Ctrl+C to stop.",
        binding.active_jobs()
    );

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    binding
        .dispose()
        .await
        .context("Failed to stop poll jobs")?;
    info!("Binding stopped");

    Ok(())
}
