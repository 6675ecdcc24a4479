//! E-Paper Status Display for Raspberry Pi
//!
//! A small service that:
//! - Keeps a network link and MQTT session alive
//! - Decodes JSON status payloads from one topic
//! - Redraws an SSD1680 e-paper panel at a fixed interval
//! - Announces presence with a retained online message and last-will
//! - Runs as a systemd service with graceful shutdown

mod config;
mod connectivity;
mod controller;
mod decoder;
mod display;
mod scheduler;
mod status;

use clap::Parser;
use config::Config;
use connectivity::mqtt::BrokerEndpoint;
use connectivity::{
    ConnectivityManager, ConnectivitySettings, InterfaceLink, MqttBroker, Presence,
};
use controller::Controller;
use decoder::PayloadDecoder;
use display::{DisplayAdapter, RenderContext};
use scheduler::RenderScheduler;
use status::{StatusDefaults, StatusModel};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "epaper-status-display")]
#[command(about = "MQTT-driven status display for SSD1680 e-paper panels")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Render a demo status once and exit
    #[arg(long)]
    test: bool,

    /// Clear display and exit
    #[arg(long)]
    clear: bool,

    /// Save the effective configuration to the config path and exit
    #[arg(long = "write-config")]
    write_config: bool,
}

/// Using current_thread runtime for single-core Pi boards
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let loaded = Config::load(&args.config);
    init_logging(args.verbose || loaded.as_ref().is_ok_and(|c| c.verbose));

    tracing::info!("Starting E-Paper Status Display");

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from {}: {}", args.config, e);
        tracing::info!("Using default configuration");
        Config::default()
    });

    if args.write_config {
        config.save(&args.config)?;
        tracing::info!("Configuration written to {}", args.config);
        return Ok(());
    }

    let mut display = display::open(&config.display)?;

    if args.test {
        tracing::info!("Rendering demo status...");
        let ctx = RenderContext {
            now: tokio::time::Instant::now(),
            link_summary: "Self-test",
        };
        display.render_frame(&demo_model(&config), &ctx)?;
        display.sleep()?;
        tracing::info!("Demo render complete");
        return Ok(());
    }

    if args.clear {
        tracing::info!("Clearing display...");
        display.clear()?;
        display.sleep()?;
        tracing::info!("Display cleared");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    spawn_shutdown_listener(shutdown_tx)?;

    let mut controller = Controller::new(
        connectivity_manager(&config),
        PayloadDecoder::new(status_defaults(&config), config.mqtt.max_message_bytes),
        RenderScheduler::new(config.refresh_interval()),
        display,
        config.service_window(),
    );

    controller.run(shutdown_rx).await;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn status_defaults(config: &Config) -> StatusDefaults {
    StatusDefaults {
        subtitle: config.display.device_name.clone(),
        metrics_capacity: config.display.metrics_capacity,
    }
}

fn connectivity_manager(config: &Config) -> ConnectivityManager<InterfaceLink, MqttBroker> {
    let mqtt = &config.mqtt;

    let link = InterfaceLink::new(&config.network.interface);
    let broker = MqttBroker::new(BrokerEndpoint {
        host: mqtt.broker.clone(),
        port: mqtt.port,
        keep_alive: Duration::from_secs(mqtt.keep_alive_secs),
    });

    let presence = mqtt.has_presence().then(|| Presence {
        topic: mqtt.will_topic.clone(),
        online: mqtt.online_message.clone(),
        offline: mqtt.will_message.clone(),
    });

    let client_id = connectivity::resolve_client_id(&mqtt.client_id);
    tracing::info!(
        "MQTT client {} -> {}:{} topic {}",
        client_id,
        mqtt.broker,
        mqtt.port,
        mqtt.topic
    );

    ConnectivityManager::new(
        link,
        broker,
        ConnectivitySettings {
            client_id,
            credentials: mqtt.credentials(),
            topic: mqtt.topic.clone(),
            presence,
            attach_timeout: config.attach_timeout(),
            connect_timeout: config.connect_timeout(),
        },
    )
}

/// Status shown by `--test`
fn demo_model(config: &Config) -> StatusModel {
    let mut model = StatusModel::placeholder(&status_defaults(config));
    model.status = "TEST".to_string();
    model.detail = "Display self-test".to_string();
    model.updated_at = chrono::Local::now().format("%Y-%m-%d %H:%M").to_string();
    model.has_payload = true;

    let demo = [
        ("backend", format!("{:?}", config.display.backend).to_lowercase()),
        ("broker", format!("{}:{}", config.mqtt.broker, config.mqtt.port)),
        ("topic", config.mqtt.topic.clone()),
        ("refresh", format!("{}s", config.display.refresh_interval_secs)),
    ];
    for (label, value) in demo {
        if !model.metrics.try_push(label, value) {
            break;
        }
    }

    model
}

/// Initialize tracing/logging
///
/// Default level is "warn" to minimize SD card wear from log writes.
/// Use --verbose flag for "debug" level during development/troubleshooting.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("epaper_status_display={}", level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Forward the first SIGTERM or SIGINT to the shutdown channel
fn spawn_shutdown_listener(shutdown: broadcast::Sender<()>) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT");
            }
        }
        let _ = shutdown.send(());
    });

    Ok(())
}
