// Module declarations for the application's core components
pub mod aggregator;    // Rolling windows and publish decisions
pub mod config;        // Configuration management
pub mod coordinator;   // Poll loop
pub mod error;         // Error handling and types
pub mod influx;        // InfluxDB integration
pub mod mqtt;          // MQTT client and messaging
pub mod network;       // Network link watching and housekeeping
pub mod options;       // Command line options parsing
pub mod prelude;       // Common imports and types
pub mod publisher;     // Record building for InfluxDB and MQTT
pub mod register;      // Register definitions and decoding
pub mod scheduler;     // Poll timing
pub mod sungrow;       // Sungrow inverter register table and MODBUS transport
pub mod watchdog;      // Failure counter and restart policy

// Get the package version from Cargo.toml
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;
use crate::coordinator::Coordinator;
use crate::influx::Influx;
use crate::mqtt::Mqtt;
use crate::network::NetworkLink;
use crate::publisher::Publisher;
use crate::scheduler::Scheduler;
use crate::sungrow::inverter::ModbusRtu;
use std::io::Write;

/// How `app` finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// Something is wrong enough that the process should start over.
    Restart,
    /// Ctrl-C.
    Shutdown,
}

pub fn init_logging(level: &str) {
    let result = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init();

    if let Err(e) = result {
        error!("Failed to initialize logging: {}", e);
    }
}

/// Main application entry point
///
/// Brings up the network check, InfluxDB, MQTT and the MODBUS transport,
/// then runs the poll loop until it trips the failure ceiling or Ctrl-C
/// arrives.
pub async fn app(config: ConfigWrapper) -> Result<Exit> {
    info!("sungrow-bridge {} starting", CARGO_PKG_VERSION);

    let mut link = NetworkLink::new(config.network());
    info!("Waiting for network to connect");
    if !link.wait_until_up(config.network().connect_timeout()).await {
        error!(
            "{} didn't come up within {}ms, restarting...",
            link.interface().unwrap_or("network"),
            config.network().connect_timeout().as_millis()
        );
        return Ok(Exit::Restart);
    }

    let influx = Influx::new(config.influx())?;
    match influx.validate_connection().await {
        Ok(()) => info!("Connected to InfluxDB: {}", config.influx().url()),
        Err(e) => {
            error!("InfluxDB connection failed: {}", e);
            error!("Restarting...");
            return Ok(Exit::Restart);
        }
    }

    let mqtt = if config.mqtt().enabled() {
        Some(Mqtt::new(config.mqtt()))
    } else {
        info!("mqtt disabled, skipping");
        None
    };

    let publisher = Publisher::new(influx, mqtt, config.mqtt());
    let transport = ModbusRtu::new(config.inverter());
    let mut coordinator =
        Coordinator::new(transport, publisher, link, config.poll().interval_ms());
    let scheduler = Scheduler::new(&config);

    info!("Polling every {}ms", config.poll().interval_ms());

    let shutdown = tokio::select! {
        _ = scheduler.start(&mut coordinator) => false,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("Failed to listen for ctrl+c: {}", e);
            }
            true
        }
    };

    if !shutdown {
        return Ok(Exit::Restart);
    }

    info!("Shutdown signal received, stopping...");
    coordinator.stats().print_summary();
    if let Some(mqtt) = coordinator.publisher_mut().mqtt_mut() {
        mqtt.stop().await;
    }
    info!("Shutdown complete");

    Ok(Exit::Shutdown)
}

/// Replaces this process with a fresh copy of itself. No shutdown sequence
/// runs first; if the exec fails the process exits non-zero instead, for a
/// supervisor to pick up.
pub fn restart() -> ! {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;

        match std::env::current_exe() {
            Ok(exe) => {
                let err = std::process::Command::new(exe)
                    .args(std::env::args_os().skip(1))
                    .exec();
                error!("restart failed: {}", err);
            }
            Err(e) => error!("restart failed: {}", e),
        }
    }

    std::process::exit(1)
}
