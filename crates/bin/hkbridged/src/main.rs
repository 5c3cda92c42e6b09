//! # hkbridged: accessory bridge daemon
//!
//! Composition root that wires all adapters together and runs the bridge.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Initialize `tracing` with the configured filter
//! - Connect to the MQTT broker
//! - Build the bridge registry: one accessory and one binding per entry
//! - Serve the controller surface for the bound accessories
//! - Shut down cleanly on SIGTERM/SIGINT, or with an error when a binding
//!   reports a fault
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no bridge logic belongs here.

mod config;

use std::process::ExitCode;
use std::sync::Arc;

use hkbridge_adapter_accessory::{MemoryAccessory, MemoryProvider};
use hkbridge_adapter_http_axum::{HttpAccessoryServer, HttpError};
use hkbridge_adapter_mqtt::{MqttBus, MqttError};
use hkbridge_app::ports::{Accessory, AccessoryServer};
use hkbridge_app::registry::{BridgeRegistry, FaultReceiver, fault_channel};
use hkbridge_domain::descriptor::AccessoryDescriptor;
use hkbridge_domain::error::BridgeError;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, ConfigFileError};

#[derive(Debug, thiserror::Error)]
enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigFileError),

    #[error("invalid log filter")]
    LogFilter(#[from] tracing_subscriber::filter::ParseError),

    #[error("broker connection failed")]
    Mqtt(#[from] MqttError),

    #[error("failed to build the bridge")]
    Bridge(#[from] BridgeError),

    #[error("controller surface failed")]
    Http(#[from] HttpError),

    #[error("bridge fault")]
    Fault(#[source] BridgeError),
}

#[tokio::main]
async fn main() -> ExitCode {
    match start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(err = %report(&err), "hkbridged stopped");
            eprintln!("hkbridged: {}", report(&err));
            ExitCode::FAILURE
        }
    }
}

async fn start() -> Result<(), DaemonError> {
    let config = Config::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    let descriptors = config.descriptors()?;
    let bus = Arc::new(MqttBus::connect(&config.broker).await?);
    let result = run(&config, &bus, &descriptors).await;
    if let Err(err) = bus.disconnect().await {
        tracing::warn!(%err, "failed to disconnect from broker");
    }
    result
}

async fn run(
    config: &Config,
    bus: &Arc<MqttBus>,
    descriptors: &[AccessoryDescriptor],
) -> Result<(), DaemonError> {
    let (faults, mut fault_rx) = fault_channel();
    let mut registry =
        BridgeRegistry::build(&MemoryProvider, Arc::clone(bus), descriptors, &faults).await?;
    if let Some(primary) = registry.accessories().first() {
        tracing::info!(bridge = %primary.descriptor().name, "bridge identity");
    }

    let mut server = HttpAccessoryServer::new(config.server.clone());
    let outcome = match server.start(registry.accessories()).await {
        Ok(()) => wait_for_exit(&mut fault_rx).await,
        Err(err) => Err(err.into()),
    };

    if let Err(err) = AccessoryServer::<MemoryAccessory>::stop(&mut server).await {
        tracing::warn!(%err, "failed to stop controller surface");
    }
    if let Err(err) = registry.shutdown().await {
        tracing::warn!(%err, "failed to detach bindings");
    }
    outcome
}

async fn wait_for_exit(faults: &mut FaultReceiver) -> Result<(), DaemonError> {
    tokio::select! {
        () = shutdown_signal() => {
            tracing::info!("shutdown requested");
            Ok(())
        }
        Some(fault) = faults.recv() => Err(DaemonError::Fault(fault)),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// Render an error with its source chain on one line.
fn report(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
