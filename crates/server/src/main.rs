mod config;
mod db;
mod metrics;
mod models;
mod processor;
mod routes;
mod store;
mod transmitter;

use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use heatpump_core::dht_sensor_topic;
use heatpump_mqtt::{MqttConfig, MqttService};
use rumqttc::QoS;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, ServerConfig};
use crate::metrics::Metrics;
use crate::processor::EventProcessor;
use crate::routes::AppState;
use crate::store::HeatpumpStore;
use crate::transmitter::MqttTransmitter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = ServerConfig::from_env()?;
    init_tracing(&cfg)?;

    let metrics = Metrics::new().context("Failed to register metrics")?;
    let store = HeatpumpStore::open(&cfg.database_path)
        .await
        .with_context(|| format!("Failed to open database {}", cfg.database_path.display()))?
        .with_observer(metrics.clone());
    store.notify_current().await.context("Failed to read stored state")?;
    let store = Arc::new(store);
    info!(path = %store.path().display(), "Database ready");

    let mqtt_cfg = MqttConfig::from_env();
    info!(host = %mqtt_cfg.host, port = mqtt_cfg.port, client_id = %mqtt_cfg.client_id, "Configuring MQTT client");
    let mqtt = MqttService::connect(mqtt_cfg)
        .await
        .context("Failed to initialize MQTT")?;
    if let Err(e) = mqtt.subscribe(&dht_sensor_topic(), QoS::AtLeastOnce).await {
        tracing::warn!(?e, "Failed to subscribe to sensor topic");
    }

    let processor = EventProcessor::new(store.clone(), metrics.clone());
    tokio::spawn(processor.run(mqtt.events()));

    let state = AppState {
        store,
        transmitter: Arc::new(MqttTransmitter::new(mqtt.clone())),
        metrics,
    };
    let app = routes::router(state);

    let addr = cfg.addr()?;
    info!(%addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down");
    if let Err(e) = mqtt.disconnect().await {
        tracing::warn!(?e, "MQTT disconnect failed");
    }
    Ok(())
}

fn init_tracing(cfg: &ServerConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{},rumqttc=warn", cfg.log_level)))
        .context("Invalid LOG_LEVEL")?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match cfg.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.compact().init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!(?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
