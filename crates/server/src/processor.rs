use std::sync::Arc;
use std::time::Instant;

use heatpump_core::{event_name, TemperatureReading};
use heatpump_mqtt::MqttEvent;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::db::StoreError;
use crate::metrics::Metrics;
use crate::store::HeatpumpStore;

pub const DHT_SENSOR_EVENT: &str = "dht-sensor";

#[derive(Debug, Error)]
pub enum EventError {
    #[error("error decoding {event} payload: {source}")]
    Payload {
        event: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Applies inbound sensor messages to the store.
pub struct EventProcessor {
    store: Arc<HeatpumpStore>,
    metrics: Arc<Metrics>,
}

impl EventProcessor {
    pub fn new(store: Arc<HeatpumpStore>, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics }
    }

    /// Consumes broker events until the channel closes.
    pub async fn run(self, mut rx: broadcast::Receiver<MqttEvent>) {
        loop {
            match rx.recv().await {
                Ok(MqttEvent::Connected) => self.metrics.mqtt_connected.set(1),
                Ok(MqttEvent::Disconnected) => self.metrics.mqtt_connected.set(0),
                Ok(MqttEvent::Publish { topic, payload }) => {
                    self.metrics.mqtt_rx_total.inc();
                    // Failures are logged and counted inside handle
                    let _ = self.handle(&topic, &payload).await;
                }
                Ok(MqttEvent::PubAck(_)) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "MQTT event consumer lagged; messages dropped");
                }
                Err(RecvError::Closed) => {
                    info!("MQTT event channel closed");
                    break;
                }
            }
        }
    }

    pub async fn handle(&self, topic: &str, payload: &[u8]) -> Result<(), EventError> {
        let Some(event) = event_name(topic) else {
            debug!(topic, "Ignoring message outside the heatpump topic tree");
            return Ok(());
        };

        let start = Instant::now();
        let result = match event {
            DHT_SENSOR_EVENT => self.handle_reading(payload).await,
            other => {
                debug!(event = other, "No handler for event");
                return Ok(());
            }
        };
        self.metrics.observe_event(event, result.is_ok(), start.elapsed());

        if let Err(e) = &result {
            warn!(event, error = %e, "Failed to process event");
        }
        result
    }

    async fn handle_reading(&self, payload: &[u8]) -> Result<(), EventError> {
        let reading = TemperatureReading::from_payload(payload).map_err(|source| EventError::Payload {
            event: DHT_SENSOR_EVENT.to_string(),
            source,
        })?;
        self.store.update_reading(&reading).await?;
        debug!(temperature = reading.temperature, humidity = reading.humidity, "Stored sensor reading");
        Ok(())
    }
}
