use async_trait::async_trait;
use heatpump_core::{ir_transmitter_topic, Frame, IrSignal};
use heatpump_mqtt::MqttService;
use rumqttc::QoS;

/// Hands an encoded frame to whatever plays it back to the heat pump.
#[async_trait]
pub trait IrTransmitter: Send + Sync {
    async fn transmit(&self, frame: &Frame) -> anyhow::Result<()>;

    fn is_ready(&self) -> bool;
}

/// Publishes `{"signal": "<bits>"}` for the transmitter device. No retries.
pub struct MqttTransmitter {
    mqtt: MqttService,
    topic: String,
}

impl MqttTransmitter {
    pub fn new(mqtt: MqttService) -> Self {
        Self { mqtt, topic: ir_transmitter_topic() }
    }
}

#[async_trait]
impl IrTransmitter for MqttTransmitter {
    async fn transmit(&self, frame: &Frame) -> anyhow::Result<()> {
        self.mqtt
            .publish_json(&self.topic, QoS::AtLeastOnce, &IrSignal::new(frame))
            .await?;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.mqtt.is_ready()
    }
}
