use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// Payload published to the IR transmitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrSignal {
    pub signal: String,
}

impl IrSignal {
    pub fn new(frame: &Frame) -> Self {
        Self { signal: frame.as_str().to_string() }
    }

    pub fn from_payload(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}

/// Room conditions reported by the DHT sensor next to the heat pump.
///
/// A field missing from the sensor payload reads as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureReading {
    pub temperature: f64,
    pub humidity: f64,
}

impl TemperatureReading {
    pub fn from_payload(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Mode, State};

    #[test]
    fn test_ir_signal_payload() {
        let frame = State::new(Mode::Heat, 22, 60).to_frame().unwrap();
        let payload = serde_json::to_vec(&IrSignal::new(&frame)).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value, serde_json::json!({ "signal": frame.as_str() }));
        assert_eq!(IrSignal::from_payload(&payload).unwrap().signal, frame.as_str());
    }

    #[test]
    fn test_reading_payload() {
        let reading = TemperatureReading::from_payload(br#"{"temperature": 21.5, "humidity": 40.2}"#).unwrap();
        assert_eq!(reading, TemperatureReading { temperature: 21.5, humidity: 40.2 });

        assert!(TemperatureReading::from_payload(b"not json").is_err());
        assert!(TemperatureReading::from_payload(br#"{"temperature": "warm"}"#).is_err());
    }

    #[test]
    fn test_partial_reading_is_zero_filled() {
        let reading = TemperatureReading::from_payload(br#"{"temperature": 21.5}"#).unwrap();
        assert_eq!(reading, TemperatureReading { temperature: 21.5, humidity: 0.0 });

        let reading = TemperatureReading::from_payload(b"{}").unwrap();
        assert_eq!(reading, TemperatureReading::default());
    }
}
