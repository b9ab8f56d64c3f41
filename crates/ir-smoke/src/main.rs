use heatpump_core::{decode, ir_transmitter_topic, IrSignal};
use heatpump_mqtt::{MqttConfig, MqttEvent, MqttService};
use rumqttc::QoS;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{timeout, Duration};

// Listens on the transmitter topic and prints the first frame it sees as a decoded state.
// Usage: heatpump-ir-smoke [timeout-secs]
#[tokio::main]
async fn main() {
    let secs = std::env::args()
        .nth(1)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(30);

    let cfg = MqttConfig::from_env();
    eprintln!("Connecting to mqtt://{}:{}", cfg.host, cfg.port);
    let mqtt = match MqttService::connect(cfg).await {
        Ok(mqtt) => mqtt,
        Err(e) => {
            eprintln!("MQTT connect failed: {}", e);
            std::process::exit(1);
        }
    };
    let mut rx = mqtt.events();
    let topic = ir_transmitter_topic();
    if let Err(e) = mqtt.subscribe(&topic, QoS::AtLeastOnce).await {
        eprintln!("Subscribe to {} failed: {}", topic, e);
        std::process::exit(1);
    }

    let wait = async {
        loop {
            match rx.recv().await {
                Ok(MqttEvent::Publish { topic: t, payload }) if t == topic => return Some(payload),
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    };

    match timeout(Duration::from_secs(secs), wait).await {
        Ok(Some(payload)) => {
            let state = IrSignal::from_payload(&payload)
                .map_err(|e| e.to_string())
                .and_then(|msg| {
                    eprintln!("IR signal: {}", msg.signal);
                    decode(&msg.signal).map_err(|e| e.to_string())
                });
            match state {
                Ok(state) => match serde_json::to_string(&state) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Failed to encode state: {}", e);
                        std::process::exit(2);
                    }
                },
                Err(e) => {
                    eprintln!("Failed to decode IR signal: {}", e);
                    std::process::exit(2);
                }
            }
        }
        Ok(None) => {
            eprintln!("MQTT event stream closed");
            std::process::exit(3);
        }
        Err(_) => {
            eprintln!("Timeout waiting for IR signal");
            std::process::exit(4);
        }
    }

    let _ = mqtt.disconnect().await;
}
