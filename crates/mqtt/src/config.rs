use hostname::get as get_hostname;
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u16,
    pub clean_session: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: default_client_id(),
            username: None,
            password: None,
            keep_alive_secs: 30,
            clean_session: true,
        }
    }
}

impl MqttConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; empty or unparseable values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = MqttConfig::default();
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("MQTT_BROKER_HOST") {
            cfg.host = v;
        }
        if let Some(p) = get("MQTT_BROKER_PORT").and_then(|v| v.parse::<u16>().ok()) {
            cfg.port = p;
        }
        if let Some(v) = get("MQTT_CLIENT_ID") {
            cfg.client_id = v;
        }
        cfg.username = get("MQTT_USERNAME");
        cfg.password = get("MQTT_PASSWORD");
        if let Some(s) = get("MQTT_KEEP_ALIVE_SECS").and_then(|v| v.parse::<u16>().ok()) {
            cfg.keep_alive_secs = s;
        }

        cfg
    }
}

fn default_client_id() -> String {
    let host = get_hostname()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string());
    let pid = std::process::id();
    format!("heatpump-{}-{}", host, pid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = MqttConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.port, 1883);
        assert_eq!(cfg.keep_alive_secs, 30);
        assert!(cfg.client_id.starts_with("heatpump-"));
        assert!(cfg.username.is_none());
    }

    #[test]
    fn test_overrides() {
        let cfg = MqttConfig::from_lookup(lookup(&[
            ("MQTT_BROKER_HOST", "broker.lan"),
            ("MQTT_BROKER_PORT", "8883"),
            ("MQTT_CLIENT_ID", "api-1"),
            ("MQTT_USERNAME", "pump"),
            ("MQTT_PASSWORD", "secret"),
            ("MQTT_KEEP_ALIVE_SECS", "10"),
        ]));
        assert_eq!(cfg.host, "broker.lan");
        assert_eq!(cfg.port, 8883);
        assert_eq!(cfg.client_id, "api-1");
        assert_eq!(cfg.username.as_deref(), Some("pump"));
        assert_eq!(cfg.password.as_deref(), Some("secret"));
        assert_eq!(cfg.keep_alive_secs, 10);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let cfg = MqttConfig::from_lookup(lookup(&[
            ("MQTT_BROKER_HOST", ""),
            ("MQTT_BROKER_PORT", "not-a-port"),
            ("MQTT_KEEP_ALIVE_SECS", "-1"),
        ]));
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.port, 1883);
        assert_eq!(cfg.keep_alive_secs, 30);
    }
}
