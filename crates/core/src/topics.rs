// Topic layout shared with the transmitter and sensor firmware

pub const ROOT: &str = "heatpump";

pub fn ir_transmitter_topic() -> String {
    format!("{}/ir-transmitter", ROOT)
}

pub fn dht_sensor_topic() -> String {
    format!("{}/dht-sensor", ROOT)
}

/// Returns the event name for a topic under [`ROOT`], e.g. `dht-sensor`.
pub fn event_name(topic: &str) -> Option<&str> {
    let (root, rest) = topic.split_once('/')?;
    if root != ROOT || rest.is_empty() { return None; }
    Some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topics() {
        assert_eq!(ir_transmitter_topic(), "heatpump/ir-transmitter");
        assert_eq!(dht_sensor_topic(), "heatpump/dht-sensor");
    }

    #[test]
    fn test_event_name() {
        assert_eq!(event_name("heatpump/dht-sensor"), Some("dht-sensor"));
        assert_eq!(event_name("roaster/dht-sensor"), None);
        assert_eq!(event_name("heatpump/"), None);
        assert_eq!(event_name("heatpump"), None);
    }
}
