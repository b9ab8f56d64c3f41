use std::sync::Arc;
use std::time::Duration;

use heatpump_core::{Mode, State, StateObserver, TemperatureReading};
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

pub struct Metrics {
    registry: Registry,
    pub mqtt_connected: IntGauge,
    pub mqtt_rx_total: IntCounter,
    pub ir_signals_total: IntCounter,
    requests_handled: IntCounterVec, // labels: route_name, status_code
    requests_duration: Histogram,
    events_processed: IntCounterVec, // labels: event_name, status
    events_duration: HistogramVec,   // label: event_name
    pub heatpump_mode: IntGauge,
    pub heatpump_target_temperature: IntGauge,
    pub heatpump_fan_speed: IntGauge,
    pub heatpump_current_temperature: Gauge,
    pub heatpump_current_humidity: Gauge,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Arc<Self>> {
        let mqtt_connected = IntGauge::new("heatpump_mqtt_connected", "MQTT connection status (1 connected, 0 otherwise)")?;
        let mqtt_rx_total = IntCounter::new("heatpump_mqtt_messages_received_total", "Total MQTT messages received")?;
        let ir_signals_total = IntCounter::new("heatpump_ir_signals_transmitted_total", "Total IR signals handed to the transmitter")?;
        let requests_handled = IntCounterVec::new(
            Opts::new("requests_handled", "Handled requests counter and metadata associated with them"),
            &["route_name", "status_code"],
        )?;
        let requests_duration = Histogram::with_opts(
            HistogramOpts::new("requests_duration", "Time spent processing requests").buckets(DURATION_BUCKETS.to_vec()),
        )?;
        let events_processed = IntCounterVec::new(
            Opts::new("events_processed", "Handled PubSub events counter and metadata associated with them"),
            &["event_name", "status"],
        )?;
        let events_duration = HistogramVec::new(
            HistogramOpts::new("events_duration", "Time spent processing events").buckets(DURATION_BUCKETS.to_vec()),
            &["event_name"],
        )?;
        let heatpump_mode = IntGauge::new("heatpump_mode", "Mode of the heatpump (OFF=0, HEAT=1, COOL=2, AUTO=3)")?;
        let heatpump_target_temperature = IntGauge::new("heatpump_target_temperature", "Target temperature of the heatpump")?;
        let heatpump_fan_speed = IntGauge::new("heatpump_fan_speed", "Fan speed of the heatpump")?;
        let heatpump_current_temperature = Gauge::new("heatpump_current_temperature", "Current temperature reading of the heatpump")?;
        let heatpump_current_humidity = Gauge::new("heatpump_current_humidity", "Current humidity reading of the heatpump")?;

        let registry = Registry::new();
        registry.register(Box::new(mqtt_connected.clone()))?;
        registry.register(Box::new(mqtt_rx_total.clone()))?;
        registry.register(Box::new(ir_signals_total.clone()))?;
        registry.register(Box::new(requests_handled.clone()))?;
        registry.register(Box::new(requests_duration.clone()))?;
        registry.register(Box::new(events_processed.clone()))?;
        registry.register(Box::new(events_duration.clone()))?;
        registry.register(Box::new(heatpump_mode.clone()))?;
        registry.register(Box::new(heatpump_target_temperature.clone()))?;
        registry.register(Box::new(heatpump_fan_speed.clone()))?;
        registry.register(Box::new(heatpump_current_temperature.clone()))?;
        registry.register(Box::new(heatpump_current_humidity.clone()))?;

        Ok(Arc::new(Self {
            registry,
            mqtt_connected,
            mqtt_rx_total,
            ir_signals_total,
            requests_handled,
            requests_duration,
            events_processed,
            events_duration,
            heatpump_mode,
            heatpump_target_temperature,
            heatpump_fan_speed,
            heatpump_current_temperature,
            heatpump_current_humidity,
        }))
    }

    pub fn observe_request(&self, route_name: &str, status_code: u16, duration: Duration) {
        let status_code = status_code.to_string();
        self.requests_handled
            .with_label_values(&[route_name, status_code.as_str()])
            .inc();
        self.requests_duration.observe(duration.as_secs_f64());
    }

    pub fn observe_event(&self, event_name: &str, ok: bool, duration: Duration) {
        let status = if ok { "OK" } else { "ERR" };
        self.events_processed.with_label_values(&[event_name, status]).inc();
        self.events_duration
            .with_label_values(&[event_name])
            .observe(duration.as_secs_f64());
    }

    /// Prometheus text exposition of everything registered here.
    pub fn render(&self) -> prometheus::Result<(String, Vec<u8>)> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buf)?;
        Ok((encoder.format_type().to_string(), buf))
    }
}

fn mode_value(mode: Mode) -> i64 {
    match mode {
        Mode::Off => 0,
        Mode::Heat => 1,
        Mode::Cool => 2,
        Mode::Auto => 3,
    }
}

impl StateObserver for Metrics {
    fn state_changed(&self, state: &State) {
        if let Some(mode) = state.mode {
            self.heatpump_mode.set(mode_value(mode));
        }
        if let Some(t) = state.target_temperature {
            self.heatpump_target_temperature.set(t.into());
        }
        if let Some(s) = state.fan_speed {
            self.heatpump_fan_speed.set(s.into());
        }
    }

    fn reading_changed(&self, reading: &TemperatureReading) {
        self.heatpump_current_temperature.set(reading.temperature);
        self.heatpump_current_humidity.set(reading.humidity);
    }
}
