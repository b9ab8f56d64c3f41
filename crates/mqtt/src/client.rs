use std::collections::HashMap;
use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
use std::time::Duration;

use rumqttc::{AsyncClient, ClientError, Event, EventLoop, Incoming, MqttOptions, Outgoing, QoS};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::MqttConfig;

#[derive(Debug, Clone)]
pub enum MqttEvent {
    Connected,
    Disconnected,
    Publish { topic: String, payload: Vec<u8> },
    PubAck(u16),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("error encoding payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("error publishing message: {0}")]
    Client(#[from] ClientError),
}

#[derive(Clone)]
pub struct MqttService {
    client: Arc<Mutex<AsyncClient>>,
    ready: Arc<AtomicBool>,
    events_tx: broadcast::Sender<MqttEvent>,
    subscriptions: Arc<RwLock<HashMap<String, QoS>>>,
    // Held so the event loop task lives as long as any clone of the service
    _loop_handle: Arc<JoinHandle<()>>,
}

impl MqttService {
    pub async fn connect(config: MqttConfig) -> Result<Self, ClientError> {
        let (client, eventloop) = build_client(&config);
        let ready = Arc::new(AtomicBool::new(false));
        let (tx, _) = broadcast::channel(256);
        let subscriptions = Arc::new(RwLock::new(HashMap::new()));
        let client = Arc::new(Mutex::new(client));

        let task = EventLoopTask {
            client: client.clone(),
            ready: ready.clone(),
            events_tx: tx.clone(),
            subscriptions: Arc::clone(&subscriptions),
            config,
        };
        let loop_handle = tokio::spawn(task.run(eventloop));

        Ok(Self {
            client,
            ready,
            events_tx: tx,
            subscriptions,
            _loop_handle: Arc::new(loop_handle),
        })
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    pub fn events(&self) -> broadcast::Receiver<MqttEvent> {
        self.events_tx.subscribe()
    }

    pub async fn publish<T: Into<Vec<u8>>>(&self, topic: &str, qos: QoS, retain: bool, payload: T) -> Result<(), ClientError> {
        let client = self.client.lock().await;
        client.publish(topic, qos, retain, payload).await
    }

    pub async fn publish_json<T: Serialize>(&self, topic: &str, qos: QoS, message: &T) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(message)?;
        self.publish(topic, qos, false, payload).await?;
        Ok(())
    }

    /// Subscribes and remembers the topic so it is restored after a reconnect.
    pub async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), ClientError> {
        let client = self.client.lock().await;
        client.subscribe(topic, qos).await?;
        self.subscriptions.write().await.insert(topic.to_string(), qos);
        Ok(())
    }

    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.ready.store(false, Ordering::Relaxed);
        let client = self.client.lock().await;
        client.disconnect().await
    }
}

fn build_client(config: &MqttConfig) -> (AsyncClient, EventLoop) {
    let mut opts = MqttOptions::new(&config.client_id, &config.host, config.port);
    opts.set_keep_alive(Duration::from_secs(config.keep_alive_secs as u64));
    opts.set_clean_session(config.clean_session);
    if let (Some(u), Some(p)) = (&config.username, &config.password) {
        opts.set_credentials(u.clone(), p.clone());
    }
    opts.set_request_channel_capacity(64);
    AsyncClient::new(opts, 64)
}

/// Reconnect delay: doubles from 1s, waits are capped at 30s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Backoff {
    secs: u64,
}

impl Backoff {
    const MAX_WAIT_SECS: u64 = 30;
    const MAX_SECS: u64 = 60;

    fn new() -> Self {
        Self { secs: 1 }
    }

    fn next_wait(&mut self) -> Duration {
        let wait = self.secs.min(Self::MAX_WAIT_SECS);
        self.secs = (self.secs * 2).min(Self::MAX_SECS);
        Duration::from_secs(wait)
    }

    fn reset(&mut self) {
        self.secs = 1;
    }
}

struct EventLoopTask {
    client: Arc<Mutex<AsyncClient>>,
    ready: Arc<AtomicBool>,
    events_tx: broadcast::Sender<MqttEvent>,
    subscriptions: Arc<RwLock<HashMap<String, QoS>>>,
    config: MqttConfig,
}

impl EventLoopTask {
    async fn run(self, mut eventloop: EventLoop) {
        let mut backoff = Backoff::new();
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!(host = %self.config.host, "MQTT connected");
                    self.ready.store(true, Ordering::Relaxed);
                    let _ = self.events_tx.send(MqttEvent::Connected);
                    self.restore_subscriptions().await;
                    backoff.reset();
                }
                Ok(Event::Incoming(Incoming::Publish(p))) => {
                    let _ = self.events_tx.send(MqttEvent::Publish {
                        topic: p.topic.to_string(),
                        payload: p.payload.to_vec(),
                    });
                }
                Ok(Event::Incoming(Incoming::PubAck(ack))) => {
                    let _ = self.events_tx.send(MqttEvent::PubAck(ack.pkid));
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    warn!("MQTT disconnect requested");
                    self.ready.store(false, Ordering::Relaxed);
                    let _ = self.events_tx.send(MqttEvent::Disconnected);
                }
                Ok(other) => {
                    debug!(?other, "MQTT event");
                }
                Err(e) => {
                    error!(error = ?e, "MQTT error; will attempt reconnect");
                    self.ready.store(false, Ordering::Relaxed);
                    let _ = self.events_tx.send(MqttEvent::Disconnected);

                    sleep(backoff.next_wait()).await;

                    let (new_client, new_eventloop) = build_client(&self.config);
                    eventloop = new_eventloop;
                    *self.client.lock().await = new_client;
                    info!("MQTT client rebuilt, attempting reconnection");
                }
            }
        }
    }

    async fn restore_subscriptions(&self) {
        let subs = self.subscriptions.read().await;
        let client = self.client.lock().await;
        for (topic, qos) in subs.iter() {
            debug!("Restoring subscription to {}", topic);
            if let Err(err) = client.subscribe(topic, *qos).await {
                warn!(?err, "Failed to restore subscription to {}", topic);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new();
        let waits: Vec<u64> = (0..8).map(|_| backoff.next_wait().as_secs()).collect();
        assert_eq!(waits, vec![1, 2, 4, 8, 16, 30, 30, 30]);
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff = Backoff::new();
        backoff.next_wait();
        backoff.next_wait();
        backoff.reset();
        assert_eq!(backoff.next_wait(), Duration::from_secs(1));
    }
}
