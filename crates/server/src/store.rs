use std::path::Path;
use std::sync::Arc;

use heatpump_core::{snap_fan_speed, Mode, State, StateObserver, TemperatureReading};

use crate::db::{Database, StoreError};

pub const MODE_KEY: &str = "mode";
pub const TARGET_TEMPERATURE_KEY: &str = "targetTemperature";
pub const FAN_SPEED_KEY: &str = "fanSpeed";
pub const CURRENT_TEMPERATURE_KEY: &str = "currentTemperature";
pub const CURRENT_HUMIDITY_KEY: &str = "currentHumidity";

pub const DEFAULTS: &[(&str, &str)] = &[
    (MODE_KEY, "OFF"),
    (TARGET_TEMPERATURE_KEY, "22"),
    (FAN_SPEED_KEY, "0"),
];

/// Durable heat pump state on top of the key-value file.
pub struct HeatpumpStore {
    db: Database,
    observers: Vec<Arc<dyn StateObserver>>,
}

impl HeatpumpStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::open(path, DEFAULTS).await?;
        Ok(Self {
            db,
            observers: Vec::new(),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn StateObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn path(&self) -> &Path {
        self.db.path()
    }

    pub async fn fetch_state(&self) -> Result<State, StoreError> {
        let mode_value = self.db.get_str(MODE_KEY).await?;
        let mode = mode_value.parse::<Mode>().map_err(|e| StoreError::Parse {
            key: MODE_KEY.to_string(),
            value: mode_value.clone(),
            reason: e.to_string(),
        })?;
        let target_temperature = self.db.get_int(TARGET_TEMPERATURE_KEY).await?;
        let fan_speed = self.db.get_int(FAN_SPEED_KEY).await?;

        Ok(State::new(mode, target_temperature, fan_speed))
    }

    /// Stores the fields present in `patch` (fan speed snapped to a step of 20)
    /// and returns the resulting full state.
    pub async fn update_state(&self, patch: &State) -> Result<State, StoreError> {
        let mut entries = Vec::new();
        if let Some(mode) = patch.mode {
            entries.push((MODE_KEY.to_string(), mode.to_string()));
        }
        if let Some(t) = patch.target_temperature {
            entries.push((TARGET_TEMPERATURE_KEY.to_string(), t.to_string()));
        }
        if let Some(s) = patch.fan_speed {
            entries.push((FAN_SPEED_KEY.to_string(), snap_fan_speed(s).to_string()));
        }
        if !entries.is_empty() {
            self.db.set_many(entries).await?;
        }

        let state = self.fetch_state().await?;
        for observer in &self.observers {
            observer.state_changed(&state);
        }
        Ok(state)
    }

    pub async fn fetch_reading(&self) -> Result<TemperatureReading, StoreError> {
        Ok(TemperatureReading {
            temperature: self.db.get_float(CURRENT_TEMPERATURE_KEY).await?,
            humidity: self.db.get_float(CURRENT_HUMIDITY_KEY).await?,
        })
    }

    pub async fn update_reading(&self, reading: &TemperatureReading) -> Result<(), StoreError> {
        self.db
            .set_many(vec![
                (CURRENT_TEMPERATURE_KEY.to_string(), format!("{:.1}", reading.temperature)),
                (CURRENT_HUMIDITY_KEY.to_string(), format!("{:.1}", reading.humidity)),
            ])
            .await?;

        for observer in &self.observers {
            observer.reading_changed(reading);
        }
        Ok(())
    }

    /// Replays what is stored to the observers, e.g. to seed gauges at startup.
    pub async fn notify_current(&self) -> Result<(), StoreError> {
        let state = self.fetch_state().await?;
        for observer in &self.observers {
            observer.state_changed(&state);
        }
        match self.fetch_reading().await {
            Ok(reading) => {
                for observer in &self.observers {
                    observer.reading_changed(&reading);
                }
            }
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    pub struct RecordingObserver {
        pub states: Mutex<Vec<State>>,
        pub readings: Mutex<Vec<TemperatureReading>>,
    }

    impl StateObserver for RecordingObserver {
        fn state_changed(&self, state: &State) {
            self.states.lock().unwrap().push(*state);
        }

        fn reading_changed(&self, reading: &TemperatureReading) {
            self.readings.lock().unwrap().push(*reading);
        }
    }

    pub async fn temp_store() -> (TempDir, HeatpumpStore) {
        let dir = TempDir::new().unwrap();
        let store = HeatpumpStore::open(dir.path().join("heatpump.json")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_fetch_defaults() {
        let (_dir, store) = temp_store().await;
        assert_eq!(store.fetch_state().await.unwrap(), State::new(Mode::Off, 22, 0));
    }

    #[tokio::test]
    async fn test_partial_update_merges() {
        let (_dir, store) = temp_store().await;

        let state = store
            .update_state(&State {
                mode: Some(Mode::Heat),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(state, State::new(Mode::Heat, 22, 0));

        let state = store
            .update_state(&State {
                target_temperature: Some(25),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(state, State::new(Mode::Heat, 25, 0));
    }

    #[tokio::test]
    async fn test_update_snaps_fan_speed() {
        let (_dir, store) = temp_store().await;
        let state = store
            .update_state(&State {
                fan_speed: Some(55),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(state.fan_speed, Some(60));
    }

    #[tokio::test]
    async fn test_update_notifies_observers() {
        let dir = TempDir::new().unwrap();
        let observer = Arc::new(RecordingObserver::default());
        let store = HeatpumpStore::open(dir.path().join("heatpump.json"))
            .await
            .unwrap()
            .with_observer(observer.clone());

        store.update_state(&State::new(Mode::Cool, 24, 20)).await.unwrap();
        store
            .update_reading(&TemperatureReading { temperature: 21.04, humidity: 45.0 })
            .await
            .unwrap();

        assert_eq!(*observer.states.lock().unwrap(), vec![State::new(Mode::Cool, 24, 20)]);
        assert_eq!(observer.readings.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reading_is_rounded_and_missing_by_default() {
        let (_dir, store) = temp_store().await;
        assert!(matches!(store.fetch_reading().await, Err(StoreError::NotFound(_))));

        store
            .update_reading(&TemperatureReading { temperature: 21.04, humidity: 45.66 })
            .await
            .unwrap();
        let reading = store.fetch_reading().await.unwrap();
        assert_eq!(reading, TemperatureReading { temperature: 21.0, humidity: 45.7 });
    }

    #[tokio::test]
    async fn test_corrupt_mode_is_an_error() {
        let (_dir, store) = temp_store().await;
        store.db.set(MODE_KEY, "WARM").await.unwrap();
        let err = store.fetch_state().await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { key, .. } if key == MODE_KEY));
    }

    #[tokio::test]
    async fn test_notify_current_without_reading() {
        let dir = TempDir::new().unwrap();
        let observer = Arc::new(RecordingObserver::default());
        let store = HeatpumpStore::open(dir.path().join("heatpump.json"))
            .await
            .unwrap()
            .with_observer(observer.clone());

        store.notify_current().await.unwrap();
        assert_eq!(observer.states.lock().unwrap().len(), 1);
        assert!(observer.readings.lock().unwrap().is_empty());
    }
}
