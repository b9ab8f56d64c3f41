use crate::messages::TemperatureReading;
use crate::state::State;

/// Notified by the persistence layer after a change has been stored.
pub trait StateObserver: Send + Sync {
    fn state_changed(&self, state: &State);

    fn reading_changed(&self, _reading: &TemperatureReading) {}
}
