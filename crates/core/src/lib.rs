//! Heat pump state model and the IR frame codec.

pub mod error;
pub mod frame;
pub mod messages;
pub mod observer;
pub mod state;
pub mod topics;

pub use error::{Checksum, DecodeError, EncodeError, Field, ValidationError};
pub use frame::{decode, encode, Frame};
pub use messages::{IrSignal, TemperatureReading};
pub use observer::StateObserver;
pub use state::{snap_fan_speed, Mode, State};
pub use topics::*;
