//! State to frame.

use super::*;
use crate::error::{EncodeError, Field};
use crate::state::{Mode, State, FAN_SPEED_STEP};

/// Encode a complete state into a frame.
///
/// Fails with [`EncodeError::Invalid`] when a field is outside its allowed
/// range, with [`EncodeError::MissingField`] on a partial state and with
/// [`EncodeError::OutOfRange`] when a valid value does not fit its bit width
/// (a target temperature of 16 gives TEMP = -1).
pub fn encode(state: &State) -> Result<Frame, EncodeError> {
    state.validate()?;

    let target_temperature = state.target_temperature.ok_or(EncodeError::MissingField {
        field: Field::TargetTemperature,
    })?;
    let fan_speed = state.fan_speed.ok_or(EncodeError::MissingField {
        field: Field::FanSpeed,
    })?;
    let mode = state.mode.ok_or(EncodeError::MissingField { field: Field::Mode })?;

    let temp = i64::from(target_temperature) - i64::from(TEMPERATURE_OFFSET);
    let fan = i64::from(fan_nibble(fan_speed));
    let power = i64::from(power_bit(mode));
    let mo = i64::from(mode_code(mode));

    let frame = FrameBuilder::new()
        .literal(HEADER, HEADER_BITS)
        .field(TEMP, temp)?
        .zeros(PAD_TEMP)
        .field(FAN, fan)?
        .zeros(PAD_FAN)
        .field(POWER, power)?
        .field(MODE, mo)?
        .zeros(PAD_MODE)
        .field(CHSM, (temp + fan) % 16)?
        .zeros(PAD_CHSM)
        .field(POWER_MIRROR, power)?
        .field(CS, mo ^ 1)?
        .finish();

    Ok(frame)
}

/// 0 selects auto fan; 20..=100 map to 4, 6, 8, 10, 12.
pub fn fan_nibble(fan_speed: i32) -> i32 {
    if fan_speed > 0 {
        (fan_speed / FAN_SPEED_STEP) * 2 + 2
    } else {
        0
    }
}

/// Power is inverted on the wire: 1 means off.
pub fn power_bit(mode: Mode) -> u8 {
    match mode {
        Mode::Off => 1,
        Mode::Heat | Mode::Cool | Mode::Auto => 0,
    }
}

pub fn mode_code(mode: Mode) -> u8 {
    match mode {
        Mode::Auto => 0,
        Mode::Cool => 1,
        Mode::Heat => 3,
        // The remote always reports heat while powered off
        Mode::Off => 3,
    }
}

impl State {
    pub fn to_frame(&self) -> Result<Frame, EncodeError> {
        encode(self)
    }
}
