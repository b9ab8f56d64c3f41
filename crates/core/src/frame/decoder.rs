//! Frame to state.
//!
//! Only used to verify frames; the service itself never receives them.

use super::*;
use crate::error::{Checksum, DecodeError};
use crate::state::{Mode, State, FAN_SPEED_STEP};

/// Decode a frame string back into a state.
///
/// Fan speed is read back as `FAN * 20`, which is not the inverse of
/// [`encoder::fan_nibble`]: 60% goes out as nibble 8 and comes back as 160.
/// The remote's own decoding of the nibble is unknown, so both directions
/// are kept as observed.
pub fn decode(bits: &str) -> Result<State, DecodeError> {
    let frame = Frame::parse(bits)?;

    if frame.header() != HEADER_BITS {
        return Err(DecodeError::InvalidHeader {
            expected: HEADER_BITS,
            found: frame.header().to_string(),
        });
    }

    let temp = frame.read(TEMP);
    let fan = frame.read(FAN);
    let power = frame.read(POWER);
    let mo = frame.read(MODE);
    let chsm = frame.read(CHSM);
    let cs = frame.read(CS);

    let expected = (temp + fan) % 16;
    if expected != chsm {
        return Err(DecodeError::ChecksumMismatch {
            which: Checksum::Chsm,
            expected,
            found: chsm,
        });
    }

    let expected = mo ^ 1;
    if expected != cs {
        return Err(DecodeError::ChecksumMismatch {
            which: Checksum::Cs,
            expected,
            found: cs,
        });
    }

    let mode = mode_from_code(power, mo)?;

    Ok(State {
        mode: Some(mode),
        target_temperature: Some(i32::from(temp) + TEMPERATURE_OFFSET),
        fan_speed: Some(i32::from(fan) * FAN_SPEED_STEP),
    })
}

/// Power off wins over whatever mode code was sent.
pub fn mode_from_code(power: u8, code: u8) -> Result<Mode, DecodeError> {
    if power == 1 {
        return Ok(Mode::Off);
    }
    match code {
        0 => Ok(Mode::Auto),
        1 => Ok(Mode::Cool),
        3 => Ok(Mode::Heat),
        code => Err(DecodeError::UnsupportedModeCode { code }),
    }
}

impl Frame {
    pub fn decode(&self) -> Result<State, DecodeError> {
        decode(self.as_str())
    }
}
