use std::fmt;

use thiserror::Error;

/// A state field, as named on the wire and in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Mode,
    TargetTemperature,
    FanSpeed,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Mode => "mode",
            Field::TargetTemperature => "targetTemperature",
            Field::FanSpeed => "fanSpeed",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the two frame checksums failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checksum {
    /// `(TEMP + FAN) % 16`
    Chsm,
    /// `MO ^ 1`
    Cs,
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checksum::Chsm => f.write_str("CHSM"),
            Checksum::Cs => f.write_str("CS"),
        }
    }
}

/// Caller supplied a value outside the domain of a state field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("mode must be one of: [OFF, HEAT, COOL, AUTO], got: {value}")]
    InvalidMode { value: String },

    #[error("{field} must be in range [{min},{max}], got: {value}")]
    OutOfRange {
        field: Field,
        min: i32,
        max: i32,
        value: i32,
    },
}

impl ValidationError {
    pub fn field(&self) -> Field {
        match self {
            ValidationError::InvalidMode { .. } => Field::Mode,
            ValidationError::OutOfRange { field, .. } => *field,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("{field} is required to encode a frame")]
    MissingField { field: Field },

    #[error("{segment} value {value} does not fit in {width} bits")]
    OutOfRange {
        segment: &'static str,
        value: i64,
        width: usize,
    },
}

impl EncodeError {
    /// The state field the failing value came from.
    pub fn field(&self) -> Field {
        match self {
            EncodeError::Invalid(e) => e.field(),
            EncodeError::MissingField { field } => *field,
            EncodeError::OutOfRange { segment, .. } => match *segment {
                "TEMP" | "CHSM" => Field::TargetTemperature,
                "FAN" => Field::FanSpeed,
                _ => Field::Mode,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame must be {expected} characters of '0'/'1', got {len} characters")]
    Malformed { expected: usize, len: usize },

    #[error("invalid frame header, expected: {expected}, got: {found}")]
    InvalidHeader {
        expected: &'static str,
        found: String,
    },

    #[error("{which} checksum mismatch, expected: {expected}, got: {found}")]
    ChecksumMismatch {
        which: Checksum,
        expected: u8,
        found: u8,
    },

    #[error("mode code must be one of: [0, 1, 3], got: {code}")]
    UnsupportedModeCode { code: u8 },
}
