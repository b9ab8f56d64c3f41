use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Field, ValidationError};

pub const TARGET_TEMPERATURE_MIN: i32 = 16;
pub const TARGET_TEMPERATURE_MAX: i32 = 30;
pub const FAN_SPEED_MIN: i32 = 0;
pub const FAN_SPEED_MAX: i32 = 100;

/// Fan speeds are stored in steps of this many percent.
pub const FAN_SPEED_STEP: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Off,
    Heat,
    Cool,
    Auto,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Off, Mode::Heat, Mode::Cool, Mode::Auto];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Off => "OFF",
            Mode::Heat => "HEAT",
            Mode::Cool => "COOL",
            Mode::Auto => "AUTO",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OFF" => Ok(Mode::Off),
            "HEAT" => Ok(Mode::Heat),
            "COOL" => Ok(Mode::Cool),
            "AUTO" => Ok(Mode::Auto),
            _ => Err(ValidationError::InvalidMode {
                value: s.to_string(),
            }),
        }
    }
}

/// Desired (or decoded) heat pump configuration.
///
/// Every field is optional so that a request can carry a partial update;
/// `None` means "leave unchanged". Encoding requires all three.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub mode: Option<Mode>,
    pub target_temperature: Option<i32>,
    pub fan_speed: Option<i32>,
}

impl State {
    pub fn new(mode: Mode, target_temperature: i32, fan_speed: i32) -> Self {
        Self {
            mode: Some(mode),
            target_temperature: Some(target_temperature),
            fan_speed: Some(fan_speed),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.mode.is_some() && self.target_temperature.is_some() && self.fan_speed.is_some()
    }

    /// Checks the fields that are present against their allowed ranges.
    ///
    /// The temperature floor is 16 even though the frame can only carry 17..=30;
    /// a 16 passes here and is rejected by the encoder.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(t) = self.target_temperature {
            check_range(
                Field::TargetTemperature,
                t,
                TARGET_TEMPERATURE_MIN,
                TARGET_TEMPERATURE_MAX,
            )?;
        }
        if let Some(s) = self.fan_speed {
            check_range(Field::FanSpeed, s, FAN_SPEED_MIN, FAN_SPEED_MAX)?;
        }
        Ok(())
    }

    pub fn is_set(&self, field: Field) -> bool {
        match field {
            Field::Mode => self.mode.is_some(),
            Field::TargetTemperature => self.target_temperature.is_some(),
            Field::FanSpeed => self.fan_speed.is_some(),
        }
    }

    /// Overlays the present fields of `patch` onto `self`.
    pub fn merge(&self, patch: &State) -> State {
        State {
            mode: patch.mode.or(self.mode),
            target_temperature: patch.target_temperature.or(self.target_temperature),
            fan_speed: patch.fan_speed.or(self.fan_speed),
        }
    }
}

fn check_range(field: Field, value: i32, min: i32, max: i32) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

/// Rounds a fan speed percentage to the nearest step of 20 (halves round up),
/// clamped to 0..=100.
pub fn snap_fan_speed(speed: i32) -> i32 {
    let clamped = speed.clamp(FAN_SPEED_MIN, FAN_SPEED_MAX);
    ((clamped + FAN_SPEED_STEP / 2) / FAN_SPEED_STEP) * FAN_SPEED_STEP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_state_validates_present_fields_only() {
        assert!(State::default().validate().is_ok());

        let state = State {
            fan_speed: Some(40),
            ..Default::default()
        };
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_temperature_above_range() {
        let state = State {
            target_temperature: Some(31),
            ..Default::default()
        };
        let err = state.validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::OutOfRange {
                field: Field::TargetTemperature,
                min: 16,
                max: 30,
                value: 31
            }
        );
        assert_eq!(
            err.to_string(),
            "targetTemperature must be in range [16,30], got: 31"
        );
    }

    #[test]
    fn test_temperature_floor_is_sixteen() {
        let state = State {
            target_temperature: Some(16),
            ..Default::default()
        };
        assert!(state.validate().is_ok());

        let state = State {
            target_temperature: Some(15),
            ..Default::default()
        };
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_fan_speed_bounds() {
        for speed in [0, 50, 100] {
            let state = State {
                fan_speed: Some(speed),
                ..Default::default()
            };
            assert!(state.validate().is_ok(), "speed {}", speed);
        }
        for speed in [-1, 101] {
            let state = State {
                fan_speed: Some(speed),
                ..Default::default()
            };
            let err = state.validate().unwrap_err();
            assert_eq!(err.field(), Field::FanSpeed);
        }
    }

    #[test]
    fn test_unknown_mode_lists_valid_values() {
        let err = "WARM".parse::<Mode>().unwrap_err();
        assert_eq!(err.field(), Field::Mode);
        assert_eq!(
            err.to_string(),
            "mode must be one of: [OFF, HEAT, COOL, AUTO], got: WARM"
        );
    }

    #[test]
    fn test_mode_parse_roundtrip() {
        for mode in Mode::ALL {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
        // Case matters on the wire
        assert!("heat".parse::<Mode>().is_err());
    }

    #[test]
    fn test_merge_leaves_absent_fields() {
        let current = State::new(Mode::Heat, 22, 60);
        let patch = State {
            target_temperature: Some(25),
            ..Default::default()
        };
        assert_eq!(current.merge(&patch), State::new(Mode::Heat, 25, 60));
        assert_eq!(current.merge(&State::default()), current);
    }

    #[test]
    fn test_json_field_names() {
        let state = State::new(Mode::Cool, 24, 20);
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"mode": "COOL", "targetTemperature": 24, "fanSpeed": 20})
        );

        let partial: State = serde_json::from_str(r#"{"fanSpeed": 40}"#).unwrap();
        assert_eq!(partial.mode, None);
        assert_eq!(partial.fan_speed, Some(40));
        assert!(!partial.is_complete());
        assert!(partial.is_set(Field::FanSpeed));
        assert!(!partial.is_set(Field::TargetTemperature));
    }

    #[test]
    fn test_snap_fan_speed() {
        assert_eq!(snap_fan_speed(0), 0);
        assert_eq!(snap_fan_speed(9), 0);
        assert_eq!(snap_fan_speed(10), 20);
        assert_eq!(snap_fan_speed(29), 20);
        assert_eq!(snap_fan_speed(55), 60);
        assert_eq!(snap_fan_speed(89), 80);
        assert_eq!(snap_fan_speed(90), 100);
        assert_eq!(snap_fan_speed(100), 100);
        assert_eq!(snap_fan_speed(150), 100);
        assert_eq!(snap_fan_speed(-5), 0);
    }
}
