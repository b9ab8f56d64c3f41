use heatpump_core::{Mode, State, ValidationError};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/heatpump/state`. Mode stays a string here so an
/// unknown value is reported as a validation error, not a JSON error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStateRequest {
    pub mode: Option<String>,
    pub target_temperature: Option<i32>,
    pub fan_speed: Option<i32>,
}

impl TryFrom<UpdateStateRequest> for State {
    type Error = ValidationError;

    fn try_from(req: UpdateStateRequest) -> Result<Self, Self::Error> {
        let mode = req.mode.as_deref().map(str::parse::<Mode>).transpose()?;
        let state = State {
            mode,
            target_temperature: req.target_temperature,
            fan_speed: req.fan_speed,
        };
        state.validate()?;
        Ok(state)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub status_code: u16,
}
