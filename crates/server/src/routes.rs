use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{MatchedPath, Request, State};
use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use heatpump_core::{EncodeError, State as HeatpumpState, TemperatureReading, ValidationError};
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::db::StoreError;
use crate::metrics::Metrics;
use crate::models::{ErrorResponse, UpdateStateRequest};
use crate::store::HeatpumpStore;
use crate::transmitter::IrTransmitter;

pub const V1_API: &str = "/api/v1";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<HeatpumpStore>,
    pub transmitter: Arc<dyn IrTransmitter>,
    pub metrics: Arc<Metrics>,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/heatpump/state", get(get_state).post(update_state))
        .route("/heatpump/temperature-and-humidity", get(get_temperature_and_humidity))
        .route_layer(middleware::from_fn_with_state(state.clone(), track_metrics));

    Router::new()
        .route("/_healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/version", get(version))
        .route("/metrics", get(metrics_handler))
        .nest(V1_API, api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("error decoding heatpump state: {0}")]
    Json(#[from] JsonRejection),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A field of the request passes validation but has no frame encoding.
    #[error("{0}")]
    Unencodable(EncodeError),

    #[error("error converting heatpump state to binary: {0}")]
    Encode(#[from] EncodeError),

    #[error("heatpump store error: {0}")]
    Store(#[from] StoreError),

    #[error("error transmitting IR signal: {0:#}")]
    Transmit(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Json(_) | ApiError::Validation(_) | ApiError::Unencodable(_) => StatusCode::BAD_REQUEST,
            ApiError::Encode(_) | ApiError::Store(_) | ApiError::Transmit(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Handler error");
            format!("{}: {}", status.canonical_reason().unwrap_or("Error"), status.as_u16())
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Rejected request");
            self.to_string()
        };
        (status, Json(ErrorResponse { error, status_code: status.as_u16() })).into_response()
    }
}

async fn track_metrics(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let start = Instant::now();
    let response = next.run(req).await;
    state.metrics.observe_request(&route, response.status().as_u16(), start.elapsed());
    response
}

async fn healthz() -> &'static str { "ok" }

async fn readyz(State(state): State<AppState>) -> StatusCode {
    if state.transmitter.is_ready() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE }
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok((content_type, body)) => ([(CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            tracing::error!(?e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_state(State(state): State<AppState>) -> Result<Json<HeatpumpState>, ApiError> {
    Ok(Json(state.store.fetch_state().await?))
}

/// Validates and stores a partial update, then sends the full state as an IR frame.
///
/// The merged state is encoded before anything is written, so a value the
/// frame cannot carry (a 16 degree target) is rejected without being stored.
/// When the offending value is already in the store the request itself is
/// fine, and the failure is reported as a server error.
async fn update_state(
    State(state): State<AppState>,
    payload: Result<Json<UpdateStateRequest>, JsonRejection>,
) -> Result<Json<HeatpumpState>, ApiError> {
    let Json(request) = payload?;
    let patch = HeatpumpState::try_from(request)?;

    let current = state.store.fetch_state().await?;
    if let Err(e) = current.merge(&patch).to_frame() {
        // Only the client's own fields make this a bad request
        return Err(if patch.is_set(e.field()) {
            ApiError::Unencodable(e)
        } else {
            ApiError::Encode(e)
        });
    }

    let updated = state.store.update_state(&patch).await?;
    let frame = updated.to_frame()?;
    state.transmitter.transmit(&frame).await.map_err(ApiError::Transmit)?;
    state.metrics.ir_signals_total.inc();

    tracing::info!(
        mode = ?updated.mode,
        target_temperature = ?updated.target_temperature,
        fan_speed = ?updated.fan_speed,
        %frame,
        "Heatpump state updated"
    );
    Ok(Json(updated))
}

async fn get_temperature_and_humidity(State(state): State<AppState>) -> Result<Json<TemperatureReading>, ApiError> {
    match state.store.fetch_reading().await {
        Ok(reading) => Ok(Json(reading)),
        Err(StoreError::NotFound(key)) => {
            tracing::info!(key = %key, "Temperature and humidity not found");
            Ok(Json(TemperatureReading::default()))
        }
        Err(e) => Err(e.into()),
    }
}
