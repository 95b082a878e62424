//! REST endpoints
//!
//! Producers replace a channel with `POST`; the new value is published to
//! every connected map client. `GET` returns the current value.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, MethodRouter};
use axum::{Json, Router};
use resq_broadcaster::{HubStats, RelayStats, DISASTER_OVERLAYS, RISK_ZONES, VEHICLE_POSITIONS};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub channels: Vec<String>,
    pub hub: HubStats,
    pub relay: RelayStats,
}

/// Routes mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/risk-zones", channel_route(RISK_ZONES))
        .route("/vehicles", channel_route(VEHICLE_POSITIONS))
        .route("/disasters", channel_route(DISASTER_OVERLAYS))
        .route("/channels/:name", get(get_channel).post(post_channel))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        channels: state.hub.channels().to_vec(),
        hub: state.hub.stats(),
        relay: state.relay.stats(),
    })
}

fn channel_route(channel: &'static str) -> MethodRouter<AppState> {
    get(move |State(state): State<AppState>| read_channel(state, channel.to_string())).post(
        move |State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>| {
            write_channel(state, channel.to_string(), body)
        },
    )
}

async fn get_channel(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    read_channel(state, name).await
}

async fn post_channel(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    write_channel(state, name, body).await
}

async fn read_channel(state: AppState, channel: String) -> Result<Json<Value>, ApiError> {
    let value = state.hub.get(&channel).await?;
    Ok(Json((*value).clone()))
}

async fn write_channel(
    state: AppState,
    channel: String,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    if !state.hub.has_channel(&channel) {
        return Err(ApiError::UnknownChannel(channel));
    }
    let Json(value) = body?;
    validate_records(&value)?;

    let queued = state.hub.publish(&channel, value).await?;
    tracing::info!("Updated {} via API ({} subscriber(s))", channel, queued);
    Ok(Json(json!({"status": "success"})))
}

/// Channel bodies are lists of JSON objects
fn validate_records(value: &Value) -> Result<(), ApiError> {
    let records = value
        .as_array()
        .ok_or_else(|| ApiError::InvalidBody("expected a JSON array".to_string()))?;

    if let Some(idx) = records.iter().position(|record| !record.is_object()) {
        return Err(ApiError::InvalidBody(format!("item {} is not an object", idx)));
    }
    Ok(())
}
