//! Unauthenticated health-check endpoint.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::mcp::{SERVER_NAME, SERVER_VERSION};
use crate::AppState;

/// `GET /health`: liveness probe.
///
/// Reports process liveness only. The device is not contacted, so a dead
/// device never makes the gateway look unhealthy.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let mut body = json!({
        "status": "healthy",
        "server": SERVER_NAME,
        "version": SERVER_VERSION,
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "device_configured": !state.config.device.ip.is_empty(),
        "device_url": state.device.base_url(),
    });
    if let Some(max_power) = state.config.safety.max_power {
        body["safety_max_power"] = json!(max_power);
    }
    Json(body)
}
