//! `GET /`: server identity and discovery.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::mcp::{SERVER_NAME, SERVER_VERSION};
use crate::AppState;

pub async fn info(State(state): State<AppState>) -> Json<Value> {
    let tools: Vec<&str> = state.catalog.tools().iter().map(|t| t.name).collect();
    Json(json!({
        "name": SERVER_NAME,
        "version": SERVER_VERSION,
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "mcp_endpoint": "/mcp",
        "health_endpoint": "/health",
        "tools": tools,
    }))
}
