//! `POST /mcp`: the JSON-RPC transport.
//!
//! The body is read as raw bytes so malformed JSON reaches the dispatcher and
//! becomes a `-32700` envelope instead of an extractor rejection. Every
//! JSON-RPC outcome, errors included, is sent with HTTP 200; notifications get
//! `202 Accepted` with an empty body.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use crate::mcp::{handle_body, Dispatch};
use crate::AppState;

pub const SESSION_HEADER: HeaderName = HeaderName::from_static("mcp-session-id");

pub async fn mcp(State(state): State<AppState>, body: Bytes) -> Response {
    match handle_body(&body, &state).await {
        Dispatch::Accepted => StatusCode::ACCEPTED.into_response(),
        Dispatch::Reply {
            response,
            session_id,
        } => {
            let mut resp = (StatusCode::OK, Json(response)).into_response();
            let headers = resp.headers_mut();
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            );
            if let Some(id) = session_id {
                match HeaderValue::from_str(&id) {
                    Ok(value) => {
                        headers.insert(SESSION_HEADER, value);
                    }
                    Err(e) => warn!("Dropping unencodable session id: {e}"),
                }
            }
            resp
        }
    }
}
