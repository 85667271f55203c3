//! Static bearer token authentication.
//!
//! `/mcp` requires an `Authorization` header carrying either the bare token
//! or `Bearer <token>` (case-sensitive prefix, single space). `/health` and
//! `/` are public.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::warn;

use crate::protocol::{JsonRpcResponse, RpcError};

/// Extension type carrying the expected token, injected into the router
/// layer so [`require_token`] can access it without touching `AppState`.
#[derive(Clone)]
pub struct AuthToken(pub String);

/// Outcome of checking an `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authorized,
    Unauthorized,
}

/// Check an `Authorization` header value against the configured token.
pub fn authorize(header: Option<&str>, token: &str) -> AuthOutcome {
    let Some(value) = header else {
        return AuthOutcome::Unauthorized;
    };
    if token.is_empty() {
        return AuthOutcome::Unauthorized;
    }
    let exact = constant_time_eq(token.as_bytes(), value.as_bytes());
    let bearer = value
        .strip_prefix("Bearer ")
        .is_some_and(|provided| constant_time_eq(token.as_bytes(), provided.as_bytes()));
    if exact || bearer {
        AuthOutcome::Authorized
    } else {
        AuthOutcome::Unauthorized
    }
}

/// Axum middleware that rejects requests without a valid `Authorization`
/// header. The expected token is injected via the [`AuthToken`] extension.
///
/// Rejections are `401 Unauthorized` with a JSON-RPC error envelope
/// (`code: -32001`) and `id: null`, since the body is never read.
pub async fn require_token(request: Request, next: Next) -> Response {
    let Some(token) = request.extensions().get::<AuthToken>().cloned() else {
        warn!("AuthToken extension missing, rejecting request");
        return unauthorized();
    };

    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match authorize(header, &token.0) {
        AuthOutcome::Authorized => next.run(request).await,
        AuthOutcome::Unauthorized => {
            if header.is_none() {
                warn!("Missing Authorization header");
            } else {
                warn!("Invalid authentication token provided");
            }
            unauthorized()
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(JsonRpcResponse::failure(Value::Null, RpcError::unauthorized())),
    )
        .into_response()
}

/// Constant-time byte comparison to prevent timing side-channel attacks.
///
/// Always iterates over the full length of `expected` regardless of `provided`
/// length, so an attacker cannot determine the token length from response times.
pub fn constant_time_eq(expected: &[u8], provided: &[u8]) -> bool {
    let mut diff = u8::from(expected.len() != provided.len());
    for (i, byte) in expected.iter().enumerate() {
        let p = provided.get(i).copied().unwrap_or(0xff);
        diff |= byte ^ p;
    }
    diff == 0
}
