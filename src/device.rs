//! HTTP client for the downstream device.
//!
//! [`DeviceClient`] wraps `reqwest::Client` and sends one GET per tool call to
//! `http://{ip}:{port}{path}`. The device firmware answers simple GETs with a
//! status code and an optional, unstructured body.
//!
//! ## Error handling
//!
//! Every outcome is classified into one of four buckets:
//!
//! | Outcome       | Meaning                                         |
//! |---------------|-------------------------------------------------|
//! | success       | device answered 2xx (body kept as diagnostic)   |
//! | `device_error`| device answered non-2xx                          |
//! | `unreachable` | connection refused, DNS failure, host down, ... |
//! | `timeout`     | no answer within the configured bound           |
//!
//! There are no retries. The MCP client owns the retry policy.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::DeviceConfig;
use crate::safety::PowerLevel;

/// A single request to send to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCommand {
    pub method: Method,
    /// Path on the device, starting with `/`. May carry a query string for raw commands.
    pub path: String,
    /// Clamped power level, sent as the `power` query parameter.
    pub power: Option<PowerLevel>,
}

impl DeviceCommand {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            power: None,
        }
    }

    #[must_use]
    pub fn with_power(mut self, power: PowerLevel) -> Self {
        self.power = Some(power);
        self
    }

    /// Path plus query string, exactly as requested from the device.
    pub fn endpoint(&self) -> String {
        match self.power {
            Some(level) => format!("{}?power={}", self.path, level.effective),
            None => self.path.clone(),
        }
    }
}

/// A 2xx answer from the device.
#[derive(Debug, Clone)]
pub struct DeviceReply {
    pub status: u16,
    pub body: String,
}

impl DeviceReply {
    /// The body as JSON when it parses, otherwise wrapped as `{"response": text}`.
    pub fn body_json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|_| json!({ "response": self.body }))
    }
}

/// Why a device call failed.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device answered with a non-2xx status.
    #[error("device returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The device could not be reached at all.
    #[error("device unreachable: {0}")]
    Unreachable(String),
    /// The device did not answer within the timeout.
    #[error("device did not respond within {0:?}")]
    Timeout(Duration),
}

impl DeviceError {
    /// Stable machine-readable classification, reported in JSON-RPC error data.
    pub fn classification(&self) -> &'static str {
        match self {
            Self::Status { .. } => "device_error",
            Self::Unreachable(_) => "unreachable",
            Self::Timeout(_) => "timeout",
        }
    }

    /// HTTP status returned by the device, if it answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// HTTP client for the single configured device.
///
/// Cheap to clone: the connection pool and base URL are shared.
#[derive(Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    timeout: Duration,
}

impl DeviceClient {
    /// Build a client from the device section of the configuration.
    pub fn new(config: &DeviceConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: Arc::from(config.base_url()),
            timeout,
        })
    }

    /// The device's base URL (without trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `command` to the device and classify the outcome.
    pub async fn send(&self, command: &DeviceCommand) -> Result<DeviceReply, DeviceError> {
        let url = format!("{}{}", self.base_url, command.endpoint());
        debug!(method = %command.method, %url, "sending device request");

        let resp = self
            .http
            .request(command.method.clone(), &url)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = resp.status();
        // The device often answers with an empty or non-JSON body; a failed
        // body read after a good status still counts as delivered.
        let body = body_or_empty(resp.text().await, &url);

        if status.is_success() {
            Ok(DeviceReply {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(DeviceError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn classify(&self, err: &reqwest::Error) -> DeviceError {
        if err.is_timeout() {
            DeviceError::Timeout(self.timeout)
        } else {
            DeviceError::Unreachable(error_chain(err))
        }
    }
}

/// Keep a readable body, or log why it could not be read and use `""`.
fn body_or_empty<E: std::fmt::Display>(body: Result<String, E>, url: &str) -> String {
    body.unwrap_or_else(|e| {
        debug!(%url, "failed to read device response body: {e}");
        String::new()
    })
}

/// Render an error with its sources, e.g. `"error sending request: connection refused"`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
