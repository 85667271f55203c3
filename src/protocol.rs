//! JSON-RPC 2.0 envelope types and error codes.
//!
//! | Code     | Meaning                                       |
//! |----------|-----------------------------------------------|
//! | `-32700` | Parse error (body is not JSON)                |
//! | `-32600` | Invalid Request (bad envelope, batch)         |
//! | `-32601` | Method not found / unknown tool               |
//! | `-32602` | Invalid params (tool argument validation)     |
//! | `-32001` | Unauthorized                                  |
//! | `-32000` | Tool execution failed (device error)          |

use serde::Serialize;
use serde_json::{json, Value};

use crate::device::{DeviceCommand, DeviceError};
use crate::tools::{ToolName, ValidationError};

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const TOOL_EXECUTION_FAILED: i32 = -32000;
pub const UNAUTHORIZED: i32 = -32001;

/// A JSON-RPC response: exactly one of `result` or `error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn from_result(id: Value, outcome: Result<Value, RpcError>) -> Self {
        match outcome {
            Ok(result) => Self::success(id, result),
            Err(error) => Self::failure(id, error),
        }
    }
}

/// The `error` member of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::new(PARSE_ERROR, "Parse error").with_data(json!({ "detail": detail.to_string() }))
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::new(INVALID_REQUEST, "Invalid Request").with_data(json!({ "reason": reason.into() }))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn invalid_params(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(INVALID_PARAMS, reason.clone()).with_data(json!({ "reason": reason }))
    }

    pub fn unauthorized() -> Self {
        Self::new(UNAUTHORIZED, "Unauthorized")
    }

    /// A device call made on behalf of `tool` failed.
    pub fn tool_failed(tool: ToolName, command: &DeviceCommand, err: &DeviceError) -> Self {
        let mut data = json!({
            "classification": err.classification(),
            "tool": tool.as_str(),
            "endpoint": command.endpoint(),
            "detail": err.to_string(),
        });
        if let Some(status) = err.status() {
            data["status"] = json!(status);
        }
        Self::new(
            TOOL_EXECUTION_FAILED,
            format!("Failed to execute '{tool}': {err}"),
        )
        .with_data(data)
    }
}

impl From<ValidationError> for RpcError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::UnknownTool(_) => {
                let reason = err.to_string();
                Self::new(METHOD_NOT_FOUND, reason.clone()).with_data(json!({ "reason": reason }))
            }
            other => Self::invalid_params(other.to_string()),
        }
    }
}
