//! MCP (Model Context Protocol) JSON-RPC dispatcher.
//!
//! Handles one JSON-RPC message per HTTP request. Nothing is carried between
//! requests apart from the immutable state in [`AppState`].
//!
//! ## Supported methods
//!
//! | Method            | Description                                |
//! |-------------------|--------------------------------------------|
//! | `initialize`      | Handshake, returns capabilities            |
//! | `initialized`     | Legacy handshake ack, empty result         |
//! | `tools/list`      | List the ten tool definitions              |
//! | `tools/call`      | Validate, send to the device, report back  |
//! | `resources/list`  | Empty list                                 |
//! | `resources/read`  | Empty contents                             |
//! | `prompts/list`    | Empty list                                 |
//! | `prompts/get`     | Empty messages                             |
//! | `ping`            | Liveness check                             |
//!
//! Notifications (`notifications/*` without an `id`) are acknowledged with no
//! JSON-RPC response. Batches (JSON arrays) are rejected with `-32600`.

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::device::{DeviceCommand, DeviceReply};
use crate::protocol::{JsonRpcResponse, RpcError, JSONRPC_VERSION, PROTOCOL_VERSION};
use crate::tools::{self, ToolName, ValidationError};
use crate::AppState;

pub const SERVER_NAME: &str = "fancy-gateway";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// What the transport should send back for one inbound message.
#[derive(Debug)]
pub enum Dispatch {
    /// A JSON-RPC response. `session_id` is set for `initialize`.
    Reply {
        response: JsonRpcResponse,
        session_id: Option<String>,
    },
    /// A notification was received; nothing to send.
    Accepted,
}

impl Dispatch {
    fn reply(response: JsonRpcResponse) -> Self {
        Self::Reply {
            response,
            session_id: None,
        }
    }

    /// The JSON-RPC response, if any.
    #[cfg(test)]
    fn response(&self) -> Option<&JsonRpcResponse> {
        match self {
            Self::Reply { response, .. } => Some(response),
            Self::Accepted => None,
        }
    }
}

/// Parse a raw request body and route it.
pub async fn handle_body(body: &[u8], state: &AppState) -> Dispatch {
    let message: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            debug!("Rejecting unparseable body: {e}");
            return Dispatch::reply(JsonRpcResponse::failure(Value::Null, RpcError::parse_error(e)));
        }
    };
    handle_message(message, state).await
}

/// Route an already-parsed JSON-RPC message.
pub async fn handle_message(message: Value, state: &AppState) -> Dispatch {
    let request = match message {
        Value::Object(request) => request,
        Value::Array(_) => {
            return Dispatch::reply(JsonRpcResponse::failure(
                Value::Null,
                RpcError::invalid_request("batch requests are not supported"),
            ));
        }
        _ => {
            return Dispatch::reply(JsonRpcResponse::failure(
                Value::Null,
                RpcError::invalid_request("request must be a JSON object"),
            ));
        }
    };

    let raw_id = request.get("id").cloned();
    let id = raw_id.clone().unwrap_or(Value::Null);

    if request.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Dispatch::reply(JsonRpcResponse::failure(
            id,
            RpcError::invalid_request("jsonrpc must be \"2.0\""),
        ));
    }

    let Some(method) = request.get("method").and_then(Value::as_str) else {
        return Dispatch::reply(JsonRpcResponse::failure(
            id,
            RpcError::invalid_request("method must be a string"),
        ));
    };

    // Notifications (no id) are acknowledged silently
    if raw_id.is_none() && method.starts_with("notifications/") {
        debug!("Notification received: {method}");
        return Dispatch::Accepted;
    }

    let empty = Map::new();
    let params = match request.get("params") {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(params)) => params,
        Some(_) => {
            return Dispatch::reply(JsonRpcResponse::failure(
                id,
                RpcError::invalid_params("params must be an object"),
            ));
        }
    };

    info!("Received MCP request: method={method}, id={id}");

    let outcome = match method {
        "initialize" => {
            let session_id = uuid::Uuid::new_v4().to_string();
            return Dispatch::Reply {
                response: JsonRpcResponse::success(id, initialize_result()),
                session_id: Some(session_id),
            };
        }
        "initialized" | "ping" => Ok(json!({})),
        "tools/list" => Ok(state.catalog.to_list_result()),
        "tools/call" => handle_tools_call(params, state).await,
        "resources/list" => Ok(json!({ "resources": [] })),
        "resources/read" => Ok(json!({ "contents": [] })),
        "prompts/list" => Ok(json!({ "prompts": [] })),
        "prompts/get" => Ok(json!({ "messages": [] })),
        _ => Err(RpcError::method_not_found(method)),
    };

    Dispatch::reply(JsonRpcResponse::from_result(id, outcome))
}

/// `initialize` result: protocol version, capabilities, and server info.
pub fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {},
            "resources": {},
            "prompts": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION
        }
    })
}

/// `tools/call`: validate, send the device command, and wrap the outcome.
async fn handle_tools_call(
    params: &Map<String, Value>,
    state: &AppState,
) -> Result<Value, RpcError> {
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::invalid_params("Missing tool name"))?;

    let tool = ToolName::from_name(name).ok_or_else(|| {
        warn!("Unknown tool requested: {name}");
        RpcError::from(ValidationError::UnknownTool(name.to_string()))
    })?;

    let command = tools::resolve(tool, params.get("arguments"), state.config.safety.max_power)
        .map_err(|e| {
            warn!("Rejected '{tool}' call: {e}");
            RpcError::from(e)
        })?;

    if let Some(power) = command.power.filter(|p| p.was_limited()) {
        info!(
            "Power for '{tool}' limited from {} to {} by safety ceiling",
            power.requested, power.effective
        );
    }
    info!("Executing '{tool}' via {}", command.endpoint());

    match state.device.send(&command).await {
        Ok(reply) => {
            info!("Command successful: {}", command.endpoint());
            Ok(tool_success(tool, &command, &reply, state.config.safety.max_power))
        }
        Err(e) => {
            warn!("Device call for '{tool}' failed ({}): {e}", e.classification());
            Err(RpcError::tool_failed(tool, &command, &e))
        }
    }
}

/// Build the `tools/call` result for a delivered command.
fn tool_success(
    tool: ToolName,
    command: &DeviceCommand,
    reply: &DeviceReply,
    ceiling: Option<u8>,
) -> Value {
    let mut data = json!({
        "status": reply.status,
        "response": reply.body_json(),
    });
    if let Some(power) = command.power {
        data["power_level"] = json!(power.effective);
        if power.was_limited() {
            data["power_limited_from"] = json!(power.requested);
            data["safety_max_power"] = json!(ceiling);
        }
    }

    let pretty = serde_json::to_string_pretty(&data).unwrap_or_default();
    let text = format!(
        "Success: Command '{tool}' executed.\nEndpoint: {}\nResponse: {pretty}",
        command.endpoint()
    );

    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": false
    })
}
