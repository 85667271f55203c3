//! End-to-end tests: the full router driven with `oneshot`, talking to a
//! WireMock stand-in for the device.

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{
    matchers::{any, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use fancy_gateway::{router, AppState, Config};

const TOKEN: &str = "test-token";

fn config_for(ip: &str, port: u16) -> Config {
    let mut config = Config::default();
    config.auth.token = TOKEN.into();
    config.device.ip = ip.into();
    config.device.port = port;
    config.device.timeout_ms = 1_000;
    config
}

fn config_for_mock(server: &MockServer) -> Config {
    let addr = server.address();
    config_for(&addr.ip().to_string(), addr.port())
}

fn app(config: Config) -> Router {
    router(AppState::new(config).unwrap())
}

fn mcp_request(auth: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn tool_call(id: Value, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn call(config: Config, body: &Value) -> (StatusCode, Value) {
    let bearer = format!("Bearer {TOKEN}");
    send(app(config), mcp_request(Some(&bearer), body)).await
}

/// A device address where nothing is listening.
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn beep_reaches_device() {
    let device = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/B1/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&device)
        .await;

    let request = tool_call(json!(1), "beep", json!({}));
    let (status, body) = call(config_for_mock(&device), &request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);
    assert!(body.get("error").is_none());
    assert_eq!(body["result"]["isError"], false);
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Success: Command 'beep' executed."));
    assert!(text.contains("Endpoint: /B1/1"));
}

#[tokio::test]
async fn shock_is_clamped_to_safety_ceiling() {
    let device = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Z1/1"))
        .and(query_param("power", "50"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&device)
        .await;

    let mut config = config_for_mock(&device);
    config.safety.max_power = Some(50);
    let (status, body) = call(config, &tool_call(json!(2), "shock", json!({ "power": 100 }))).await;

    assert_eq!(status, StatusCode::OK);
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("\"power_level\": 50"));
    assert!(text.contains("\"power_limited_from\": 100"));
}

#[tokio::test]
async fn shock_out_of_range_never_reaches_device() {
    let device = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&device)
        .await;

    for power in [json!(0), json!(101), json!("50"), json!(2.5)] {
        let (status, body) = call(
            config_for_mock(&device),
            &tool_call(json!(3), "shock", json!({ "power": power })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], -32602, "power {power}");
    }
}

#[tokio::test]
async fn pet_training_mode_selects_path() {
    let device = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mode/S2F"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&device)
        .await;

    let (_, body) = call(
        config_for_mock(&device),
        &tool_call(json!("pt"), "pet_training", json!({ "action": "on", "mode": "fast" })),
    )
    .await;
    assert_eq!(body["id"], "pt");
    assert_eq!(body["result"]["isError"], false);
}

#[tokio::test]
async fn raw_command_is_forwarded_verbatim() {
    let device = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/REL/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&device)
        .await;

    let (_, body) = call(
        config_for_mock(&device),
        &tool_call(json!(4), "send_raw_command", json!({ "command": "/REL/1" })),
    )
    .await;
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("\"ok\": true"));
}

#[tokio::test]
async fn raw_command_traversal_is_rejected() {
    let device = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&device)
        .await;

    for command in ["/../etc", "REL/1", ""] {
        let (_, body) = call(
            config_for_mock(&device),
            &tool_call(json!(5), "send_raw_command", json!({ "command": command })),
        )
        .await;
        assert_eq!(body["error"]["code"], -32602, "command {command:?}");
    }
}

#[tokio::test]
async fn missing_or_wrong_token_is_401() {
    let device = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&device)
        .await;

    let body = tool_call(json!(1), "beep", json!({}));
    for auth in [None, Some("Bearer wrong"), Some("bearer test-token"), Some("")] {
        let (status, resp) = send(app(config_for_mock(&device)), mcp_request(auth, &body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "auth {auth:?}");
        assert_eq!(resp["error"]["code"], -32001);
        assert_eq!(resp["id"], Value::Null);
    }
}

#[tokio::test]
async fn bare_token_is_accepted() {
    let device = MockServer::start().await;
    let ping = json!({ "jsonrpc": "2.0", "id": 9, "method": "ping" });
    let (status, body) = send(app(config_for_mock(&device)), mcp_request(Some(TOKEN), &ping)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!({}));
}

#[tokio::test]
async fn unknown_tool_makes_no_device_call() {
    let device = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&device)
        .await;

    let request = tool_call(json!(6), "zap", json!({}));
    let (status, body) = call(config_for_mock(&device), &request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32601);
    assert_eq!(body["id"], 6);
}

#[tokio::test]
async fn unreachable_device_is_classified() {
    let config = config_for("127.0.0.1", closed_port());
    let (status, body) = call(config, &tool_call(json!(7), "beep", json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 7);
    assert_eq!(body["error"]["code"], -32000);
    assert_eq!(body["error"]["data"]["classification"], "unreachable");
    assert_eq!(body["error"]["data"]["endpoint"], "/B1/1");
}

#[tokio::test]
async fn device_error_status_is_classified() {
    let device = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/S1/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&device)
        .await;

    let (status, body) = call(
        config_for_mock(&device),
        &tool_call(json!(8), "warning_buzzer", json!({ "action": "on" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32000);
    assert_eq!(body["error"]["data"]["classification"], "device_error");
    assert_eq!(body["error"]["data"]["status"], 500);
}

#[tokio::test]
async fn slow_device_times_out() {
    let device = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&device)
        .await;

    let mut config = config_for_mock(&device);
    config.device.timeout_ms = 100;
    let (status, body) = call(config, &tool_call(json!(10), "beep", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["data"]["classification"], "timeout");
}

#[tokio::test]
async fn shock_with_null_power_never_reaches_device() {
    let device = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&device)
        .await;

    let mut config = config_for_mock(&device);
    config.safety.max_power = Some(50);
    let request = tool_call(json!(11), "shock", json!({ "power": null }));
    let (status, body) = call(config, &request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32602);
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn power_control_set_is_not_a_device_command() {
    let device = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&device)
        .await;

    let request = tool_call(
        json!(12),
        "power_control",
        json!({ "action": "set", "level": 80 }),
    );
    let (_, body) = call(config_for_mock(&device), &request).await;
    assert_eq!(body["error"]["code"], -32602);
}

#[tokio::test]
async fn health_answers_while_mcp_is_saturated() {
    let device = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&device)
        .await;

    let mut config = config_for_mock(&device);
    config.server.max_concurrent_requests = 1;
    config.device.timeout_ms = 5_000;
    let app = app(config);

    let bearer = format!("Bearer {TOKEN}");
    let slow = mcp_request(Some(&bearer), &tool_call(json!(1), "beep", json!({})));
    let in_flight = tokio::spawn(app.clone().oneshot(slow));

    // Wait until the beep holds the only permit and is parked on the device.
    tokio::time::timeout(Duration::from_secs(1), async {
        while device.received_requests().await.unwrap_or_default().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("beep never reached the device");

    let ping = json!({ "jsonrpc": "2.0", "id": 2, "method": "ping" });
    let blocked = tokio::time::timeout(
        Duration::from_millis(200),
        app.clone().oneshot(mcp_request(Some(&bearer), &ping)),
    )
    .await;
    assert!(blocked.is_err(), "second /mcp call should wait for a permit");

    let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = tokio::time::timeout(Duration::from_secs(1), app.oneshot(health))
        .await
        .expect("/health blocked behind the device call")
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    in_flight.abort();
}

#[tokio::test]
async fn parse_error_envelope() {
    let device = MockServer::start().await;
    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::from("{oops"))
        .unwrap();
    let (status, body) = send(app(config_for_mock(&device)), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn null_id_is_echoed() {
    let device = MockServer::start().await;
    let (_, body) = call(
        config_for_mock(&device),
        &json!({ "jsonrpc": "2.0", "id": null, "method": "tools/list" }),
    )
    .await;
    assert_eq!(body["id"], Value::Null);
    assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn notification_is_accepted_without_body() {
    let device = MockServer::start().await;
    let (status, body) = call(
        config_for_mock(&device),
        &json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn initialize_sets_session_header() {
    let device = MockServer::start().await;
    let bearer = format!("Bearer {TOKEN}");
    let body = json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} });
    let resp = app(config_for_mock(&device))
        .oneshot(mcp_request(Some(&bearer), &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("mcp-session-id"));
    assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    assert_eq!(resp.headers()["cache-control"], "no-cache");
}

#[tokio::test]
async fn initialize_is_idempotent() {
    let device = MockServer::start().await;
    let body = json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize" });
    let (_, first) = call(config_for_mock(&device), &body).await;
    let (_, second) = call(config_for_mock(&device), &body).await;
    assert_eq!(first["result"], second["result"]);
    assert_eq!(first["result"]["protocolVersion"], "2024-11-05");
}

#[tokio::test]
async fn health_and_root_are_public() {
    let device = MockServer::start().await;
    let mut config = config_for_mock(&device);
    config.safety.max_power = Some(40);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(config.clone()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["device_configured"], true);
    assert_eq!(body["safety_max_power"], 40);

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(app(config), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mcp_endpoint"], "/mcp");
    assert_eq!(body["tools"].as_array().unwrap().len(), 10);
}
