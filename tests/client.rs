use mcpsnag::client::{ClientOptions, McpClient};
use mcpsnag::error::McpSnagError;
use mcpsnag::protocol::SESSION_HEADER;
use serde_json::json;
use serde_json::value::RawValue;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INIT_RESULT: &str = r#"{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2025-03-26","capabilities":{"tools":{"listChanged":true}},"serverInfo":{"name":"test-server","version":"1.2.0"}}}"#;

fn client(server: &MockServer) -> McpClient {
    McpClient::new(ClientOptions::new(format!("{}/mcp", server.uri()))).unwrap()
}

fn json_body(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json")
}

async fn mount_initialize(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({"method": "initialize"})))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn mount_initialized(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({"method": "notifications/initialized"})))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_handshake_propagates_session() {
    let server = MockServer::start().await;
    mount_initialize(
        &server,
        json_body(INIT_RESULT).insert_header(SESSION_HEADER, "abc"),
    )
    .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "notifications/initialized"})))
        .and(header(SESSION_HEADER, "abc"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tools/list", "id": 2})))
        .and(header(SESSION_HEADER, "abc"))
        .respond_with(json_body(r#"{"jsonrpc":"2.0","id":2,"result":{"tools":[]}}"#))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client(&server);
    let result = client.initialize().await.unwrap();

    assert_eq!(result.protocol_version, "2025-03-26");
    assert_eq!(result.server_info.name, "test-server");
    assert_eq!(client.session().id, "abc");
    assert!(client.session().is_valid());
    assert_eq!(
        client.session().server_info.as_ref().map(|s| s.version.as_str()),
        Some("1.2.0")
    );

    let response = client.request("tools/list", None, None).await.unwrap().unwrap();
    assert_eq!(response.result.unwrap().get(), r#"{"tools":[]}"#);
}

#[tokio::test]
async fn test_handshake_without_session_header() {
    let server = MockServer::start().await;
    mount_initialize(&server, json_body(INIT_RESULT)).await;
    mount_initialized(&server, ResponseTemplate::new(202)).await;

    let mut client = client(&server);
    client.initialize().await.unwrap();

    assert!(!client.session().is_valid());
    assert!(client.session().capabilities.is_some());
    assert_eq!(client.transport().header(SESSION_HEADER), None);
}

#[tokio::test]
async fn test_initialize_remote_error_leaves_session_unchanged() {
    let server = MockServer::start().await;
    mount_initialize(
        &server,
        json_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32600,"message":"unsupported version"}}"#)
            .insert_header(SESSION_HEADER, "never-used"),
    )
    .await;

    let mut client = client(&server);
    let err = client.initialize().await.unwrap_err();

    assert!(err.is_remote());
    assert_eq!(err.remote_error().map(|e| e.code), Some(-32600));
    assert_eq!(err.to_string(), "unsupported version");
    assert!(!client.session().is_valid());
    assert!(client.session().server_info.is_none());
}

#[tokio::test]
async fn test_initialize_accepted_without_body_fails() {
    let server = MockServer::start().await;
    mount_initialize(&server, ResponseTemplate::new(202)).await;

    let mut client = client(&server);
    let err = client.initialize().await.unwrap_err();

    assert!(matches!(err, McpSnagError::MissingResponse("initialize")));
    assert!(!client.session().is_valid());
}

#[tokio::test]
async fn test_initialize_malformed_result_is_protocol_error() {
    let server = MockServer::start().await;
    mount_initialize(
        &server,
        json_body(r#"{"jsonrpc":"2.0","id":1,"result":{"serverInfo":"nope"}}"#)
            .insert_header(SESSION_HEADER, "abc"),
    )
    .await;

    let mut client = client(&server);
    let err = client.initialize().await.unwrap_err();

    assert!(matches!(err, McpSnagError::Protocol { .. }));
    assert!(!client.session().is_valid());
}

#[tokio::test]
async fn test_initialized_notification_failure_is_reported() {
    let server = MockServer::start().await;
    mount_initialize(
        &server,
        json_body(INIT_RESULT).insert_header(SESSION_HEADER, "abc"),
    )
    .await;
    mount_initialized(&server, ResponseTemplate::new(500).set_body_string("boom")).await;

    let mut client = client(&server);
    let err = client.initialize().await.unwrap_err();

    match &err {
        McpSnagError::InitializedNotification(inner) => {
            assert!(matches!(**inner, McpSnagError::Http { status: 500, .. }));
        }
        other => panic!("expected notification failure, got {:?}", other),
    }
    assert!(!client.session().is_valid());
    assert_eq!(client.transport().header(SESSION_HEADER), None);
}

#[tokio::test]
async fn test_remote_error_keeps_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(json_body(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found","data":{"method":"nope"}}}"#,
        ))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client.request("nope", None, None).await.unwrap_err();

    let error = err.remote_error().unwrap();
    assert_eq!(error.code, -32601);
    assert_eq!(error.message, "Method not found");
    assert_eq!(error.data.as_ref().unwrap().get(), r#"{"method":"nope"}"#);

    let response = err.response().unwrap();
    assert!(response.is_error());
    assert!(response.result.is_none());
}

#[tokio::test]
async fn test_accepted_request_and_notification() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(202))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    client.notify("notifications/cancelled", None).await.unwrap();
    let response = client.request("ping", None, None).await.unwrap();
    assert!(response.is_none());
}

#[tokio::test]
async fn test_notification_has_no_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "jsonrpc": "2.0",
            "method": "notifications/progress",
            "params": {"progress": 1}
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let params = RawValue::from_string(r#"{"progress":1}"#.to_string()).unwrap();
    client
        .notify("notifications/progress", Some(&params))
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert!(body.get("id").is_none());
}

#[tokio::test]
async fn test_ids_increase_even_after_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"id": 1})))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"id": 2, "method": "tools/call"})))
        .respond_with(json_body(r#"{"jsonrpc":"2.0","id":2,"result":{}}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client.request("tools/list", None, None).await.unwrap_err();
    assert!(matches!(err, McpSnagError::Http { status: 503, .. }));

    client.request("tools/call", None, None).await.unwrap();
}

#[tokio::test]
async fn test_params_are_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "tools/call",
            "params": {"name": "echo", "arguments": {"text": "hi"}}
        })))
        .respond_with(json_body(r#"{"jsonrpc":"2.0","id":1,"result":{"content":[]}}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let params =
        RawValue::from_string(r#"{"name":"echo","arguments":{"text":"hi"}}"#.to_string()).unwrap();
    client
        .request("tools/call", Some(&params), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_existing_session_skips_handshake() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tools/list", "id": 1})))
        .and(header(SESSION_HEADER, "resumed"))
        .respond_with(json_body(r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#))
        .expect(1)
        .mount(&server)
        .await;

    let mut options = ClientOptions::new(format!("{}/mcp", server.uri()));
    options.session_id = Some("resumed".to_string());
    let client = McpClient::new(options).unwrap();

    client.request("tools/list", None, None).await.unwrap();
}

#[tokio::test]
async fn test_raw_request_returns_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"id": "custom", "method": "ping"})))
        .respond_with(
            json_body(r#"{"jsonrpc":"2.0","id":"custom","result":{}}"#)
                .insert_header(SESSION_HEADER, "raw-sess"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let body = br#"{"jsonrpc":"2.0","id":"custom","method":"ping"}"#.to_vec();
    let exchange = client.raw_request(body, None).await.unwrap();

    assert_eq!(exchange.session_id, "raw-sess");
    assert!(exchange.response.is_some());
    // Raw requests never touch the session.
    assert!(!client.session().is_valid());
}

#[tokio::test]
async fn test_initialized_is_a_notification_with_shared_headers() {
    let server = MockServer::start().await;
    mount_initialize(
        &server,
        json_body(INIT_RESULT).insert_header(SESSION_HEADER, "abc"),
    )
    .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "notifications/initialized"})))
        .and(header("Authorization", "Bearer t"))
        .and(header(SESSION_HEADER, "abc"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let mut options = ClientOptions::new(format!("{}/mcp", server.uri()));
    options
        .headers
        .insert("Authorization".to_string(), "Bearer t".to_string());
    let mut client = McpClient::new(options).unwrap();
    client.initialize().await.unwrap();

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[1].body).unwrap();
    assert_eq!(body["method"], json!("notifications/initialized"));
    assert!(body.get("id").is_none());
    assert!(body.get("params").is_none());
}
