// ABOUTME: End-to-end tests for the HTTP request/response channel
// ABOUTME: Drives POST /rpc with reqwest against a live listener
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs, clippy::missing_errors_doc, clippy::missing_panics_doc)]

mod common;

use common::{spawn_test_server, ADMIN_TOKEN, USER_TOKEN};
use serde_json::{json, Value};

async fn rpc(server: &common::TestServer, bearer: Option<&str>, body: Value) -> Value {
    let client = reqwest::Client::new();
    let mut request = client.post(server.http_url("/rpc")).json(&body);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }
    request
        .send()
        .await
        .expect("rpc request failed")
        .json()
        .await
        .expect("rpc response was not JSON")
}

#[tokio::test]
async fn initialize_advertises_tools_and_sampling() {
    let server = spawn_test_server().await;
    let response = rpc(
        &server,
        None,
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}),
    )
    .await;

    let result = &response["result"];
    assert_eq!(result["serverInfo"]["name"], "beacon-mcp-server");
    assert!(result["capabilities"].get("tools").is_some());
    assert!(result["capabilities"].get("sampling").is_some());
}

#[tokio::test]
async fn echo_round_trips_over_http() {
    let server = spawn_test_server().await;
    let response = rpc(
        &server,
        None,
        json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {"name": "echo", "arguments": {"k": "v"}}
        }),
    )
    .await;

    assert_eq!(response["id"], json!(2));
    assert_eq!(response["result"], json!({"k": "v"}));
}

#[tokio::test]
async fn admin_tool_requires_admin_bearer() {
    let server = spawn_test_server().await;
    let call = json!({
        "jsonrpc": "2.0",
        "id": 3,
        "method": "tools/call",
        "params": {"name": "admin_ping"}
    });

    let denied = rpc(&server, Some(USER_TOKEN), call.clone()).await;
    assert_eq!(denied["error"]["code"], json!(-32001));

    let allowed = rpc(&server, Some(ADMIN_TOKEN), call).await;
    assert_eq!(allowed["result"]["pong"], json!(true));
    assert_eq!(
        allowed["result"]["user_id"],
        json!(server.identities.admin_id)
    );
}

#[tokio::test]
async fn invalid_bearer_is_unauthorized_not_anonymous() {
    let server = spawn_test_server().await;
    let response = rpc(
        &server,
        Some("made-up-token"),
        json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {"name": "echo", "arguments": {}}
        }),
    )
    .await;
    assert_eq!(response["error"]["code"], json!(-32002));
}

#[tokio::test]
async fn tools_list_hides_admin_tools_from_regular_users() {
    let server = spawn_test_server().await;
    let body = json!({"jsonrpc": "2.0", "id": 5, "method": "tools/list"});

    let public = rpc(&server, Some(USER_TOKEN), body.clone()).await;
    let names: Vec<&str> = public["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"echo"));
    assert!(!names.contains(&"admin_ping"));

    let admin = rpc(&server, Some(ADMIN_TOKEN), body).await;
    let names: Vec<&str> = admin["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"admin_ping"));
}

#[tokio::test]
async fn record_tools_round_trip_with_user_credential() {
    let server = spawn_test_server().await;

    let put = rpc(
        &server,
        Some(USER_TOKEN),
        json!({
            "jsonrpc": "2.0",
            "id": 6,
            "method": "tools/call",
            "params": {"name": "put_record", "arguments": {"record_id": "r1", "record": {"v": 7}}}
        }),
    )
    .await;
    assert_eq!(put["result"]["saved"], json!("r1"));

    let get = rpc(
        &server,
        Some(USER_TOKEN),
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {"name": "get_record", "arguments": {"record_id": "r1"}}
        }),
    )
    .await;
    assert_eq!(get["result"], json!({"v": 7}));
}

#[tokio::test]
async fn ambiguous_frame_is_rejected_as_invalid_request() {
    let server = spawn_test_server().await;
    // id present, no method, no result/error
    let response = rpc(&server, None, json!({"jsonrpc": "2.0", "id": 9})).await;
    assert_eq!(response["error"]["code"], json!(-32600));
    assert_eq!(response["id"], json!(9));
}

#[tokio::test]
async fn response_frames_are_rejected_on_http() {
    let server = spawn_test_server().await;
    let response = rpc(
        &server,
        None,
        json!({"jsonrpc": "2.0", "id": 1, "result": {"ok": true}}),
    )
    .await;
    assert_eq!(response["error"]["code"], json!(-32600));
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let server = spawn_test_server().await;
    let response = rpc(
        &server,
        None,
        json!({"jsonrpc": "2.0", "id": 10, "method": "no/such/method"}),
    )
    .await;
    assert_eq!(response["error"]["code"], json!(-32601));
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let server = spawn_test_server().await;
    let response: Value = reqwest::get(server.http_url("/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response["status"], json!("ok"));
}
