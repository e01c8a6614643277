// SPDX-License-Identifier: MIT
// RPC boundary tests against `dispatch_text` — no WebSocket needed.

use hintd::config::{DaemonConfig, HotConfig};
use hintd::engine::NullEngine;
use hintd::ipc::dispatch_text;
use hintd::ipc::handlers::extension::UnhandledPassthrough;
use hintd::AppContext;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

fn test_ctx(data_dir: &Path, allow_setting_changes: bool) -> Arc<AppContext> {
    let config = Arc::new(DaemonConfig::new(
        Some(0),
        Some(data_dir.to_path_buf()),
        Some("info".into()),
        None,
    ));
    let hot = Arc::new(RwLock::new(HotConfig {
        log_level: "info".into(),
        allow_setting_changes,
    }));
    AppContext::new(
        config,
        Arc::new(NullEngine),
        Arc::new(UnhandledPassthrough),
        hot,
        String::new(),
    )
}

async fn call(ctx: &AppContext, method: &str, params: Value) -> Value {
    let req = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params
    })
    .to_string();
    let resp = dispatch_text(&req, ctx).await.expect("expected a response");
    serde_json::from_str(&resp).unwrap()
}

fn error_code(resp: &Value) -> i64 {
    resp["error"]["code"].as_i64().expect("expected an error")
}

#[tokio::test]
async fn ping_pongs() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path(), true);
    let resp = call(&ctx, "daemon.ping", json!({})).await;
    assert_eq!(resp["result"]["pong"], json!(true));
}

#[tokio::test]
async fn unknown_method_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path(), true);
    let resp = call(&ctx, "no.such.method", json!({})).await;
    assert_eq!(error_code(&resp), -32601);
}

#[tokio::test]
async fn parse_error_and_invalid_request() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path(), true);

    let resp: Value =
        serde_json::from_str(&dispatch_text("{not json", &ctx).await.unwrap()).unwrap();
    assert_eq!(error_code(&resp), -32700);

    let bad_version = json!({ "jsonrpc": "1.0", "id": 1, "method": "daemon.ping" }).to_string();
    let resp: Value =
        serde_json::from_str(&dispatch_text(&bad_version, &ctx).await.unwrap()).unwrap();
    assert_eq!(error_code(&resp), -32600);
}

#[tokio::test]
async fn notifications_get_no_response() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path(), true);
    let req = json!({ "jsonrpc": "2.0", "method": "daemon.ping" }).to_string();
    assert!(dispatch_text(&req, &ctx).await.is_none());
}

#[tokio::test]
async fn suggestion_get_with_null_engine_replies_no_content() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path(), true);
    let resp = call(
        &ctx,
        "suggestion.get",
        json!({
            "content": {
                "filePath": "/w/Project/src/main.rs",
                "content": "fn main() {}\n",
                "cursor": { "line": 0, "col": 0 }
            }
        }),
    )
    .await;
    assert!(resp["result"]["content"].is_null());
    assert!(resp.get("error").is_none());
}

#[tokio::test]
async fn suggestion_get_with_bad_payload_is_invalid_params() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path(), true);
    let resp = call(&ctx, "suggestion.get", json!({ "content": { "bogus": 1 } })).await;
    assert_eq!(error_code(&resp), -32602);
}

#[tokio::test]
async fn custom_without_command_id_is_invalid_params() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path(), true);
    let resp = call(
        &ctx,
        "suggestion.custom",
        json!({
            "content": {
                "filePath": "/w/a.rs",
                "content": "",
                "cursor": { "line": 0, "col": 0 }
            }
        }),
    )
    .await;
    assert_eq!(error_code(&resp), -32602);
}

#[tokio::test]
async fn prefetch_acknowledges() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path(), true);
    let resp = call(
        &ctx,
        "suggestion.prefetch",
        json!({
            "content": {
                "filePath": "/w/a.rs",
                "content": "",
                "cursor": { "line": 0, "col": 0 }
            }
        }),
    )
    .await;
    assert_eq!(resp["result"]["acknowledged"], json!(true));
}

#[tokio::test]
async fn passthrough_defaults_to_unhandled() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path(), true);
    let resp = call(
        &ctx,
        "extension.request",
        json!({ "endpoint": "telemetry/flush", "body": {} }),
    )
    .await;
    assert_eq!(error_code(&resp), -32003);
}

#[tokio::test]
async fn toggle_respects_permission_gate() {
    let dir = tempfile::tempdir().unwrap();

    let denied = test_ctx(dir.path(), false);
    let resp = call(&denied, "settings.toggleRealtime", json!({})).await;
    assert_eq!(error_code(&resp), -32002);

    let allowed = test_ctx(dir.path(), true);
    let resp = call(&allowed, "settings.toggleRealtime", json!({})).await;
    assert_eq!(resp["result"]["realtimeSuggestions"], json!(false));
    let resp = call(&allowed, "settings.toggleRealtime", json!({})).await;
    assert_eq!(resp["result"]["realtimeSuggestions"], json!(true));
}

#[tokio::test]
async fn workspace_and_auth_feeds_drive_session_current() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path(), true);
    let _reactor = ctx.spawn_reactor();

    let resp = call(&ctx, "session.current", json!({})).await;
    assert!(resp["result"].is_null());

    call(
        &ctx,
        "workspace.didChangeActive",
        json!({ "path": "/Users/a/Project.xcodeproj" }),
    )
    .await;
    call(
        &ctx,
        "auth.statusChanged",
        json!({ "status": "loggedIn", "username": "alice" }),
    )
    .await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let resp = call(&ctx, "session.current", json!({})).await;
    assert_eq!(resp["result"]["name"], json!("Project"));
    assert_eq!(resp["result"]["username"], json!("alice"));
    assert_eq!(resp["result"]["tabs"].as_array().unwrap().len(), 1);

    ctx.shutdown.cancel();
}

#[tokio::test]
async fn status_reports_session_and_settings() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path(), true);
    let resp = call(&ctx, "daemon.status", json!({})).await;
    assert_eq!(resp["result"]["version"], json!(env!("CARGO_PKG_VERSION")));
    assert_eq!(resp["result"]["realtimeSuggestions"], json!(true));
    assert!(resp["result"]["activeSession"].is_null());
}
