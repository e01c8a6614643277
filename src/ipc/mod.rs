// SPDX-License-Identifier: MIT

pub mod auth;
pub mod event;
pub mod handlers;

use crate::error::CoordinatorError;
use crate::observability::LatencyTracker;
use crate::AppContext;
use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

// ─── JSON-RPC 2.0 types ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

#[derive(Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Serialize)]
struct RpcError {
    code: i32,
    message: String,
}

// ─── Error codes ─────────────────────────────────────────────────────────────
//
// engineFailed         = -32001  (completion engine failed or returned bad data)
// permissionDenied     = -32002  (settings-change precondition not met)
// passthroughUnhandled = -32003  (no handler for extension.request endpoint)
// unauthorized         = -32004

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;
const ENGINE_FAILED: i32 = -32001;
const PERMISSION_DENIED: i32 = -32002;
const PASSTHROUGH_UNHANDLED: i32 = -32003;
const UNAUTHORIZED: i32 = -32004;

// ─── Server ──────────────────────────────────────────────────────────────────

pub async fn run(ctx: Arc<AppContext>) -> Result<()> {
    let addr = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "IPC server listening");

    ctx.broadcaster.broadcast(
        "daemon.ready",
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "port": ctx.config.port
        }),
    );

    // Graceful shutdown: SIGTERM / Ctrl-C, or daemon.quit via the shutdown
    // token. Pinned so we can use it in the select! loop without moving.
    let shutdown = make_shutdown_future(ctx.shutdown.clone());
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("shutdown signal received — draining pipelines and stopping IPC server");
                // No-op when daemon.quit already drained.
                ctx.dispatcher.prepare_for_exit().await;
                break;
            }

            conn = listener.accept() => {
                let (stream, peer) = match conn {
                    Ok(c) => c,
                    Err(e) => {
                        error!(err = %e, "accept error");
                        continue;
                    }
                };
                debug!(peer = %peer, "new connection");
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, ctx).await {
                        warn!(peer = %peer, err = %e, "connection error");
                    }
                });
            }
        }
    }

    info!("IPC server stopped");
    Ok(())
}

/// Resolves when a shutdown signal is received: the in-process shutdown
/// token (daemon.quit), SIGTERM (Unix), or Ctrl-C.
async fn make_shutdown_future(token: tokio_util::sync::CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    }
}

async fn handle_connection(stream: tokio::net::TcpStream, ctx: Arc<AppContext>) -> Result<()> {
    let ws = accept_async(stream).await?;
    let (mut sink, mut stream) = ws.split();

    // ── Auth challenge ───────────────────────────────────────────────────────
    // The first frame of every connection must be a `daemon.auth` call
    // carrying the token from `{data_dir}/auth_token`. This keeps other
    // local processes from issuing suggestion or settings RPCs.
    if !ctx.auth_token.is_empty() {
        let first = tokio::time::timeout(std::time::Duration::from_secs(10), stream.next()).await;

        let text = match first {
            Ok(Some(Ok(Message::Text(t)))) => t,
            // Timeout, connection closed, or non-text frame — reject silently.
            _ => return Ok(()),
        };

        let req: RpcRequest = match serde_json::from_str(&text) {
            Ok(r) => r,
            Err(_) => {
                let _ = sink
                    .send(Message::Text(error_response(
                        Value::Null,
                        PARSE_ERROR,
                        "Parse error",
                    )))
                    .await;
                return Ok(());
            }
        };

        let id = req.id.clone().unwrap_or(Value::Null);

        if req.method != "daemon.auth" {
            let _ = sink
                .send(Message::Text(error_response(
                    id,
                    UNAUTHORIZED,
                    "Unauthorized — send daemon.auth first",
                )))
                .await;
            return Ok(());
        }

        let provided = req
            .params
            .as_ref()
            .and_then(|p| p.get("token"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        if provided != ctx.auth_token {
            let _ = sink
                .send(Message::Text(error_response(
                    id,
                    UNAUTHORIZED,
                    "Unauthorized — invalid token",
                )))
                .await;
            return Ok(());
        }

        let resp = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": { "authenticated": true }
        });
        let _ = sink.send(Message::Text(resp.to_string())).await;
        debug!("client authenticated");
    }

    // ── Concurrent request loop ──────────────────────────────────────────────
    // Each request is dispatched on its own task so a newer suggestion
    // request can arrive (and supersede) while an older one is still in
    // flight. Replies funnel through the outbox into the single writer half;
    // a superseded request produces no reply at all.
    let (out_tx, mut out_rx) = mpsc::channel::<String>(64);
    let mut broadcast_rx = ctx.broadcaster.subscribe();

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let ctx = ctx.clone();
                        let out = out_tx.clone();
                        tokio::spawn(async move {
                            if let Some(response) = dispatch_text(&text, &ctx).await {
                                let _ = out.send(response).await;
                            }
                        });
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(err = %e, "ws error");
                        break;
                    }
                    _ => {}
                }
            }
            response = out_rx.recv() => {
                if let Some(response) = response {
                    if let Err(e) = sink.send(Message::Text(response)).await {
                        warn!(err = %e, "send error");
                        break;
                    }
                }
            }
            event = broadcast_rx.recv() => {
                match event {
                    Ok(json) => {
                        if let Err(e) = sink.send(Message::Text(json)).await {
                            warn!(err = %e, "broadcast send error");
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "broadcast lagged");
                    }
                }
            }
        }
    }
    Ok(())
}

/// Parse and dispatch one frame. Returns `None` when no response should be
/// sent: JSON-RPC notifications (no id) and superseded suggestion requests.
pub async fn dispatch_text(text: &str, ctx: &AppContext) -> Option<String> {
    let req: RpcRequest = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(_) => {
            return Some(error_response(Value::Null, PARSE_ERROR, "Parse error"));
        }
    };

    if req.jsonrpc != "2.0" {
        return Some(error_response(
            req.id.unwrap_or(Value::Null),
            INVALID_REQUEST,
            "Invalid Request",
        ));
    }

    let is_notification = req.id.is_none();
    let id = req.id.unwrap_or(Value::Null);
    let params = req.params.unwrap_or(Value::Null);

    debug!(method = %req.method, "rpc dispatch");
    let tracker = LatencyTracker::start(req.method.clone());
    let result = dispatch(&req.method, params, ctx).await;
    tracker.finish();

    if is_notification {
        if let Err(e) = &result {
            debug!(method = %req.method, err = %e, "notification handler failed");
        }
        return None;
    }

    match result {
        Ok(Some(value)) => {
            let resp = RpcResponse {
                jsonrpc: "2.0",
                id,
                result: Some(value),
                error: None,
            };
            Some(serde_json::to_string(&resp).unwrap_or_default())
        }
        // Suppressed — a newer request owns the reply now.
        Ok(None) => None,
        Err(e) => {
            let (code, msg) = classify_error(&e);
            Some(error_response(id, code, &msg))
        }
    }
}

async fn dispatch(method: &str, params: Value, ctx: &AppContext) -> anyhow::Result<Option<Value>> {
    match method {
        m if m.starts_with("suggestion.") => handlers::suggestion::dispatch(m, params, ctx).await,
        "settings.toggleRealtime" => handlers::settings::toggle_realtime(params, ctx).await.map(Some),
        "workspace.didChangeActive" => handlers::workspace::did_change_active(params, ctx).await.map(Some),
        "auth.statusChanged" => handlers::workspace::auth_status_changed(params, ctx).await.map(Some),
        "session.current" => handlers::workspace::current_session(params, ctx).await.map(Some),
        "extension.request" => handlers::extension::request(params, ctx).await.map(Some),
        "daemon.ping" => handlers::daemon::ping(params, ctx).await.map(Some),
        "daemon.status" => handlers::daemon::status(params, ctx).await.map(Some),
        "daemon.quit" => handlers::daemon::quit(params, ctx).await.map(Some),
        // Idempotent re-auth on an already-authenticated connection.
        "daemon.auth" => Ok(Some(serde_json::json!({ "authenticated": true }))),
        _ => Err(anyhow::anyhow!("METHOD_NOT_FOUND:{}", method)),
    }
}

fn classify_error(e: &anyhow::Error) -> (i32, String) {
    // Typed coordinator errors first.
    if let Some(coord) = e.downcast_ref::<CoordinatorError>() {
        return match coord {
            CoordinatorError::Decode(_) => (INVALID_PARAMS, coord.to_string()),
            CoordinatorError::Engine(_) => (ENGINE_FAILED, coord.to_string()),
            CoordinatorError::PermissionDenied => (PERMISSION_DENIED, coord.to_string()),
            CoordinatorError::PassthroughUnhandled(_) => {
                (PASSTHROUGH_UNHANDLED, coord.to_string())
            }
            // Restore errors are swallowed at the switcher; one reaching the
            // boundary is a bug worth surfacing loudly.
            CoordinatorError::Restore(_) => (INTERNAL_ERROR, coord.to_string()),
        };
    }

    let msg = e.to_string();
    if msg.starts_with("METHOD_NOT_FOUND:") {
        return (METHOD_NOT_FOUND, "Method not found".to_string());
    }
    if msg.contains("missing field") || msg.contains("invalid type") || msg.contains("unknown variant") {
        return (INVALID_PARAMS, format!("Invalid params: {}", msg));
    }
    error!(err = %e, "internal error");
    (INTERNAL_ERROR, "Internal error".to_string())
}

fn error_response(id: Value, code: i32, message: &str) -> String {
    let resp = RpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(RpcError {
            code,
            message: message.to_string(),
        }),
    };
    serde_json::to_string(&resp).unwrap_or_default()
}
