// SPDX-License-Identifier: MIT
// daemon.* RPC handlers: ping, status, quit.

use crate::AppContext;
use anyhow::Result;
use serde_json::{json, Value};
use tracing::info;

pub async fn ping(_params: Value, _ctx: &AppContext) -> Result<Value> {
    Ok(json!({ "pong": true, "version": env!("CARGO_PKG_VERSION") }))
}

pub async fn status(_params: Value, ctx: &AppContext) -> Result<Value> {
    let active = ctx.sessions.current().await.map(|(session, tabs)| {
        json!({
            "path": session.path,
            "name": session.name,
            "username": session.username,
            "tabs": tabs.len(),
        })
    });

    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "port": ctx.config.port,
        "uptimeSecs": ctx.started_at.elapsed().as_secs(),
        "realtimeSuggestions": ctx.settings.realtime_enabled(),
        "activeSession": active,
    }))
}

/// `daemon.quit` — drain in-flight pipelines, reply, then stop the server.
///
/// The ack is produced after the drain completes; the listener stop is
/// deferred a moment so the reply reaches the wire before the connection
/// goes away.
pub async fn quit(_params: Value, ctx: &AppContext) -> Result<Value> {
    info!("quit requested — draining in-flight pipelines");
    ctx.dispatcher.prepare_for_exit().await;

    let shutdown = ctx.shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        shutdown.cancel();
    });

    Ok(json!({ "quitting": true }))
}
