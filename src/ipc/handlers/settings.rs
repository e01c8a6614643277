// SPDX-License-Identifier: MIT
// settings.toggleRealtime RPC handler.

use crate::AppContext;
use anyhow::Result;
use serde_json::{json, Value};

/// `settings.toggleRealtime` — flip the realtime-suggestions setting.
///
/// Precondition: the permission gate must allow setting changes (denial maps
/// to the permission-denied RPC code, with no state change). On success the
/// dispatcher has already cancelled all in-flight pipelines; this handler
/// broadcasts `settings.changed` to the UI layer and returns the new value.
pub async fn toggle_realtime(_params: Value, ctx: &AppContext) -> Result<Value> {
    let enabled = ctx.dispatcher.toggle_realtime().await?;
    ctx.broadcaster.broadcast(
        "settings.changed",
        json!({ "realtimeSuggestions": enabled }),
    );
    Ok(json!({ "realtimeSuggestions": enabled }))
}
