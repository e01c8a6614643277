// SPDX-License-Identifier: MIT
// Workspace/auth feed producers + session view.
//
// The editor extension reports focus and sign-in changes through these
// handlers; they only update the signal cells. Gating, deduplication beyond
// the cells, and the actual switch all happen in the reactor.

use crate::workspace::signals::{AuthPhase, AuthStatus};
use crate::AppContext;
use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;

/// `workspace.didChangeActive { path: string|null }`
pub async fn did_change_active(params: Value, ctx: &AppContext) -> Result<Value> {
    #[derive(Deserialize)]
    struct Params {
        path: Option<String>,
    }
    let p: Params = serde_json::from_value(params)?;
    // "" and "/" pass through as-is; the reactor's gate treats them as
    // "no active workspace".
    ctx.signals.set_active_workspace(p.path.map(PathBuf::from));
    Ok(json!({ "ok": true }))
}

/// `auth.statusChanged { status, username? }`
pub async fn auth_status_changed(params: Value, ctx: &AppContext) -> Result<Value> {
    #[derive(Deserialize)]
    struct Params {
        status: AuthPhase,
        #[serde(default)]
        username: Option<String>,
    }
    let p: Params = serde_json::from_value(params)?;
    ctx.signals.set_auth_status(AuthStatus {
        phase: p.status,
        username: p.username,
    });
    Ok(json!({ "ok": true }))
}

/// `session.current` — the active session with its tabs, or null.
pub async fn current_session(_params: Value, ctx: &AppContext) -> Result<Value> {
    match ctx.sessions.current().await {
        Some((active, tabs)) => Ok(json!({
            "path": active.path,
            "name": active.name,
            "username": active.username,
            "tabs": tabs,
        })),
        None => Ok(Value::Null),
    }
}
