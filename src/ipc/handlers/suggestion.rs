// SPDX-License-Identifier: MIT
// suggestion.* RPC handlers.
//
// Thin decode layer over the dispatcher: maps the method name to a
// `SuggestionOperation`, hands the raw editor payload down, and renders the
// pipeline outcome as a JSON-RPC result. A superseded pipeline yields
// `Ok(None)` — the connection loop then sends no response at all.

use crate::error::CoordinatorError;
use crate::suggestion::dispatcher::PipelineOutcome;
use crate::suggestion::model::SuggestionOperation;
use crate::AppContext;
use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
struct Params {
    /// Raw editor payload — decoded by the dispatcher, not here.
    #[serde(default)]
    content: Value,
    /// Only for `suggestion.custom`.
    #[serde(rename = "commandId", default)]
    command_id: Option<String>,
}

/// Route one `suggestion.*` method. `Ok(None)` means "send no response".
pub async fn dispatch(method: &str, params: Value, ctx: &AppContext) -> Result<Option<Value>> {
    let p: Params = serde_json::from_value(params)?;

    let op = match method {
        "suggestion.get" => SuggestionOperation::Get,
        "suggestion.next" => SuggestionOperation::Next,
        "suggestion.previous" => SuggestionOperation::Previous,
        "suggestion.accept" => SuggestionOperation::Accept,
        "suggestion.reject" => SuggestionOperation::Reject,
        "suggestion.acceptPromptToCode" => SuggestionOperation::AcceptPromptToCode,
        "suggestion.promptToCode" => SuggestionOperation::PromptToCode,
        "suggestion.custom" => SuggestionOperation::Custom {
            command_id: custom_command_id(p.command_id, ctx)?,
        },
        "suggestion.realtime" => SuggestionOperation::Realtime,
        "suggestion.prefetch" => {
            // Fire-and-forget: acknowledged before the pipeline runs.
            ctx.dispatcher.prefetch(p.content).await?;
            return Ok(Some(json!({ "acknowledged": true })));
        }
        _ => anyhow::bail!("METHOD_NOT_FOUND:{method}"),
    };

    match ctx.dispatcher.dispatch(op, p.content).await? {
        PipelineOutcome::Content(updated) => Ok(Some(json!({ "content": updated }))),
        // No suggestion available — a normal reply, distinct from failure.
        PipelineOutcome::Empty => Ok(Some(json!({ "content": null }))),
        PipelineOutcome::Superseded => Ok(None),
    }
}

fn custom_command_id(id: Option<String>, ctx: &AppContext) -> Result<String, CoordinatorError> {
    let id = id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoordinatorError::Decode("suggestion.custom requires commandId".into()))?;

    // An empty configured list means any command id is accepted.
    let known = &ctx.config.suggestion.custom_commands;
    if !known.is_empty() && !known.iter().any(|c| c == &id) {
        return Err(CoordinatorError::Decode(format!(
            "unknown custom command '{id}'"
        )));
    }
    Ok(id)
}
