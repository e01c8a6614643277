// SPDX-License-Identifier: MIT
//! Suggestion dispatcher.
//!
//! Every suggestion operation — regardless of kind — shares one pipeline
//! slot, so a newer request of any kind supersedes an older one of any kind.
//! The reply policy:
//!
//! - decode failure → replied immediately, no pipeline started;
//! - engine `Some(content)` → content reply;
//! - engine `None` → "no content, no error" reply;
//! - engine error → error reply to the request that triggered it;
//! - superseded → **no reply at all** (the reply channel is dropped);
//! - prefetch → acknowledged before the pipeline even starts.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::engine::SuggestionEngine;
use crate::error::CoordinatorError;
use crate::settings::{PermissionGate, SettingsStore};
use crate::suggestion::model::{EditorContent, SuggestionOperation, UpdatedContent};
use crate::task_slot::TaskSlots;

/// All suggestion operations share this slot key.
const SUGGESTION_SLOT: &str = "suggestion-pipeline";

/// How a dispatched operation concluded, from the caller's point of view.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The engine produced a suggestion.
    Content(UpdatedContent),
    /// The pipeline completed with no suggestion available.
    Empty,
    /// A newer operation took the slot — the caller must receive no reply.
    Superseded,
}

pub struct SuggestionDispatcher {
    slots: TaskSlots,
    engine: Arc<dyn SuggestionEngine>,
    settings: Arc<SettingsStore>,
    gate: Arc<dyn PermissionGate>,
}

impl SuggestionDispatcher {
    pub fn new(
        engine: Arc<dyn SuggestionEngine>,
        settings: Arc<SettingsStore>,
        gate: Arc<dyn PermissionGate>,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            slots: TaskSlots::new(drain_timeout),
            engine,
            settings,
            gate,
        }
    }

    /// Decode the editor payload, run `op` through the shared pipeline slot,
    /// and await its outcome.
    pub async fn dispatch(
        &self,
        op: SuggestionOperation,
        raw_content: serde_json::Value,
    ) -> Result<PipelineOutcome, CoordinatorError> {
        let content = decode_content(raw_content)?;

        // Realtime suggestions are a toggleable feature: when disabled, the
        // reply is an immediate "no content" and no pipeline starts.
        if op == SuggestionOperation::Realtime && !self.settings.realtime_enabled() {
            debug!("realtime suggestions disabled — skipping pipeline");
            return Ok(PipelineOutcome::Empty);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.start_pipeline(op, content, Some(reply_tx));

        match reply_rx.await {
            Ok(Ok(Some(updated))) => Ok(PipelineOutcome::Content(updated)),
            Ok(Ok(None)) => Ok(PipelineOutcome::Empty),
            Ok(Err(e)) => Err(e),
            // Sender dropped without a value: the pipeline was superseded (or
            // the daemon is draining). The caller gets nothing.
            Err(_) => Ok(PipelineOutcome::Superseded),
        }
    }

    /// Fire-and-forget pre-warm. Returns as soon as the payload decodes —
    /// the pipeline's result (if it survives long enough to produce one) is
    /// discarded.
    pub async fn prefetch(&self, raw_content: serde_json::Value) -> Result<(), CoordinatorError> {
        let content = decode_content(raw_content)?;
        if !self.settings.realtime_enabled() {
            debug!("realtime suggestions disabled — prefetch skipped");
            return Ok(());
        }
        self.start_pipeline(SuggestionOperation::Prefetch, content, None);
        Ok(())
    }

    /// Flip the realtime-suggestions setting.
    ///
    /// Requires the permission gate; on success, cancels every in-flight
    /// pipeline first (they may be operating under now-stale settings) and
    /// returns the new value. The caller is responsible for notifying the UI.
    pub async fn toggle_realtime(&self) -> Result<bool, CoordinatorError> {
        self.gate.check_setting_change().await?;
        self.slots.cancel_all();
        Ok(self.settings.toggle_realtime())
    }

    /// Cancel all outstanding pipelines and wait (bounded) for them to
    /// acknowledge. After this returns, no previously dispatched pipeline
    /// will deliver a reply, and new dispatches are suppressed.
    pub async fn prepare_for_exit(&self) {
        self.slots.drain().await;
    }

    fn start_pipeline(
        &self,
        op: SuggestionOperation,
        content: EditorContent,
        reply: Option<oneshot::Sender<Result<Option<UpdatedContent>, CoordinatorError>>>,
    ) {
        let engine = self.engine.clone();
        self.slots.start(SUGGESTION_SLOT, move |token| async move {
            let result = engine.run_operation(&op, &content, &token).await;

            // Checkpoint after the engine await: once cancelled, the result
            // is stale and must never reach the caller.
            if token.is_cancelled() {
                debug!(op = op.name(), "pipeline superseded — result discarded");
                return;
            }
            if let Err(e) = &result {
                warn!(op = op.name(), file = %content.file_path, err = %e, "suggestion pipeline failed");
            }
            if let Some(tx) = reply {
                let _ = tx.send(result);
            }
        });
    }
}

fn decode_content(raw: serde_json::Value) -> Result<EditorContent, CoordinatorError> {
    serde_json::from_value(raw).map_err(|e| CoordinatorError::Decode(e.to_string()))
}
