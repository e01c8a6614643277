// SPDX-License-Identifier: MIT
//! Completion engine seam.
//!
//! The coordinator never generates suggestions itself — it forwards the
//! operation and editor snapshot to whatever engine is wired in. The engine
//! runs under the pipeline's cancellation token and should abandon work early
//! when it can, though the pipeline re-checks the token after the call either
//! way.

pub mod remote;

use crate::error::CoordinatorError;
use crate::suggestion::model::{EditorContent, SuggestionOperation, UpdatedContent};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait SuggestionEngine: Send + Sync {
    /// Run one suggestion operation. `Ok(None)` means "no suggestion
    /// available" — a normal outcome, not an error.
    async fn run_operation(
        &self,
        op: &SuggestionOperation,
        content: &EditorContent,
        cancel: &CancellationToken,
    ) -> Result<Option<UpdatedContent>, CoordinatorError>;
}

/// Engine used when no upstream is configured: every operation yields no
/// suggestion. Keeps the daemon fully functional (and the editor silent)
/// without a provider.
pub struct NullEngine;

#[async_trait]
impl SuggestionEngine for NullEngine {
    async fn run_operation(
        &self,
        _op: &SuggestionOperation,
        _content: &EditorContent,
        _cancel: &CancellationToken,
    ) -> Result<Option<UpdatedContent>, CoordinatorError> {
        Ok(None)
    }
}
