// SPDX-License-Identifier: MIT
//! HTTP upstream engine.
//!
//! Posts `{ operation, content }` to the configured engine URL and reads back
//! an optional `UpdatedContent`. This is plumbing to an external completion
//! service, not a completion model — transport and status failures surface as
//! `EngineError` to the caller of the request that triggered them.

use crate::config::EngineConfig;
use crate::error::CoordinatorError;
use crate::suggestion::model::{EditorContent, SuggestionOperation, UpdatedContent};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::SuggestionEngine;

pub struct RemoteEngine {
    client: reqwest::Client,
    url: String,
}

/// Upstream response body. A missing or null `updated` field means the
/// engine had nothing to offer.
#[derive(Deserialize)]
struct EngineResponse {
    #[serde(default)]
    updated: Option<UpdatedContent>,
}

impl RemoteEngine {
    pub fn new(url: String, config: &EngineConfig) -> Result<Self, CoordinatorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| CoordinatorError::Engine(format!("http client: {e}")))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl SuggestionEngine for RemoteEngine {
    async fn run_operation(
        &self,
        op: &SuggestionOperation,
        content: &EditorContent,
        cancel: &CancellationToken,
    ) -> Result<Option<UpdatedContent>, CoordinatorError> {
        let body = json!({
            "operation": op,
            "content": content,
        });

        // Abandon the request as soon as the pipeline is superseded — the
        // result would be discarded anyway.
        let response = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(op = op.name(), "engine call abandoned (cancelled)");
                return Ok(None);
            }
            r = self.client.post(&self.url).json(&body).send() => {
                r.map_err(|e| CoordinatorError::Engine(format!("request failed: {e}")))?
            }
        };

        if !response.status().is_success() {
            return Err(CoordinatorError::Engine(format!(
                "upstream returned {}",
                response.status()
            )));
        }

        let parsed: EngineResponse = tokio::select! {
            _ = cancel.cancelled() => return Ok(None),
            r = response.json() => {
                r.map_err(|e| CoordinatorError::Engine(format!("invalid response body: {e}")))?
            }
        };

        Ok(parsed.updated)
    }
}
