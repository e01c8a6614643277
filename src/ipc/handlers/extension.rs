// SPDX-License-Identifier: MIT
// Generic request passthrough to a pluggable handler.

use crate::error::CoordinatorError;
use crate::AppContext;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// Pluggable sink for `extension.request`. Embedders wire their own handler
/// in; the daemon ships with [`UnhandledPassthrough`].
#[async_trait]
pub trait PassthroughHandler: Send + Sync {
    async fn handle(&self, endpoint: &str, body: Value) -> Result<Value, CoordinatorError>;
}

/// Default passthrough: every endpoint is unhandled.
pub struct UnhandledPassthrough;

#[async_trait]
impl PassthroughHandler for UnhandledPassthrough {
    async fn handle(&self, endpoint: &str, _body: Value) -> Result<Value, CoordinatorError> {
        Err(CoordinatorError::PassthroughUnhandled(endpoint.to_string()))
    }
}

/// `extension.request { endpoint, body }`
pub async fn request(params: Value, ctx: &AppContext) -> Result<Value> {
    #[derive(Deserialize)]
    struct Params {
        endpoint: String,
        #[serde(default)]
        body: Value,
    }
    let p: Params = serde_json::from_value(params)?;
    let body = ctx.passthrough.handle(&p.endpoint, p.body).await?;
    Ok(json!({ "body": body }))
}
