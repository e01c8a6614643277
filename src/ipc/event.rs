// SPDX-License-Identifier: MIT

use serde_json::Value;
use tokio::sync::broadcast;

/// Fans JSON-RPC notification strings out to every connected client.
///
/// Used for the coordinator's side-effect events: `daemon.ready`,
/// `settings.changed`, `session.switched`, `session.tabCreated`.
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<String>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    /// Send a JSON-RPC notification to all connected clients. Having no
    /// subscribers is fine.
    pub fn broadcast(&self, method: &str, params: Value) {
        let notification = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        let _ = self
            .tx
            .send(serde_json::to_string(&notification).unwrap_or_default());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}
