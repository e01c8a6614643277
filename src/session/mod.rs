// SPDX-License-Identifier: MIT
//! Active-session state store.
//!
//! Holds the one active session (workspace path + display name + username)
//! and the per-session conversation-tab registry. This is the session-state
//! collaborator the switcher drives; it broadcasts `session.switched` and
//! `session.tabCreated` notifications so connected clients can follow along.

pub mod restore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ipc::event::EventBroadcaster;

/// Identity of one logical session: the pair that must be non-empty and
/// genuinely new before a switch is issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub workspace_path: PathBuf,
    pub username: String,
}

impl SessionKey {
    pub fn new(workspace_path: impl Into<PathBuf>, username: impl Into<String>) -> Self {
        Self {
            workspace_path: workspace_path.into(),
            username: username.into(),
        }
    }
}

/// One conversation tab inside a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTab {
    pub id: String,
    pub title: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl ConversationTab {
    fn default_tab() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: "New Conversation".to_string(),
            created_at: Utc::now(),
        }
    }
}

/// The session currently driving the UI.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSession {
    pub path: PathBuf,
    pub name: String,
    pub username: String,
}

// ─── Collaborator seam ────────────────────────────────────────────────────────

/// Session-state sink driven by the switcher. Split out as a trait so the
/// reactor/switcher stack is testable against a recording fake.
#[async_trait]
pub trait SessionSink: Send + Sync {
    /// Step 1 of a switch: record the new session and notify clients.
    async fn announce_switch(&self, path: &Path, name: &str, username: &str);

    /// Step 3 of a switch: create the default conversation tab unless the
    /// session already has tabs. Idempotent.
    async fn init_default_tab_if_needed(&self, path: &Path, username: &str);
}

// ─── In-memory store ──────────────────────────────────────────────────────────

pub struct SessionStore {
    active: RwLock<Option<ActiveSession>>,
    tabs: RwLock<HashMap<SessionKey, Vec<ConversationTab>>>,
    broadcaster: Arc<EventBroadcaster>,
    data_dir: PathBuf,
}

impl SessionStore {
    pub fn new(broadcaster: Arc<EventBroadcaster>, data_dir: PathBuf) -> Self {
        Self {
            active: RwLock::new(None),
            tabs: RwLock::new(HashMap::new()),
            broadcaster,
            data_dir,
        }
    }

    /// Snapshot of the active session with its tabs, for `session.current`.
    pub async fn current(&self) -> Option<(ActiveSession, Vec<ConversationTab>)> {
        let active = self.active.read().await.clone()?;
        let key = SessionKey::new(active.path.clone(), active.username.clone());
        let tabs = self.tabs.read().await.get(&key).cloned().unwrap_or_default();
        Some((active, tabs))
    }

    /// Install restored tabs for a session. Called by the restorer before the
    /// default-tab step, so a restored session keeps its own tabs.
    pub async fn install_tabs(&self, key: &SessionKey, restored: Vec<ConversationTab>) {
        if restored.is_empty() {
            return;
        }
        debug!(path = %key.workspace_path.display(), count = restored.len(), "restored conversation tabs");
        self.tabs.write().await.insert(key.clone(), restored);
    }

    /// Best-effort write of the session's tab list to disk so it can be
    /// restored on the next switch. Failures are logged, never surfaced.
    async fn persist_tabs(&self, key: &SessionKey) {
        let tabs = match self.tabs.read().await.get(key) {
            Some(t) => t.clone(),
            None => return,
        };
        if let Err(e) = restore::write_state(&self.data_dir, key, &tabs) {
            warn!(path = %key.workspace_path.display(), err = %e, "failed to persist session tabs");
        }
    }
}

#[async_trait]
impl SessionSink for SessionStore {
    async fn announce_switch(&self, path: &Path, name: &str, username: &str) {
        let session = ActiveSession {
            path: path.to_path_buf(),
            name: name.to_string(),
            username: username.to_string(),
        };
        info!(path = %path.display(), name = %name, user = %username, "session switched");
        *self.active.write().await = Some(session);

        self.broadcaster.broadcast(
            "session.switched",
            serde_json::json!({
                "path": path,
                "name": name,
                "username": username,
            }),
        );
    }

    async fn init_default_tab_if_needed(&self, path: &Path, username: &str) {
        let key = SessionKey::new(path, username);
        let created = {
            let mut tabs = self.tabs.write().await;
            let entry = tabs.entry(key.clone()).or_default();
            if entry.is_empty() {
                let tab = ConversationTab::default_tab();
                entry.push(tab.clone());
                Some(tab)
            } else {
                None
            }
        };

        // Broadcast and persist outside the write lock.
        if let Some(tab) = created {
            debug!(path = %path.display(), tab = %tab.id, "created default conversation tab");
            self.broadcaster.broadcast(
                "session.tabCreated",
                serde_json::json!({
                    "tabId": tab.id,
                    "title": tab.title,
                    "path": path,
                    "username": username,
                }),
            );
            self.persist_tabs(&key).await;
        }
    }
}
