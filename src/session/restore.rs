// SPDX-License-Identifier: MIT
//! Persisted session-state restore.
//!
//! Each session's tab list lives in `{data_dir}/sessions/{sha256(key)}.json`.
//! Restore failures are never fatal: the switcher logs them and the switch
//! proceeds with a fresh default tab.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::{ConversationTab, SessionKey, SessionStore};
use crate::error::CoordinatorError;

/// Collaborator seam: restore whatever was persisted for `key`, if anything.
#[async_trait]
pub trait StateRestorer: Send + Sync {
    async fn restore(&self, key: &SessionKey) -> Result<(), CoordinatorError>;
}

/// File name for a session's persisted state: hex SHA-256 over path + NUL +
/// username, so arbitrary workspace paths map to a flat directory.
pub fn state_file(data_dir: &Path, key: &SessionKey) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(key.workspace_path.to_string_lossy().as_bytes());
    hasher.update([0u8]);
    hasher.update(key.username.as_bytes());
    let digest = hex::encode(hasher.finalize());
    data_dir.join("sessions").join(format!("{digest}.json"))
}

/// Write a session's tab list. Used by the store when tabs change.
pub fn write_state(
    data_dir: &Path,
    key: &SessionKey,
    tabs: &[ConversationTab],
) -> anyhow::Result<()> {
    let path = state_file(data_dir, key);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(tabs)?;
    std::fs::write(&path, json)?;
    Ok(())
}

/// Reads persisted tab lists from disk and installs them into the store.
pub struct DiskRestorer {
    data_dir: PathBuf,
    store: Arc<SessionStore>,
}

impl DiskRestorer {
    pub fn new(data_dir: PathBuf, store: Arc<SessionStore>) -> Self {
        Self { data_dir, store }
    }
}

#[async_trait]
impl StateRestorer for DiskRestorer {
    async fn restore(&self, key: &SessionKey) -> Result<(), CoordinatorError> {
        let path = state_file(&self.data_dir, key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Nothing persisted yet — a no-op restore, not a failure.
                debug!(path = %key.workspace_path.display(), "no persisted state for session");
                return Ok(());
            }
            Err(e) => return Err(CoordinatorError::Restore(format!("read {}: {e}", path.display()))),
        };

        let tabs: Vec<ConversationTab> = serde_json::from_str(&raw)
            .map_err(|e| CoordinatorError::Restore(format!("parse {}: {e}", path.display())))?;

        self.store.install_tabs(key, tabs).await;
        Ok(())
    }
}
