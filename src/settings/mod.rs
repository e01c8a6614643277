// SPDX-License-Identifier: MIT
//! Persisted daemon settings and the permission gate for changing them.
//!
//! Settings live in `{data_dir}/settings.json` and survive restarts. Writes
//! go through a temp file + rename so a crash mid-write never truncates the
//! file.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::HotConfig;
use crate::error::CoordinatorError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct PersistedSettings {
    /// Whether realtime (as-you-type) suggestions are enabled.
    realtime_suggestions: bool,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            realtime_suggestions: true,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    state: Mutex<PersistedSettings>,
}

impl SettingsStore {
    /// Load settings from `{data_dir}/settings.json`, falling back to
    /// `realtime_default` when the file is absent or unreadable.
    pub fn load(data_dir: &Path, realtime_default: bool) -> Self {
        let path = data_dir.join("settings.json");
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<PersistedSettings>(&raw) {
                Ok(s) => s,
                Err(e) => {
                    warn!(path = %path.display(), err = %e, "settings.json unparseable — using defaults");
                    PersistedSettings {
                        realtime_suggestions: realtime_default,
                    }
                }
            },
            Err(_) => PersistedSettings {
                realtime_suggestions: realtime_default,
            },
        };
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    pub fn realtime_enabled(&self) -> bool {
        self.state.lock().expect("settings poisoned").realtime_suggestions
    }

    /// Flip the realtime-suggestions boolean, persist, and return the new
    /// value. The in-memory flip sticks even if the write fails (logged) —
    /// the next successful persist catches it up.
    pub fn toggle_realtime(&self) -> bool {
        let snapshot = {
            let mut state = self.state.lock().expect("settings poisoned");
            state.realtime_suggestions = !state.realtime_suggestions;
            state.clone()
        };
        if let Err(e) = self.persist(&snapshot) {
            warn!(err = %e, "failed to persist settings.json");
        }
        info!(realtime = snapshot.realtime_suggestions, "realtime suggestions toggled");
        snapshot.realtime_suggestions
    }

    fn persist(&self, state: &PersistedSettings) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let tmp = tempfile::NamedTempFile::new_in(dir).context("create temp settings file")?;
        serde_json::to_writer_pretty(&tmp, state).context("serialize settings")?;
        tmp.persist(&self.path).context("replace settings.json")?;
        Ok(())
    }
}

// ─── Permission gate ──────────────────────────────────────────────────────────

/// Precondition for settings changes. Checked before any state is touched —
/// a denial yields `CoordinatorError::PermissionDenied` and no change.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn check_setting_change(&self) -> Result<(), CoordinatorError>;
}

/// Production gate backed by the hot-reloadable `security.allow_setting_changes`
/// config flag, so lockdown deployments can revoke the permission without a
/// restart.
pub struct ConfigGate {
    hot: Arc<RwLock<HotConfig>>,
}

impl ConfigGate {
    pub fn new(hot: Arc<RwLock<HotConfig>>) -> Self {
        Self { hot }
    }
}

#[async_trait]
impl PermissionGate for ConfigGate {
    async fn check_setting_change(&self) -> Result<(), CoordinatorError> {
        if self.hot.read().await.allow_setting_changes {
            Ok(())
        } else {
            Err(CoordinatorError::PermissionDenied)
        }
    }
}
