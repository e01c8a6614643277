// SPDX-License-Identifier: MIT
//! Combine-latest reactor over the workspace and auth feeds.
//!
//! All evaluation runs on one dedicated task, so switches are strictly
//! sequential: a candidate arriving while a switch is in progress waits, and
//! bursts coalesce to the newest value through the `watch` cells. The
//! remembered last-switched key is owned by the task and updated only after
//! the switch's side effects have fully applied.

use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::signals::{AuthPhase, AuthStatus, SignalHub};
use super::switcher::SessionSwitcher;
use crate::session::SessionKey;

pub struct WorkspaceAuthReactor {
    switcher: SessionSwitcher,
    workspace_rx: watch::Receiver<Option<PathBuf>>,
    auth_rx: watch::Receiver<AuthStatus>,
    last_switched: Option<SessionKey>,
}

impl WorkspaceAuthReactor {
    pub fn new(hub: &SignalHub, switcher: SessionSwitcher) -> Self {
        Self {
            switcher,
            workspace_rx: hub.subscribe_workspace(),
            auth_rx: hub.subscribe_auth(),
            last_switched: None,
        }
    }

    /// Spawn the reactor task. It exits when `shutdown` fires or the hub is
    /// dropped.
    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                changed = self.workspace_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = self.auth_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            self.evaluate().await;
        }
        debug!("workspace/auth reactor stopped");
    }

    /// Re-evaluate the latest value of both cells.
    async fn evaluate(&mut self) {
        let path = self.workspace_rx.borrow_and_update().clone();
        let auth = self.auth_rx.borrow_and_update().clone();

        let Some(candidate) = gate(path.as_deref(), &auth) else {
            return;
        };

        if self.last_switched.as_ref() == Some(&candidate) {
            debug!(path = %candidate.workspace_path.display(), "session unchanged — switch suppressed");
            return;
        }

        self.switcher.switch(&candidate).await;
        // Only after the side effects are applied — a duplicate trigger
        // racing the switch must not slip past the suppression check.
        self.last_switched = Some(candidate);
    }
}

/// The gating predicate: a switch candidate exists only when the workspace
/// path is a real path (not empty, not root) and the user is logged in with a
/// non-empty username.
fn gate(path: Option<&Path>, auth: &AuthStatus) -> Option<SessionKey> {
    let path = path?;
    let raw = path.to_string_lossy();
    if raw.is_empty() || raw == "/" {
        return None;
    }
    if auth.phase != AuthPhase::LoggedIn {
        return None;
    }
    let username = auth.username.as_deref().filter(|u| !u.is_empty())?;
    Some(SessionKey::new(path, username))
}
