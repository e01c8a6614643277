// SPDX-License-Identifier: MIT
//! The two input feeds the reactor combines.
//!
//! Each feed is a `tokio::sync::watch` cell holding the latest value.
//! Consecutive equal updates are dropped at the producer side, and bursts of
//! intermediate values coalesce to the newest one — exactly the
//! combine-latest semantics the reactor needs.

use serde::Deserialize;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::debug;

/// Authentication phase reported by the companion app / editor extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthPhase {
    LoggedIn,
    NotSignedIn,
    NotAuthorized,
    Unknown,
}

/// Latest known authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStatus {
    pub phase: AuthPhase,
    pub username: Option<String>,
}

impl AuthStatus {
    pub fn unknown() -> Self {
        Self {
            phase: AuthPhase::Unknown,
            username: None,
        }
    }
}

/// Owner of the two signal cells. Producers are the `workspace.didChangeActive`
/// and `auth.statusChanged` RPC handlers; the sole consumer is the reactor.
pub struct SignalHub {
    workspace: watch::Sender<Option<PathBuf>>,
    auth: watch::Sender<AuthStatus>,
}

impl Default for SignalHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHub {
    pub fn new() -> Self {
        let (workspace, _) = watch::channel(None);
        let (auth, _) = watch::channel(AuthStatus::unknown());
        Self { workspace, auth }
    }

    /// Update the active-workspace cell. A repeat of the current value is
    /// dropped and wakes nobody.
    pub fn set_active_workspace(&self, path: Option<PathBuf>) {
        self.workspace.send_if_modified(|current| {
            if *current == path {
                false
            } else {
                debug!(path = ?path, "active workspace changed");
                *current = path;
                true
            }
        });
    }

    /// Update the auth-status cell, deduplicated like the workspace cell.
    pub fn set_auth_status(&self, status: AuthStatus) {
        self.auth.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                debug!(phase = ?status.phase, user = ?status.username, "auth status changed");
                *current = status;
                true
            }
        });
    }

    pub fn subscribe_workspace(&self) -> watch::Receiver<Option<PathBuf>> {
        self.workspace.subscribe()
    }

    pub fn subscribe_auth(&self) -> watch::Receiver<AuthStatus> {
        self.auth.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_workspace_values_do_not_wake_subscribers() {
        let hub = SignalHub::new();
        let mut rx = hub.subscribe_workspace();

        hub.set_active_workspace(Some(PathBuf::from("/w/a")));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        hub.set_active_workspace(Some(PathBuf::from("/w/a")));
        assert!(!rx.has_changed().unwrap());

        hub.set_active_workspace(Some(PathBuf::from("/w/b")));
        assert!(rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn duplicate_auth_values_do_not_wake_subscribers() {
        let hub = SignalHub::new();
        let mut rx = hub.subscribe_auth();

        let status = AuthStatus {
            phase: AuthPhase::LoggedIn,
            username: Some("alice".into()),
        };
        hub.set_auth_status(status.clone());
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        hub.set_auth_status(status);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn bursts_coalesce_to_newest_value() {
        let hub = SignalHub::new();
        let mut rx = hub.subscribe_workspace();

        hub.set_active_workspace(Some(PathBuf::from("/w/a")));
        hub.set_active_workspace(Some(PathBuf::from("/w/b")));
        hub.set_active_workspace(Some(PathBuf::from("/w/c")));

        assert_eq!(
            rx.borrow_and_update().clone(),
            Some(PathBuf::from("/w/c"))
        );
        assert!(!rx.has_changed().unwrap());
    }
}
