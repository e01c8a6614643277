// SPDX-License-Identifier: MIT
//! Typed error kinds for the suggestion coordinator.
//!
//! These are the errors that cross a component boundary. Everything else
//! travels as `anyhow::Error` through the RPC plumbing and is classified at
//! the boundary (see `ipc::classify_error`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The editor payload could not be decoded. Rejected before any pipeline
    /// is started — the caller gets this reply immediately.
    #[error("invalid editor payload: {0}")]
    Decode(String),

    /// The completion engine failed or returned invalid data. Surfaced to the
    /// caller of the specific request that triggered it, never to a
    /// superseded request.
    #[error("completion engine failed: {0}")]
    Engine(String),

    /// The permission precondition for a settings change was not met.
    /// No state change happened.
    #[error("setting changes are not permitted")]
    PermissionDenied,

    /// No handler is registered for a generic passthrough request.
    #[error("no handler registered for endpoint '{0}'")]
    PassthroughUnhandled(String),

    /// Restoring persisted session state failed. Logged at the switcher
    /// boundary and never fatal — the session counts as switched anyway.
    #[error("failed to restore session state: {0}")]
    Restore(String),
}
