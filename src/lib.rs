// SPDX-License-Identifier: MIT

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod observability;
pub mod session;
pub mod settings;
pub mod suggestion;
pub mod task_slot;
pub mod workspace;

// Re-export auth so main.rs can use hintd::auth directly.
pub use ipc::auth;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use config::{DaemonConfig, HotConfig};
use engine::SuggestionEngine;
use ipc::event::EventBroadcaster;
use ipc::handlers::extension::PassthroughHandler;
use session::restore::DiskRestorer;
use session::{SessionSink, SessionStore};
use settings::{ConfigGate, PermissionGate, SettingsStore};
use suggestion::dispatcher::SuggestionDispatcher;
use workspace::reactor::WorkspaceAuthReactor;
use workspace::signals::SignalHub;
use workspace::switcher::SessionSwitcher;

/// Shared application state passed to every RPC handler and background task.
///
/// Explicitly constructed and dependency-injected — no process-wide
/// singletons. Collaborators (engine, passthrough, permission gate) come in
/// as trait objects so tests can substitute fakes.
pub struct AppContext {
    pub config: Arc<DaemonConfig>,
    pub broadcaster: Arc<EventBroadcaster>,
    pub dispatcher: Arc<SuggestionDispatcher>,
    pub signals: Arc<SignalHub>,
    pub sessions: Arc<SessionStore>,
    pub settings: Arc<SettingsStore>,
    pub passthrough: Arc<dyn PassthroughHandler>,
    pub started_at: std::time::Instant,
    /// Local WebSocket auth token. Every new connection must send a
    /// `daemon.auth` RPC with this token before any other method call.
    /// Empty string means auth is disabled (not recommended).
    pub auth_token: String,
    /// Cancelled on daemon.quit; the IPC server also watches OS signals.
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(
        config: Arc<DaemonConfig>,
        engine: Arc<dyn SuggestionEngine>,
        passthrough: Arc<dyn PassthroughHandler>,
        hot: Arc<RwLock<HotConfig>>,
        auth_token: String,
    ) -> Arc<Self> {
        let broadcaster = Arc::new(EventBroadcaster::new());
        let settings = Arc::new(SettingsStore::load(
            &config.data_dir,
            config.suggestion.realtime_default,
        ));
        let gate: Arc<dyn PermissionGate> = Arc::new(ConfigGate::new(hot));
        let dispatcher = Arc::new(SuggestionDispatcher::new(
            engine,
            settings.clone(),
            gate,
            Duration::from_millis(config.drain_timeout_ms),
        ));
        let sessions = Arc::new(SessionStore::new(
            broadcaster.clone(),
            config.data_dir.clone(),
        ));

        Arc::new(Self {
            config,
            broadcaster,
            dispatcher,
            signals: Arc::new(SignalHub::new()),
            sessions,
            settings,
            passthrough,
            started_at: std::time::Instant::now(),
            auth_token,
            shutdown: CancellationToken::new(),
        })
    }

    /// Wire the session switcher and start the reactor task. The task exits
    /// when the shutdown token fires.
    pub fn spawn_reactor(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let restorer = Arc::new(DiskRestorer::new(
            self.config.data_dir.clone(),
            self.sessions.clone(),
        ));
        let sink: Arc<dyn SessionSink> = self.sessions.clone();
        let switcher = SessionSwitcher::new(sink, restorer);
        WorkspaceAuthReactor::new(&self.signals, switcher).spawn(self.shutdown.clone())
    }
}
