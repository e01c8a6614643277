// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

const DEFAULT_PORT: u16 = 4350;
const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 2000;
const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 30;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── SuggestionConfig ─────────────────────────────────────────────────────────

/// Suggestion pipeline configuration (`[suggestion]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SuggestionConfig {
    /// Initial value of the realtime-suggestions setting when no
    /// settings.json exists yet. Default: true.
    pub realtime_default: bool,
    /// Permitted `suggestion.custom` command ids. Empty = accept any.
    pub custom_commands: Vec<String>,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            realtime_default: true,
            custom_commands: vec![],
        }
    }
}

// ─── EngineConfig ─────────────────────────────────────────────────────────────

/// Completion engine upstream (`[engine]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// HTTP endpoint of the completion service. None = no upstream wired;
    /// every operation yields "no suggestion".
    pub url: Option<String>,
    /// Per-request timeout for the upstream call (seconds). Default: 30.
    /// The coordinator itself imposes no timeout — a hung call holds its
    /// slot until superseded or exit.
    pub request_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: None,
            request_timeout_secs: DEFAULT_ENGINE_TIMEOUT_SECS,
        }
    }
}

// ─── SecurityConfig ───────────────────────────────────────────────────────────

/// Daemon security configuration (`[security]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Whether settings.toggleRealtime is permitted. Hot-reloadable, so
    /// lockdown deployments can flip it without a restart. Default: true.
    pub allow_setting_changes: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allow_setting_changes: true,
        }
    }
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// WebSocket server port (default: 4350).
    port: Option<u16>,
    /// Log level filter string, e.g. "debug", "info,hintd=trace" (default: "info").
    log: Option<String>,
    /// Bind address for the WebSocket server (default: "127.0.0.1").
    bind_address: Option<String>,
    /// Log output format: "pretty" (default, human-readable) | "json".
    log_format: Option<String>,
    /// Bounded wait for in-flight pipelines to acknowledge cancellation on
    /// exit (milliseconds). Default: 2000.
    drain_timeout_ms: Option<u64>,
    /// Suggestion pipeline configuration (`[suggestion]`).
    suggestion: Option<SuggestionConfig>,
    /// Completion engine upstream (`[engine]`).
    engine: Option<EngineConfig>,
    /// Security configuration (`[security]`).
    security: Option<SecurityConfig>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── DaemonConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub log: String,
    /// Bind address for the WebSocket server (HINTD_BIND env var).
    pub bind_address: String,
    /// Log output format: "pretty" (default) | "json".
    pub log_format: String,
    /// Exit-drain bound in milliseconds.
    pub drain_timeout_ms: u64,
    /// Suggestion pipeline: realtime default, permitted custom commands.
    pub suggestion: SuggestionConfig,
    /// Completion engine upstream.
    pub engine: EngineConfig,
    /// Security: settings-change permission.
    pub security: SecurityConfig,
}

impl DaemonConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let bind_address = bind_address
            .or(std::env::var("HINTD_BIND").ok().filter(|s| !s.is_empty()))
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let log_format = std::env::var("HINTD_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let drain_timeout_ms = toml.drain_timeout_ms.unwrap_or(DEFAULT_DRAIN_TIMEOUT_MS);

        let suggestion = toml.suggestion.unwrap_or_default();
        let security = toml.security.unwrap_or_default();

        let mut engine = toml.engine.unwrap_or_default();
        if let Ok(url) = std::env::var("HINTD_ENGINE_URL") {
            if !url.is_empty() {
                engine.url = Some(url);
            }
        }

        Self {
            port,
            data_dir,
            log,
            bind_address,
            log_format,
            drain_timeout_ms,
            suggestion,
            engine,
            security,
        }
    }
}

// ─── Hot-reloadable config subset ─────────────────────────────────────────────

/// Non-critical config fields that can be changed without restarting the daemon.
#[derive(Debug, Clone)]
pub struct HotConfig {
    pub log_level: String,
    pub allow_setting_changes: bool,
}

/// Watches `config.toml` for changes and reloads non-critical fields.
///
/// Uses the `notify` crate (kqueue on macOS, inotify on Linux) to detect file
/// modifications. Only the log-level display and
/// `security.allow_setting_changes` are reloaded; port, bind address, and the
/// engine URL require a full restart.
pub struct ConfigWatcher {
    pub hot: Arc<RwLock<HotConfig>>,
    // Hold the watcher alive; dropping it stops the file watch.
    _watcher: notify_debouncer_full::Debouncer<
        notify_debouncer_full::notify::RecommendedWatcher,
        notify_debouncer_full::FileIdMap,
    >,
}

impl ConfigWatcher {
    /// Start watching `{data_dir}/config.toml` for changes.
    ///
    /// Returns `None` if the watcher could not be created (non-fatal; the
    /// daemon runs fine without hot-reload).
    pub fn start(data_dir: &Path) -> Option<Self> {
        let config_path = data_dir.join("config.toml");
        let initial = load_hot_config(&config_path);
        let hot = Arc::new(RwLock::new(initial));

        let hot_clone = hot.clone();
        let config_path_clone = config_path.clone();
        let rt_handle = tokio::runtime::Handle::current();

        let watcher = notify_debouncer_full::new_debouncer(
            std::time::Duration::from_secs(2),
            None,
            move |result: notify_debouncer_full::DebounceEventResult| {
                if let Ok(events) = result {
                    // Only act on modify/create events
                    let relevant = events.iter().any(|e| {
                        use notify_debouncer_full::notify::EventKind;
                        matches!(e.event.kind, EventKind::Modify(_) | EventKind::Create(_))
                    });
                    if relevant {
                        let hot = hot_clone.clone();
                        let path = config_path_clone.clone();
                        rt_handle.spawn(async move {
                            let new_config = load_hot_config(&path);
                            let mut guard = hot.write().await;
                            if guard.log_level != new_config.log_level
                                || guard.allow_setting_changes != new_config.allow_setting_changes
                            {
                                info!(
                                    log_level = %new_config.log_level,
                                    allow_setting_changes = new_config.allow_setting_changes,
                                    "config.toml reloaded"
                                );
                                *guard = new_config;
                            }
                        });
                    }
                }
            },
        );

        match watcher {
            Ok(mut debouncer) => {
                use notify_debouncer_full::notify::Watcher as _;
                // Watch the data_dir (parent of config.toml) since watching a
                // non-existent file fails on some platforms.
                let watch_path = config_path.parent().unwrap_or_else(|| Path::new("."));
                if let Err(e) = debouncer.watcher().watch(
                    watch_path,
                    notify_debouncer_full::notify::RecursiveMode::NonRecursive,
                ) {
                    warn!("config watcher failed to start: {e} — hot-reload disabled");
                    return None;
                }
                info!(path = %config_path.display(), "config hot-reload watcher started");
                Some(Self {
                    hot,
                    _watcher: debouncer,
                })
            }
            Err(e) => {
                warn!("config watcher creation failed: {e} — hot-reload disabled");
                None
            }
        }
    }
}

/// Load only the hot-reloadable fields from config.toml.
fn load_hot_config(path: &Path) -> HotConfig {
    let toml = std::fs::read_to_string(path)
        .ok()
        .and_then(|s| toml::from_str::<TomlConfig>(&s).ok())
        .unwrap_or_default();
    HotConfig {
        log_level: toml.log.unwrap_or_else(|| "info".to_string()),
        allow_setting_changes: toml
            .security
            .map(|s| s.allow_setting_changes)
            .unwrap_or(true),
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/hintd
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("hintd");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/hintd or ~/.local/share/hintd
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("hintd");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("hintd");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\hintd
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("hintd");
        }
    }
    // Fallback
    PathBuf::from(".hintd")
}
