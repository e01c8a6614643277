// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::{Parser, Subcommand};
use hintd::cli::client::{read_auth_token, DaemonClient};
use hintd::{
    auth,
    config::{ConfigWatcher, DaemonConfig, HotConfig},
    engine::{remote::RemoteEngine, NullEngine, SuggestionEngine},
    ipc,
    ipc::handlers::extension::UnhandledPassthrough,
    AppContext,
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "hintd",
    about = "Hint Host — local suggestion coordination daemon",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// JSON-RPC WebSocket server port
    #[arg(long, env = "HINTD_PORT")]
    port: Option<u16>,

    /// Data directory for settings, auth token, and persisted session state
    #[arg(long, env = "HINTD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "HINTD_LOG")]
    log: Option<String>,

    /// Bind address for the WebSocket server (default: 127.0.0.1)
    #[arg(long, env = "HINTD_BIND")]
    bind_address: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "HINTD_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,

    /// Suppress progress and informational output.
    ///
    /// Errors are still printed to stderr. JSON output (--json) is unaffected.
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon server (default when no subcommand given).
    ///
    /// Examples:
    ///   hintd serve
    ///   hintd
    Serve,
    /// Query a running daemon and print its status.
    ///
    /// Examples:
    ///   hintd status
    ///   hintd status --json
    Status {
        /// Print the raw JSON result.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match &args.command {
        Some(Command::Status { json }) => {
            run_status(args.port, args.data_dir.clone(), *json, args.quiet).await?;
        }
        None | Some(Command::Serve) => {
            run_server(args.port, args.data_dir, args.log, args.bind_address, args.log_file).await?;
        }
    }

    Ok(())
}

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to both stdout and a daily-rolling file.
/// Returns a `WorkerGuard` that must stay alive for the process lifetime.
///
/// `log_format` may be `"pretty"` (default, human-readable compact format) or
/// `"json"` (structured JSON for log aggregators).
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("hintd.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}

async fn run_server(
    port: Option<u16>,
    data_dir: Option<std::path::PathBuf>,
    log: Option<String>,
    bind_address: Option<String>,
    log_file: Option<std::path::PathBuf>,
) -> Result<()> {
    let config = Arc::new(DaemonConfig::new(port, data_dir, log, bind_address));

    let _log_guard = setup_logging(&config.log, log_file.as_deref(), &config.log_format);
    info!(version = env!("CARGO_PKG_VERSION"), "hintd starting");
    info!(
        data_dir = %config.data_dir.display(),
        port = config.port,
        engine = config.engine.url.as_deref().unwrap_or("(none)"),
        "config loaded"
    );

    let auth_token = match auth::get_or_create_token(&config.data_dir) {
        Ok(t) => t,
        Err(e) => {
            warn!(err = %e, "could not create auth token — running without connection auth");
            String::new()
        }
    };

    // Hot-reloadable subset: log level display + settings-change permission.
    // Must outlive the server — dropping the watcher stops the file watch.
    let watcher = ConfigWatcher::start(&config.data_dir);
    let hot = match &watcher {
        Some(w) => w.hot.clone(),
        None => Arc::new(tokio::sync::RwLock::new(HotConfig {
            log_level: config.log.clone(),
            allow_setting_changes: config.security.allow_setting_changes,
        })),
    };

    let engine: Arc<dyn SuggestionEngine> = match &config.engine.url {
        Some(url) => {
            info!(url = %url, "using remote completion engine");
            Arc::new(RemoteEngine::new(url.clone(), &config.engine)?)
        }
        None => {
            warn!("no [engine] url configured — suggestions will always be empty");
            Arc::new(NullEngine)
        }
    };

    let ctx = AppContext::new(
        config,
        engine,
        Arc::new(UnhandledPassthrough),
        hot,
        auth_token,
    );

    let reactor = ctx.spawn_reactor();

    ipc::run(ctx.clone()).await?;

    // The reactor watches the same shutdown token the server does.
    ctx.shutdown.cancel();
    let _ = reactor.await;
    Ok(())
}

async fn run_status(
    port: Option<u16>,
    data_dir: Option<std::path::PathBuf>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let config = DaemonConfig::new(port, data_dir, None, None);
    let token = read_auth_token(&config.data_dir)?;
    let client = DaemonClient::new(config.port, token);

    let status = client.call_once("daemon.status", serde_json::json!({})).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    if !quiet {
        println!("hintd {}", status["version"].as_str().unwrap_or("?"));
        println!("  port:     {}", status["port"]);
        println!("  uptime:   {}s", status["uptimeSecs"]);
        println!("  realtime: {}", status["realtimeSuggestions"]);
        match status.get("activeSession").filter(|s| !s.is_null()) {
            Some(s) => println!(
                "  session:  {} ({}) as {}",
                s["name"].as_str().unwrap_or("?"),
                s["path"].as_str().unwrap_or("?"),
                s["username"].as_str().unwrap_or("?"),
            ),
            None => println!("  session:  (none)"),
        }
    }
    Ok(())
}
