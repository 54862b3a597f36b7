// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! koand — the agent loop daemon.
//!
//! Owns the filesystem-based mission queue for a set of projects and drives
//! a worker LLM CLI against it, per `spec.md` §4.G. Typically started by an
//! operator's process supervisor (systemd, tmux, launchd); it is not meant
//! to be attached to interactively beyond Ctrl-C.

use koan_core::Config;
use koan_engine::SignalState;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("koand {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            "--help" | "-h" | "help" => {
                println!("koand {}", env!("CARGO_PKG_VERSION"));
                println!("Background agent loop that works a koan instance's mission queue.");
                println!();
                println!("USAGE:");
                println!("    koand");
                println!();
                println!("ENVIRONMENT:");
                println!("    KOAN_ROOT              root directory holding signal files and projects (required)");
                println!("    KOAN_INSTANCE_DIR      default: $KOAN_ROOT/instance");
                println!("    KOAN_PROJECTS          comma-separated name or name=path entries");
                println!("    KOAN_WORKER_BIN        worker CLI binary, default: claude");
                println!("    KOAN_MAX_RUNS          optional run ceiling before a daily pause");
                println!("    KOAN_GIT_SYNC_INTERVAL runs between project git syncs, default: 10");
                println!("    KOAN_LOG_DIR           default: $KOAN_ROOT/logs");
                println!("    KOAN_LOG_LEVEL         default: info");
                return;
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: koand [--help | --version]");
                std::process::exit(koand::exit_code::MISCONFIGURED);
            }
        }
    }

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("koand: {e}");
            std::process::exit(koand::exit_code::MISCONFIGURED);
        }
    };

    let log_path = config.log_dir.join("koand.log");
    rotate_log_if_needed(&log_path);

    let _log_guard = match setup_logging(&log_path, &config.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("koand: failed to set up logging: {e}");
            std::process::exit(koand::exit_code::MISCONFIGURED);
        }
    };

    info!(root = %config.koan_root.display(), projects = ?config.projects, "starting koan agent loop");

    let signal_state = SignalState::new();
    spawn_interrupt_forwarder(signal_state.clone());

    let result = koand::run_with_crash_recovery(|| koand::build_loop_deps(&config, signal_state.clone())).await;

    match result {
        Ok(()) => {
            info!("koan agent loop stopped");
            std::process::exit(koand::exit_code::CLEAN);
        }
        Err(e) => {
            error!(error = %e, "koan agent loop gave up after repeated crashes");
            std::process::exit(koand::exit_code::MISCONFIGURED);
        }
    }
}

/// Forwards every delivered Ctrl-C to the shared [`SignalState`], so
/// [`koan_engine::WorkerExecutor::run`] can race a protected phase against
/// it. Runs for the whole process lifetime; `ctrl_c()` itself registers a
/// fresh handler each time it resolves, so repeated taps are each delivered.
fn spawn_interrupt_forwarder(signal_state: SignalState) {
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            signal_state.notify_interrupt();
        }
    });
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
/// Number of rotated log files to keep (koand.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`]. Best-effort:
/// rotation failures are silently ignored so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    log_path: &std::path::Path,
    log_level: &str,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = log_path.parent().unwrap_or_else(|| std::path::Path::new("."));
    std::fs::create_dir_all(dir)?;
    let file_name = log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("koand.log"));
    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
