// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `koan-bridge` — the messaging bridge poller.
//!
//! Long-polls the chat API, classifies each inbound message, dispatches it
//! (command / mission / chat), and flushes the outbox of asynchronous
//! messages the agent loop produces. See `spec.md` §4.H.

use std::sync::Arc;

use koan_adapters::chat::HttpChatTransport;
use koan_adapters::worker::ProcessWorkerCli;
use koan_core::clock::{Clock, SystemClock};
use koan_core::Config;
use koan_engine::BridgePoller;
use koan_storage::missions::MissionsFile;
use koan_storage::{outbox, signals, UsageState};
use koan_bridge::{handle_update, startup, write_heartbeat, BridgeDeps, ChatWorker};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("koan-bridge {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            "--help" | "-h" | "help" => {
                println!("koan-bridge {}", env!("CARGO_PKG_VERSION"));
                println!("Polls the chat API and dispatches commands/missions/chat into a koan instance.");
                println!();
                println!("ENVIRONMENT:");
                println!("    KOAN_ROOT              root directory holding signal files and projects (required)");
                println!("    KOAN_INSTANCE_DIR      default: $KOAN_ROOT/instance");
                println!("    KOAN_TELEGRAM_TOKEN    chat API bot token (required)");
                println!("    KOAN_TELEGRAM_CHAT_ID  operator chat id to accept messages from (required)");
                println!("    KOAN_BRIDGE_INTERVAL   poll interval in seconds, default: 3");
                println!("    KOAN_CHAT_TIMEOUT      chat worker-CLI timeout in seconds, default: 180");
                println!("    KOAN_WORKER_BIN        worker CLI binary, default: claude");
                println!("    KOAN_LOG_DIR           default: $KOAN_ROOT/logs");
                println!("    KOAN_LOG_LEVEL         default: info");
                return;
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: koan-bridge [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("koan-bridge: {e}");
            std::process::exit(1);
        }
    };
    let bridge_config = match koan_core::config::BridgeConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("koan-bridge: {e}");
            std::process::exit(1);
        }
    };

    let _log_guard = match setup_logging(&config.log_dir, &config.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("koan-bridge: failed to set up logging: {e}");
            std::process::exit(1);
        }
    };

    info!(
        root = %config.koan_root.display(),
        chat_id = %bridge_config.telegram_chat_id,
        token = %bridge_config.token_fingerprint(),
        "starting koan bridge"
    );

    let _pid_lock = match signals::acquire_pidfile(&config.koan_root, "bridge") {
        Ok(lock) => lock,
        Err(e) => {
            eprintln!("koan-bridge: {e}");
            std::process::exit(1);
        }
    };

    let configured_chat_id: i64 = match bridge_config.telegram_chat_id.parse() {
        Ok(id) => id,
        Err(_) => {
            eprintln!("koan-bridge: KOAN_TELEGRAM_CHAT_ID must be an integer");
            std::process::exit(1);
        }
    };

    let deps = BridgeDeps {
        root: config.koan_root.clone(),
        instance_dir: config.instance_dir.clone(),
        projects: config.projects.clone(),
        project_paths: config.project_paths.clone(),
        configured_chat_id,
        worker_bin: config.worker_bin.clone(),
        chat_timeout: bridge_config.chat_timeout,
    };

    let now_unix = SystemClock.now_unix();
    if let Err(e) = startup(&deps, now_unix) {
        error!(error = %e, "bridge startup housekeeping failed");
    }

    let transport = match HttpChatTransport::new(
        bridge_config.telegram_token.clone(),
        bridge_config.telegram_chat_id.clone(),
    ) {
        Ok(t) => Arc::new(t),
        Err(e) => {
            eprintln!("koan-bridge: failed to build chat transport: {e}");
            std::process::exit(1);
        }
    };

    let poller = BridgePoller::new(transport, deps.instance_dir.clone(), bridge_config.poll_interval);
    let chat_worker = ChatWorker::new(Arc::new(ProcessWorkerCli));
    let missions_path = deps.instance_dir.join("missions.md");

    loop {
        let run_pid_alive = signals::check_pidfile(&deps.root, "run").is_some();
        let tick_now = SystemClock.now_unix();

        let tick_result = poller
            .tick(|classification, text, chat_id| {
                let mut missions = match MissionsFile::from_path(&missions_path) {
                    Ok(m) => m,
                    Err(e) => {
                        error!(error = %e, "failed to load missions file");
                        return;
                    }
                };
                let usage = UsageState::load(&deps.instance_dir).unwrap_or_default();

                match handle_update(
                    &deps,
                    &chat_worker,
                    &mut missions,
                    &usage,
                    tick_now,
                    run_pid_alive,
                    true,
                    classification,
                    text,
                    chat_id,
                ) {
                    Ok(Some(reply)) => {
                        if let Err(e) = outbox::append(&deps.instance_dir, &reply) {
                            error!(error = %e, "failed to queue reply in outbox");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "failed to handle update"),
                }
            })
            .await;

        if let Err(e) = tick_result {
            warn!(error = %e, "poll tick failed, retrying next interval");
        }

        if let Err(e) = write_heartbeat(&deps, tick_now) {
            warn!(error = %e, "failed to write heartbeat");
        }

        tokio::time::sleep(poller.poll_interval()).await;
    }
}

fn setup_logging(
    log_dir: &std::path::Path,
    log_level: &str,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::never(log_dir, "koan-bridge.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
