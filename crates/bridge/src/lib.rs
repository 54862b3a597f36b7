// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wiring for `koan-bridge`: the background chat worker, the per-update
//! dispatch table the bridge's main loop drives through
//! [`koan_engine::BridgePoller::tick`], and startup housekeeping (chat
//! history compaction, heartbeat).
//!
//! The agent-loop-facing collaborators (`koan_engine::collaborators`) have
//! no counterpart here — the bridge never runs missions, only enqueues
//! them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use koan_adapters::{WorkerCli, WorkerCommand};
use koan_storage::chat_history::{self, ChatEntry, Role};
use koan_storage::missions::MissionsFile;
use koan_storage::signals::Signals;
use koan_storage::{outbox, UsageState};
use koan_engine::commands::{handle_command, CommandContext};
use koan_engine::{classify, enqueue_mission, Classification};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("missions error: {0}")]
    Missions(#[from] koan_storage::missions::MissionsError),

    #[error("command error: {0}")]
    Command(#[from] koan_engine::commands::CommandError),

    #[error("signal error: {0}")]
    Signal(#[from] koan_storage::signals::SignalError),

    #[error("outbox error: {0}")]
    Outbox(#[from] outbox::OutboxError),

    #[error("chat history error: {0}")]
    ChatHistory(#[from] chat_history::ChatHistoryError),
}

/// Chat history older than this at startup is compacted into one summary
/// line per calendar day — chosen to match the mission dedup ledger's
/// week-scale retention.
pub const CHAT_HISTORY_RETENTION_SECS: i64 = 7 * 24 * 3600;

/// Everything the bridge's dispatch needs besides the transport itself.
pub struct BridgeDeps {
    pub root: PathBuf,
    pub instance_dir: PathBuf,
    pub projects: Vec<String>,
    pub project_paths: HashMap<String, PathBuf>,
    pub configured_chat_id: i64,
    pub worker_bin: String,
    pub chat_timeout: Duration,
}

impl BridgeDeps {
    fn project_cwd(&self, project: &str) -> PathBuf {
        self.project_paths
            .get(project)
            .cloned()
            .unwrap_or_else(|| self.root.join(project))
    }

    fn default_project(&self) -> String {
        self.projects.first().cloned().unwrap_or_else(|| "default".to_string())
    }
}

/// Runs startup housekeeping before the main poll loop begins: compact
/// chat history, refresh the heartbeat.
pub fn startup(deps: &BridgeDeps, now_unix: i64) -> Result<(), BridgeError> {
    std::fs::create_dir_all(&deps.instance_dir).map_err(koan_storage::signals::SignalError::Io)?;
    chat_history::compact_at_startup(&deps.instance_dir, now_unix - CHAT_HISTORY_RETENTION_SECS)?;
    write_heartbeat(deps, now_unix)?;
    Ok(())
}

pub fn write_heartbeat(deps: &BridgeDeps, now_unix: i64) -> Result<(), BridgeError> {
    Signals::new(&deps.root).write_text("bridge-heartbeat", &now_unix.to_string())?;
    Ok(())
}

/// Dispatches one classified update. Messages from a chat id other than the
/// configured one are silently ignored. Returns an immediate reply to hand
/// the outbox, if any — the chat path replies asynchronously instead, once
/// the background worker finishes.
pub fn handle_update(
    deps: &BridgeDeps,
    chat_worker: &ChatWorker<impl WorkerCli>,
    missions: &mut MissionsFile,
    usage: &UsageState,
    now_unix: i64,
    run_pid_alive: bool,
    bridge_pid_alive: bool,
    classification: Classification,
    text: &str,
    chat_id: i64,
) -> Result<Option<String>, BridgeError> {
    if chat_id != deps.configured_chat_id {
        return Ok(None);
    }
    if text.trim().is_empty() {
        return Ok(None);
    }

    let ctx = CommandContext {
        root: &deps.root,
        instance_dir: &deps.instance_dir,
        projects: &deps.projects,
        now_unix,
        run_pid_alive,
        bridge_pid_alive,
    };

    match classification {
        Classification::Command => {
            let outcome = handle_command(&ctx, missions, usage, text)?;
            missions.save(&deps.instance_dir.join("missions.md"))?;
            Ok(Some(outcome.reply))
        }
        Classification::Mission => {
            enqueue_mission(missions, text);
            missions.save(&deps.instance_dir.join("missions.md"))?;
            Ok(Some("mission queued.".to_string()))
        }
        Classification::Chat => {
            chat_history::append(&deps.instance_dir, &ChatEntry { role: Role::User, text: text.to_string(), ts: now_unix })?;
            if chat_worker.try_spawn(deps, text, now_unix) {
                Ok(None)
            } else {
                Ok(Some("still working on the last one, hang tight.".to_string()))
            }
        }
    }
}

/// One chat invocation at a time: if busy, acknowledge and drop. `busy` is
/// a shared atomic rather than a mutex since the worker itself runs
/// detached in a spawned task; the poll loop never awaits it directly.
pub struct ChatWorker<W: WorkerCli> {
    worker: Arc<W>,
    busy: Arc<AtomicBool>,
}

impl<W: WorkerCli + 'static> ChatWorker<W> {
    pub fn new(worker: Arc<W>) -> Self {
        Self { worker, busy: Arc::new(AtomicBool::new(false)) }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Attempts to start a chat invocation. Returns `false` without doing
    /// anything if one is already running.
    pub fn try_spawn(&self, deps: &BridgeDeps, text: &str, now_unix: i64) -> bool {
        if self.busy.swap(true, Ordering::SeqCst) {
            return false;
        }

        let worker = self.worker.clone();
        let busy = self.busy.clone();
        let instance_dir = deps.instance_dir.clone();
        let project_cwd = deps.project_cwd(&deps.default_project());
        let worker_bin = deps.worker_bin.clone();
        let chat_timeout = deps.chat_timeout;
        let text = text.to_string();

        tokio::spawn(async move {
            let reply = run_chat_invocation(worker.as_ref(), &worker_bin, &project_cwd, &instance_dir, &text, chat_timeout).await;
            let _ = chat_history::append(&instance_dir, &ChatEntry { role: Role::Assistant, text: reply.clone(), ts: now_unix });
            let _ = outbox::append(&instance_dir, &reply);
            busy.store(false, Ordering::SeqCst);
        });
        true
    }
}

/// Invokes the worker CLI read-only with the user's chat text, falling back
/// to a "lite" (reduced-context) prompt if the first attempt times out. Has
/// no cancellation of its own — it either completes or exhausts
/// `chat_timeout` on each attempt.
async fn run_chat_invocation(
    worker: &impl WorkerCli,
    worker_bin: &str,
    project_cwd: &std::path::Path,
    instance_dir: &std::path::Path,
    text: &str,
    chat_timeout: Duration,
) -> String {
    let log_dir = instance_dir.join("logs");
    let full = invoke_once(
        worker,
        worker_bin,
        project_cwd,
        &log_dir.join("chat.out"),
        &log_dir.join("chat.err"),
        &["--read-only".to_string(), text.to_string()],
        chat_timeout,
    )
    .await;
    if let Some(reply) = full {
        return reply;
    }

    let lite = invoke_once(
        worker,
        worker_bin,
        project_cwd,
        &log_dir.join("chat-lite.out"),
        &log_dir.join("chat-lite.err"),
        &["--read-only".to_string(), "--lite".to_string(), text.to_string()],
        chat_timeout / 2,
    )
    .await;
    lite.unwrap_or_else(|| "sorry, that took too long — try a shorter question.".to_string())
}

async fn invoke_once(
    worker: &impl WorkerCli,
    worker_bin: &str,
    project_cwd: &std::path::Path,
    stdout_path: &std::path::Path,
    stderr_path: &std::path::Path,
    args: &[String],
    timeout: Duration,
) -> Option<String> {
    let cmd = WorkerCommand {
        binary: worker_bin.to_string(),
        args: args.to_vec(),
        cwd: project_cwd.to_path_buf(),
        stdout_path: stdout_path.to_path_buf(),
        stderr_path: stderr_path.to_path_buf(),
    };
    let handle = worker.spawn(&cmd).await.ok()?;
    let outcome = tokio::time::timeout(timeout, handle.wait()).await.ok()?.ok()?;
    if !outcome.success() {
        return None;
    }
    std::fs::read_to_string(stdout_path).ok().filter(|s| !s.trim().is_empty())
}

/// The message classifier is reused verbatim from `koan-engine`; this
/// re-export just keeps the bridge binary from reaching into the engine
/// crate's module path directly.
pub use koan_engine::Classification as MessageClassification;
pub fn classify_text(text: &str) -> Classification {
    classify(text)
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
