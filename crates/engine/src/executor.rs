// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The subprocess executor: spawns the worker CLI under double-tap
//! interrupt protection.
//!
//! `SignalState` is a single `Arc`-shared, mutex-guarded struct the
//! process's interrupt handler closes over, holding the current
//! protected-phase name and the timestamp of a first, unanswered interrupt.
//! `ProtectedPhase` is an RAII guard: entering sets the phase and restores
//! the previous one on drop, even if the body errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use koan_adapters::worker::{kill, terminate};
use koan_adapters::{WorkerCli, WorkerCommand, WorkerError, WorkerOutcome};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;

/// Window within which a second interrupt escalates to termination.
pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_secs(10);
/// Grace period after `SIGTERM` before escalating to `SIGKILL`.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("worker task panicked: {0}")]
    JoinFailed(String),

    #[error("interrupted by double-tap ctrl-c")]
    Interrupted,
}

/// What a delivered interrupt should do, decided by [`SignalState::register_interrupt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptTap {
    /// Outside any protected phase: propagate immediately.
    Immediate,
    /// First tap inside a protected phase: warn and continue waiting.
    First,
    /// Second tap within [`DOUBLE_TAP_WINDOW`]: escalate to termination.
    Second,
}

struct Inner {
    phase: Option<String>,
    task_running: bool,
    first_tap_at: Option<Instant>,
}

/// Process-global signal state, shared via `Arc` and closed over by the
/// process's interrupt handler task.
#[derive(Clone)]
pub struct SignalState {
    inner: Arc<Mutex<Inner>>,
    interrupt_notify: Arc<Notify>,
}

impl Default for SignalState {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                phase: None,
                task_running: false,
                first_tap_at: None,
            })),
            interrupt_notify: Arc::new(Notify::new()),
        }
    }
}

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_phase(&self) -> Option<String> {
        self.inner.lock().phase.clone()
    }

    pub fn task_running(&self) -> bool {
        self.inner.lock().task_running
    }

    /// Enter a protected phase, returning a guard whose `Drop` restores the
    /// previous phase and running flag.
    pub fn enter_phase(&self, name: impl Into<String>) -> ProtectedPhase {
        let previous = {
            let mut inner = self.inner.lock();
            let previous = inner.phase.take();
            inner.phase = Some(name.into());
            inner.task_running = true;
            previous
        };
        ProtectedPhase {
            state: self.clone(),
            previous,
        }
    }

    /// Decide what a freshly delivered interrupt should do and update the
    /// first-tap bookkeeping accordingly. Called by the process's interrupt
    /// handler, not by the executor directly.
    pub fn register_interrupt(&self, now: Instant) -> InterruptTap {
        let mut inner = self.inner.lock();
        if inner.phase.is_none() {
            return InterruptTap::Immediate;
        }
        match inner.first_tap_at {
            Some(first) if now.duration_since(first) <= DOUBLE_TAP_WINDOW => {
                inner.first_tap_at = None;
                InterruptTap::Second
            }
            _ => {
                inner.first_tap_at = Some(now);
                InterruptTap::First
            }
        }
    }

    /// Wake anything awaiting [`SignalState::interrupted`]. Called by the
    /// process's `tokio::signal::ctrl_c` loop on every delivered interrupt.
    pub fn notify_interrupt(&self) {
        self.interrupt_notify.notify_one();
    }

    /// Future that resolves the next time [`SignalState::notify_interrupt`]
    /// is called. Used by [`WorkerExecutor::run`] to race the worker's exit
    /// against an incoming interrupt.
    pub async fn interrupted(&self) {
        self.interrupt_notify.notified().await;
    }
}

/// RAII guard for a protected phase. Restores the previous phase (and
/// `task_running` only if there was no previous phase, i.e. this was the
/// outermost scope) on drop, mirroring the Python context manager's
/// `finally` block.
pub struct ProtectedPhase {
    state: SignalState,
    previous: Option<String>,
}

impl Drop for ProtectedPhase {
    fn drop(&mut self) {
        let mut inner = self.state.inner.lock();
        inner.phase = self.previous.take();
        if inner.phase.is_none() {
            inner.task_running = false;
            inner.first_tap_at = None;
        }
    }
}

/// Spawns the worker CLI and waits for it under double-tap interrupt
/// protection:
///
/// - First interrupt inside the protected phase: warned via `tracing`,
///   waiting continues.
/// - Second interrupt within [`DOUBLE_TAP_WINDOW`]: `SIGTERM` is sent; if
///   the process is still alive after [`TERMINATE_GRACE`], `SIGKILL`
///   follows; either way [`ExecutorError::Interrupted`] is returned once
///   the process has exited.
pub struct WorkerExecutor;

impl WorkerExecutor {
    pub async fn run(
        worker: &dyn WorkerCli,
        cmd: WorkerCommand,
        state: &SignalState,
        phase_name: &str,
    ) -> Result<WorkerOutcome, ExecutorError> {
        let _phase = state.enter_phase(phase_name);
        let handle = worker.spawn(&cmd).await?;
        let pid = handle.pid();
        let mut wait_task = tokio::spawn(handle.wait());

        loop {
            tokio::select! {
                result = &mut wait_task => {
                    return result
                        .map_err(|e| ExecutorError::JoinFailed(e.to_string()))?
                        .map_err(ExecutorError::from);
                }
                _ = state.interrupted() => {
                    match state.register_interrupt(Instant::now()) {
                        InterruptTap::Immediate | InterruptTap::First => {
                            tracing::warn!(phase = phase_name, "interrupt received, tap again within 10s to cancel");
                        }
                        InterruptTap::Second => {
                            tracing::warn!(phase = phase_name, "second interrupt, terminating worker");
                            if let Some(pid) = pid {
                                let _ = terminate(pid);
                            }
                            tokio::select! {
                                result = &mut wait_task => { let _ = result; }
                                _ = tokio::time::sleep(TERMINATE_GRACE) => {
                                    if let Some(pid) = pid {
                                        let _ = kill(pid);
                                    }
                                    let _ = (&mut wait_task).await;
                                }
                            }
                            return Err(ExecutorError::Interrupted);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
