// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker CLI adapter: spawns the configured LLM command-line tool as a
//! child process.
//!
//! The adapter only owns the spawn/wait/kill primitives; the double-tap
//! interrupt discipline and protected-phase bookkeeping live in
//! `koan-engine::executor`. [`WorkerHandle::wait`] consumes the handle by
//! value — it is moved into the task that awaits the child — while
//! [`WorkerHandle::pid`] is read up front so the executor can send a signal
//! from a *different* task without needing mutable access to the handle
//! that's mid-`wait`. This mirrors the real shape: killing a process only
//! needs its pid, never exclusive ownership of the `Child` awaiting it.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::{Child, Command};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("failed to wait on worker: {0}")]
    WaitFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The command the planner/skill-dispatcher built for this mission.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub binary: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub stdout_path: PathBuf,
    pub stderr_path: PathBuf,
}

/// Outcome of a completed worker invocation: its exit code. Nothing in this
/// crate parses stdout/stderr semantically — callers that need the
/// combined output for the quota-exhaustion predicate read the files at
/// `stdout_path`/`stderr_path` directly.
#[derive(Debug, Clone)]
pub struct WorkerOutcome {
    pub exit_code: i32,
}

impl WorkerOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A live child process, returned by [`WorkerCli::spawn`]. `pid` is
/// available immediately; `wait` consumes the handle once the caller is
/// ready to block on it.
#[async_trait]
pub trait WorkerHandle: Send {
    fn pid(&self) -> Option<u32>;
    async fn wait(self: Box<Self>) -> Result<WorkerOutcome, WorkerError>;
}

#[async_trait]
pub trait WorkerCli: Send + Sync + 'static {
    async fn spawn(&self, cmd: &WorkerCommand) -> Result<Box<dyn WorkerHandle>, WorkerError>;
}

/// Send `SIGTERM` to a worker process by pid. Used by the executor on the
/// first escalation of a double-tap interrupt.
pub fn terminate(pid: u32) -> Result<(), WorkerError> {
    #[cfg(unix)]
    {
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), nix::sys::signal::Signal::SIGTERM)
            .map_err(|e| WorkerError::WaitFailed(e.to_string()))
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        Ok(())
    }
}

/// Send `SIGKILL` to a worker process by pid. Used when the process is
/// still alive 5s after `terminate`.
pub fn kill(pid: u32) -> Result<(), WorkerError> {
    #[cfg(unix)]
    {
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), nix::sys::signal::Signal::SIGKILL)
            .map_err(|e| WorkerError::WaitFailed(e.to_string()))
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        Ok(())
    }
}

/// Production adapter: spawns `cmd.binary` with stdin from `/dev/null`,
/// stdout/stderr redirected to truncating file handles, and (on unix) the
/// terminal interrupt signal masked in the child via `pre_exec`, so a single
/// Ctrl-C delivered to the supervisor's terminal does not also reach the
/// worker through the shared process group.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessWorkerCli;

#[async_trait]
impl WorkerCli for ProcessWorkerCli {
    async fn spawn(&self, cmd: &WorkerCommand) -> Result<Box<dyn WorkerHandle>, WorkerError> {
        let stdout = open_truncating(&cmd.stdout_path)?;
        let stderr = open_truncating(&cmd.stderr_path)?;

        let mut command = Command::new(&cmd.binary);
        command
            .args(&cmd.args)
            .current_dir(&cmd.cwd)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);

        #[cfg(unix)]
        unsafe {
            use std::os::unix::process::CommandExt;
            command.pre_exec(|| {
                nix::sys::signal::signal(
                    nix::sys::signal::Signal::SIGINT,
                    nix::sys::signal::SigHandler::SigIgn,
                )
                .map_err(std::io::Error::from)?;
                Ok(())
            });
        }

        let child = command
            .spawn()
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

        Ok(Box::new(ChildHandle { child }))
    }
}

fn open_truncating(path: &Path) -> Result<std::fs::File, WorkerError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(std::fs::File::create(path)?)
}

struct ChildHandle {
    child: Child,
}

#[async_trait]
impl WorkerHandle for ChildHandle {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(mut self: Box<Self>) -> Result<WorkerOutcome, WorkerError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| WorkerError::WaitFailed(e.to_string()))?;
        Ok(WorkerOutcome {
            exit_code: status.code().unwrap_or(-1),
        })
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeWorkerCli;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    pub struct WorkerCall {
        pub binary: String,
        pub args: Vec<String>,
    }

    struct FakeState {
        calls: Vec<WorkerCall>,
        scripted: Vec<WorkerOutcome>,
    }

    /// Fake worker CLI for tests: returns scripted exit codes in order, and
    /// can simulate a long-running worker (for double-tap interrupt tests)
    /// via `with_run_duration` — the handle's `wait` sleeps that long unless
    /// a shared `killed` flag is flipped first, simulating `terminate`.
    #[derive(Clone)]
    pub struct FakeWorkerCli {
        inner: Arc<Mutex<FakeState>>,
        run_duration: Duration,
        killed: Arc<AtomicBool>,
    }

    impl Default for FakeWorkerCli {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeState {
                    calls: Vec::new(),
                    scripted: vec![WorkerOutcome { exit_code: 0 }],
                })),
                run_duration: Duration::ZERO,
                killed: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl FakeWorkerCli {
        pub fn with_exit_codes(codes: impl IntoIterator<Item = i32>) -> Self {
            let scripted = codes.into_iter().map(|exit_code| WorkerOutcome { exit_code }).collect();
            Self {
                inner: Arc::new(Mutex::new(FakeState {
                    calls: Vec::new(),
                    scripted,
                })),
                run_duration: Duration::ZERO,
                killed: Arc::new(AtomicBool::new(false)),
            }
        }

        pub fn with_run_duration(mut self, duration: Duration) -> Self {
            self.run_duration = duration;
            self
        }

        pub fn calls(&self) -> Vec<WorkerCall> {
            self.inner.lock().calls.clone()
        }

        /// Simulate an external `terminate`/`kill` by pid: the fake has no
        /// real process, so tests signal it through this shared flag
        /// instead of `koan_adapters::worker::terminate`.
        pub fn simulate_kill(&self) {
            self.killed.store(true, Ordering::SeqCst);
        }

        pub fn is_killed(&self) -> bool {
            self.killed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WorkerCli for FakeWorkerCli {
        async fn spawn(&self, cmd: &WorkerCommand) -> Result<Box<dyn WorkerHandle>, WorkerError> {
            let mut state = self.inner.lock();
            state.calls.push(WorkerCall {
                binary: cmd.binary.clone(),
                args: cmd.args.clone(),
            });
            let outcome = if state.scripted.len() > 1 {
                state.scripted.remove(0)
            } else {
                state.scripted[0].clone()
            };
            Ok(Box::new(FakeHandle {
                outcome,
                run_duration: self.run_duration,
                killed: self.killed.clone(),
            }))
        }
    }

    struct FakeHandle {
        outcome: WorkerOutcome,
        run_duration: Duration,
        killed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl WorkerHandle for FakeHandle {
        fn pid(&self) -> Option<u32> {
            Some(1)
        }

        async fn wait(self: Box<Self>) -> Result<WorkerOutcome, WorkerError> {
            let step = Duration::from_millis(50);
            let mut elapsed = Duration::ZERO;
            while elapsed < self.run_duration {
                if self.killed.load(Ordering::SeqCst) {
                    return Ok(WorkerOutcome { exit_code: -1 });
                }
                tokio::time::sleep(step).await;
                elapsed += step;
            }
            if self.killed.load(Ordering::SeqCst) {
                return Ok(WorkerOutcome { exit_code: -1 });
            }
            Ok(self.outcome)
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
