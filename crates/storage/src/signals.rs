// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal/pidfile layer: exclusive single-instance locks, boolean signal
//! files, and atomic text-file writes.
//!
//! Pidfile locking is grounded on the advisory-lock dance in
//! `daemon/src/lifecycle.rs::startup_inner`: open non-truncating, take the
//! exclusive lock, only then truncate and write the PID — a losing process
//! must never be able to wipe the winner's PID between open and lock.

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("another instance of {0} is already running (pid {1})")]
    AlreadyRunning(String, i32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// RAII guard holding the exclusive lock on a pidfile. Dropping it releases
/// the lock and removes the file — mirrors `daemon/src/lifecycle.rs`'s
/// `DaemonState::shutdown` pidfile cleanup, folded into `Drop` here since
/// this system has no separate listener/socket to tear down first.
pub struct PidLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

impl Drop for PidLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Process-wide namespace for a pidfile: `run` (agent loop), `bridge`,
/// `ollama` (local LLM helper, if configured).
pub fn pid_path(root: &Path, name: &str) -> PathBuf {
    root.join(format!(".koan-pid-{name}"))
}

/// `acquire_pidfile(root, name)`: creates `root/.koan-pid-{name}`, writes the
/// current PID, and takes a non-blocking exclusive advisory lock. Fails with
/// `AlreadyRunning` if the lock is already held by a live process. A stale
/// PID file (present, lock free) is silently overwritten.
pub fn acquire_pidfile(root: &Path, name: &str) -> Result<PidLock, SignalError> {
    let path = pid_path(root, name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)?;

    if file.try_lock_exclusive().is_err() {
        let existing_pid = std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| s.trim().parse::<i32>().ok())
            .unwrap_or(0);
        return Err(SignalError::AlreadyRunning(name.to_string(), existing_pid));
    }

    let mut file = file;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;

    Ok(PidLock { path, file })
}

/// `check_pidfile(root, name)`: returns the writer's PID if the lock is
/// currently held, else the file's recorded PID if that process is alive,
/// else `None`.
pub fn check_pidfile(root: &Path, name: &str) -> Option<i32> {
    let path = pid_path(root, name);
    let file = OpenOptions::new().read(true).write(true).open(&path).ok()?;

    if file.try_lock_exclusive().is_ok() {
        // We just took the lock ourselves: nobody else is holding it, so
        // release immediately and fall back to the liveness probe below.
        let _ = fs2::FileExt::unlock(&file);
        let pid: i32 = std::fs::read_to_string(&path).ok()?.trim().parse().ok()?;
        return if is_alive(pid) { Some(pid) } else { None };
    }

    // Lock contended: someone holds it, read the PID they wrote.
    std::fs::read_to_string(&path)
        .ok()?
        .trim()
        .parse::<i32>()
        .ok()
}

/// `acquire_pid(root, name, pid)`: non-lock-based variant for shell-launched
/// helpers that cannot hold a file handle for their lifetime. Compares the
/// existing PID's liveness: permits self (same PID) and dead-PID overwrite,
/// fails on live-different.
pub fn acquire_pid(root: &Path, name: &str, pid: i32) -> Result<(), SignalError> {
    let path = pid_path(root, name);
    if let Ok(existing) = std::fs::read_to_string(&path) {
        if let Ok(existing_pid) = existing.trim().parse::<i32>() {
            if existing_pid != pid && is_alive(existing_pid) {
                return Err(SignalError::AlreadyRunning(name.to_string(), existing_pid));
            }
        }
    }
    write_atomic(&path, &pid.to_string())?;
    Ok(())
}

/// Kernel-level liveness probe: `kill(pid, 0)`.
pub fn is_alive(pid: i32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
}

/// Boolean signal files under the koan root: `stop`, `pause`, `restart`,
/// `verbose`. Presence = on. Access is test-and-set: atomic write via
/// temp-file + rename, read is an existence check.
pub struct Signals<'a> {
    root: &'a Path,
}

impl<'a> Signals<'a> {
    pub fn new(root: &'a Path) -> Self {
        Self { root }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(format!(".koan-{name}"))
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    pub fn set(&self, name: &str) -> Result<(), SignalError> {
        write_atomic(&self.path(name), "")
    }

    pub fn clear(&self, name: &str) -> Result<(), SignalError> {
        let path = self.path(name);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// mtime of a signal file, used to compare `restart` against startup time.
    pub fn mtime(&self, name: &str) -> Option<std::time::SystemTime> {
        std::fs::metadata(self.path(name)).ok()?.modified().ok()
    }

    /// Write a last-writer-wins text file (`status`, `project`, `heartbeat`).
    pub fn write_text(&self, name: &str, content: &str) -> Result<(), SignalError> {
        write_atomic(&self.path(name), content)
    }

    pub fn read_text(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.path(name)).ok()
    }
}

/// Write `content` to `path` atomically: write to a sibling temp file, then
/// rename onto the final path.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), SignalError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(format!(".tmp.{}", std::process::id()));
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;
