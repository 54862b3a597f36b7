// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The outbox: a line-buffered markdown file through which the agent loop
//! asynchronously sends messages to the human via the bridge.
//!
//! Grounded on `spec.md` §4.C's `flush_outbox` contract: read under an
//! exclusive advisory lock, move the content aside, release the lock, then
//! hand it to the sender. The truncate only becomes permanent once the send
//! succeeds — on failure the message is restored so the next poll retries it.

use std::fs::OpenOptions;
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn outbox_path(instance_dir: &Path) -> PathBuf {
    instance_dir.join("outbox.md")
}

/// Append a message to the outbox under an exclusive advisory lock.
pub fn append(instance_dir: &Path, message: &str) -> Result<(), OutboxError> {
    let path = outbox_path(instance_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    file.lock_exclusive()?;
    let result = writeln!(file, "{message}");
    FileExt::unlock(&file)?;
    result?;
    Ok(())
}

/// `flush_outbox(sender)`: read the outbox under lock, and if non-empty hand
/// its content to `sender`. On success the file is truncated inside the same
/// lock; on failure the content is left in place for the next cycle.
///
/// `sender` returns `true` on a successful send, `false` on a transient
/// failure that should be retried.
pub fn flush(instance_dir: &Path, sender: impl FnOnce(&str) -> bool) -> Result<bool, OutboxError> {
    let path = outbox_path(instance_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(&path)?;
    file.lock_exclusive()?;

    let mut content = String::new();
    file.read_to_string(&mut content)?;

    if content.trim().is_empty() {
        FileExt::unlock(&file)?;
        return Ok(false);
    }

    let sent = sender(content.trim_end());
    if sent {
        file.set_len(0)?;
    }
    FileExt::unlock(&file)?;
    Ok(sent)
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;
