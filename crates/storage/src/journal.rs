// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal storage: the per-project daily journal (`journal/YYYY-MM-DD/
//! <project>.md`), the live-progress scratchpad (`journal/pending.md`), and
//! the koan-root-level `shared-journal.md` written by `/reflect`.
//!
//! Grounded on `spec.md` §4.C and §3's journal directory layout, and on the
//! `[SUPPLEMENT]` shared-journal behavior in `SPEC_FULL.md` §3/§4.I.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn journal_root(instance_dir: &Path) -> PathBuf {
    instance_dir.join("journal")
}

fn pending_path(instance_dir: &Path) -> PathBuf {
    journal_root(instance_dir).join("pending.md")
}

fn daily_path(instance_dir: &Path, date: &str, project: &str) -> PathBuf {
    journal_root(instance_dir).join(date).join(format!("{project}.md"))
}

/// Append `content` plus a trailing newline to `journal/<date>/<project>.md`
/// under an exclusive advisory lock, creating the date directory as needed.
pub fn append_to_journal(
    instance_dir: &Path,
    date: &str,
    project: &str,
    content: &str,
) -> Result<(), JournalError> {
    let path = daily_path(instance_dir, date, project);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.lock_exclusive()?;
    let result = writeln!(file, "{content}");
    FileExt::unlock(&file)?;
    result?;
    Ok(())
}

/// Read a specific day's journal for a project, or `None` if it does not
/// exist. Used by `/log` and `/journal`.
pub fn read_journal(instance_dir: &Path, date: &str, project: &str) -> Option<String> {
    std::fs::read_to_string(daily_path(instance_dir, date, project)).ok()
}

/// Create `journal/pending.md` with a single header line, truncating any
/// previous scratchpad (a new mission starts a fresh one).
pub fn start_pending(instance_dir: &Path, header: &str) -> Result<(), JournalError> {
    let path = pending_path(instance_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format!("{header}\n"))?;
    Ok(())
}

pub fn read_pending(instance_dir: &Path) -> Option<String> {
    std::fs::read_to_string(pending_path(instance_dir)).ok()
}

/// Archive `journal/pending.md` into today's daily journal for `project` and
/// remove it. No-op if the scratchpad does not exist (e.g. a skill mission
/// that never wrote one).
pub fn archive_pending(instance_dir: &Path, date: &str, project: &str) -> Result<(), JournalError> {
    let path = pending_path(instance_dir);
    let Ok(content) = std::fs::read_to_string(&path) else {
        return Ok(());
    };
    append_to_journal(instance_dir, date, project, content.trim_end())?;
    std::fs::remove_file(&path)?;
    Ok(())
}

/// Append a timestamped entry to the koan-root-level `shared-journal.md`,
/// used by `/reflect`. Lives outside `instance_dir` since it is not scoped
/// to any single project.
pub fn append_shared_journal(koan_root: &Path, timestamp: &str, text: &str) -> Result<(), JournalError> {
    let path = koan_root.join("shared-journal.md");
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.lock_exclusive()?;
    let result = writeln!(file, "## {timestamp}\n\n{text}\n");
    FileExt::unlock(&file)?;
    result?;
    Ok(())
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
