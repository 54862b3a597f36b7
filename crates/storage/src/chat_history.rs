// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chat history: `telegram-history.jsonl`, one `{role, text, ts}` record per
//! line, used by the bridge's chat worker and the daily-compaction startup
//! collaborator.
//!
//! Grounded on `spec.md` §3's chat history format and the `[SUPPLEMENT]`
//! compaction routine in `SPEC_FULL.md` §4.G: old entries are grouped by
//! calendar day and collapsed into a single summary line, capping the file.

use std::path::{Path, PathBuf};

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatHistoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatEntry {
    pub role: Role,
    pub text: String,
    pub ts: i64,
}

fn history_path(instance_dir: &Path) -> PathBuf {
    instance_dir.join("telegram-history.jsonl")
}

pub fn append(instance_dir: &Path, entry: &ChatEntry) -> Result<(), ChatHistoryError> {
    use std::io::Write as _;
    let path = history_path(instance_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    let line = serde_json::to_string(entry).unwrap_or_default();
    writeln!(file, "{line}")?;
    Ok(())
}

pub fn read_all(instance_dir: &Path) -> Vec<ChatEntry> {
    let Ok(text) = std::fs::read_to_string(history_path(instance_dir)) else {
        return Vec::new();
    };
    text.lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

/// Return the most recent `limit` entries, in chronological order.
pub fn recent(instance_dir: &Path, limit: usize) -> Vec<ChatEntry> {
    let all = read_all(instance_dir);
    let start = all.len().saturating_sub(limit);
    all[start..].to_vec()
}

fn day_key(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Compact entries older than `cutoff_ts`: group by calendar day and
/// collapse each day into a single summary entry; entries at or after the
/// cutoff pass through untouched. Runs once at startup per
/// `SPEC_FULL.md` §4.G.
pub fn compact_at_startup(instance_dir: &Path, cutoff_ts: i64) -> Result<(), ChatHistoryError> {
    let all = read_all(instance_dir);
    let (old, recent): (Vec<_>, Vec<_>) = all.into_iter().partition(|e| e.ts < cutoff_ts);

    if old.is_empty() {
        return Ok(());
    }

    let mut by_day: indexmap::IndexMap<String, (usize, i64)> = indexmap::IndexMap::new();
    for entry in &old {
        let key = day_key(entry.ts);
        let slot = by_day.entry(key).or_insert((0, entry.ts));
        slot.0 += 1;
        slot.1 = slot.1.min(entry.ts);
    }

    let mut compacted: Vec<ChatEntry> = by_day
        .into_iter()
        .map(|(day, (count, ts))| ChatEntry {
            role: Role::Assistant,
            text: format!("[{count} messages on {day}, compacted]"),
            ts,
        })
        .collect();
    compacted.extend(recent);

    let path = history_path(instance_dir);
    let mut out = String::new();
    for entry in &compacted {
        out.push_str(&serde_json::to_string(entry).unwrap_or_default());
        out.push('\n');
    }
    crate::signals::write_atomic(&path, &out)
        .map_err(|e| ChatHistoryError::Io(std::io::Error::other(e.to_string())))?;
    Ok(())
}

#[cfg(test)]
#[path = "chat_history_tests.rs"]
mod tests;
