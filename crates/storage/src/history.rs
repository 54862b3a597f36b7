// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The mission dedup ledger: `mission-history.jsonl`, one record per attempt.
//!
//! Grounded on `spec.md` §4.D's dedup guard ("a counter... for that
//! mission's canonical text... attempted 3 or more times") and the
//! `[SUPPLEMENT]` in `SPEC_FULL.md` §3 naming the record shape
//! `{needle_hash, project, started_at, outcome}`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A mission is failed outright once it has been attempted this many times.
pub const DEDUP_THRESHOLD: u32 = 3;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Started,
    Done,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub needle_hash: String,
    pub project: String,
    pub started_at: i64,
    pub outcome: Outcome,
}

fn history_path(instance_dir: &Path) -> PathBuf {
    instance_dir.join("mission-history.jsonl")
}

/// Canonicalize a mission's first line for dedup comparison: project tags
/// stripped, lowercased, whitespace collapsed.
pub fn canonicalize(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or("");
    let without_tags = strip_bracket_tags(first_line);
    without_tags
        .to_ascii_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_bracket_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0u32;
    for c in text.chars() {
        match c {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn needle_hash(text: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    canonicalize(text).hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn read_records(instance_dir: &Path) -> Vec<HistoryRecord> {
    let Ok(text) = std::fs::read_to_string(history_path(instance_dir)) else {
        return Vec::new();
    };
    text.lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

/// Append a record for an attempt.
pub fn record_execution(
    instance_dir: &Path,
    mission_text: &str,
    project: &str,
    started_at: i64,
    outcome: Outcome,
) -> Result<(), HistoryError> {
    let record = HistoryRecord {
        needle_hash: needle_hash(mission_text),
        project: project.to_string(),
        started_at,
        outcome,
    };
    let path = history_path(instance_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let line = serde_json::to_string(&record).unwrap_or_default();
    use std::io::Write as _;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

/// Count how many times `mission_text` has been attempted (any outcome),
/// per `spec.md` §4.D.
pub fn attempt_count(instance_dir: &Path, mission_text: &str) -> u32 {
    let hash = needle_hash(mission_text);
    read_records(instance_dir)
        .iter()
        .filter(|r| r.needle_hash == hash)
        .count() as u32
}

/// The dedup guard itself: true once a mission has been attempted
/// [`DEDUP_THRESHOLD`] or more times.
pub fn should_skip_mission(instance_dir: &Path, mission_text: &str) -> bool {
    attempt_count(instance_dir, mission_text) >= DEDUP_THRESHOLD
}

/// Trim records older than `retention_secs`, per the startup collaborator
/// named in `SPEC_FULL.md` §4.G ("mission-history cleanup").
pub fn trim_older_than(instance_dir: &Path, now_unix: i64, retention_secs: i64) -> Result<(), HistoryError> {
    let path = history_path(instance_dir);
    let records: Vec<HistoryRecord> = read_records(instance_dir)
        .into_iter()
        .filter(|r| now_unix - r.started_at < retention_secs)
        .collect();
    let mut out = String::new();
    for record in &records {
        out.push_str(&serde_json::to_string(record).unwrap_or_default());
        out.push('\n');
    }
    crate::signals::write_atomic(&path, &out)
        .map_err(|e| HistoryError::Io(std::io::Error::other(e.to_string())))?;
    Ok(())
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
