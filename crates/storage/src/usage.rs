// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Usage/quota state: `usage_state.json`, the small opaque planner state
//! tracked across iterations, and `usage.md`, the free-text report composed
//! for `/usage` and the pause-on-quota notification.
//!
//! Grounded on `spec.md` §3's "Usage/quota state" and §4.E's planner inputs:
//! session start time, counts, and an estimated reset timestamp. The core
//! never interprets quota-exhaustion itself (`spec.md` §1's explicit
//! boundary); this module only persists and reloads the state the planner
//! and post-mission pipeline read and write.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid usage state json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Opaque planner state, persisted between iterations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageState {
    /// Unix seconds when the current quota session started.
    pub session_start: i64,
    /// Number of missions run so far in this session.
    pub missions_run: u64,
    /// Estimated unix-second timestamp of the next quota reset, if known.
    pub estimated_reset: Option<i64>,
}

impl Default for UsageState {
    fn default() -> Self {
        Self {
            session_start: 0,
            missions_run: 0,
            estimated_reset: None,
        }
    }
}

fn state_path(instance_dir: &Path) -> PathBuf {
    instance_dir.join("usage_state.json")
}

fn report_path(instance_dir: &Path) -> PathBuf {
    instance_dir.join("usage.md")
}

impl UsageState {
    pub fn load(instance_dir: &Path) -> Result<Self, UsageError> {
        let path = state_path(instance_dir);
        let Ok(text) = std::fs::read_to_string(&path) else {
            return Ok(Self::default());
        };
        Ok(serde_json::from_str(&text).unwrap_or_default())
    }

    pub fn save(&self, instance_dir: &Path) -> Result<(), UsageError> {
        let path = state_path(instance_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        crate::signals::write_atomic(&path, &text)
            .map_err(|e| UsageError::Io(std::io::Error::other(e.to_string())))?;
        Ok(())
    }

    /// Reset the session counters. Called on auto-resume from a quota pause,
    /// per `spec.md` §4.G's pause handler ("resets usage session counters
    /// (prevents immediate re-pause on stale usage)").
    pub fn reset_session(&mut self, now_unix: i64) {
        self.session_start = now_unix;
        self.missions_run = 0;
        self.estimated_reset = None;
    }

    pub fn record_mission(&mut self) {
        self.missions_run += 1;
    }
}

/// Write the free-text `usage.md` report read by `/usage`.
pub fn write_report(instance_dir: &Path, report: &str) -> Result<(), UsageError> {
    let path = report_path(instance_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    crate::signals::write_atomic(&path, report)
        .map_err(|e| UsageError::Io(std::io::Error::other(e.to_string())))?;
    Ok(())
}

pub fn read_report(instance_dir: &Path) -> Option<String> {
    std::fs::read_to_string(report_path(instance_dir)).ok()
}

#[cfg(test)]
#[path = "usage_tests.rs"]
mod tests;
