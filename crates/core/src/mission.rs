// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mission domain types.
//!
//! The canonical representation of a mission stays textual (the missions
//! store works directly on markdown), but callers that need a structured
//! view use [`Mission`].

use serde::{Deserialize, Serialize};

/// The section a mission currently lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Idea,
    Pending,
    InProgress,
    Done,
    Failed,
}

impl Section {
    /// Canonical markdown header text, in file order.
    pub fn header(self) -> &'static str {
        match self {
            Section::Idea => "## Ideas",
            Section::Pending => "## Pending",
            Section::InProgress => "## In Progress",
            Section::Done => "## Done",
            Section::Failed => "## Failed",
        }
    }

    /// Sections in canonical file order, excluding Ideas (which lives in its
    /// own leading block per the missions file layout).
    pub fn execution_order() -> [Section; 4] {
        [
            Section::Pending,
            Section::InProgress,
            Section::Done,
            Section::Failed,
        ]
    }

    /// All five sections in canonical file order.
    pub fn canonical_order() -> [Section; 5] {
        [
            Section::Idea,
            Section::Pending,
            Section::InProgress,
            Section::Done,
            Section::Failed,
        ]
    }
}

/// A parsed mission entry: the full text block (first line plus any
/// continuation lines) and the project it is tagged with, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mission {
    pub text: String,
    pub project: Option<String>,
    pub section: Section,
}

impl Mission {
    /// First line of the entry, used for needle matching and display.
    pub fn first_line(&self) -> &str {
        self.text.lines().next().unwrap_or("")
    }
}

/// Why the agent loop is currently paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    Quota,
    MaxRuns,
    Errors,
    Manual,
}

impl PauseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            PauseReason::Quota => "quota",
            PauseReason::MaxRuns => "max_runs",
            PauseReason::Errors => "errors",
            PauseReason::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "quota" => Some(PauseReason::Quota),
            "max_runs" => Some(PauseReason::MaxRuns),
            "errors" => Some(PauseReason::Errors),
            "manual" => Some(PauseReason::Manual),
            _ => None,
        }
    }
}
