// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mission queue and idea backlog editing that has no `/`-prefixed chat
//! equivalent — reorder, cancel, promote, delete — so it has no home in
//! `koan_engine::commands::handle_command` and lives here instead.

use clap::Subcommand;
use koan_core::clock::{Clock, SystemClock};
use koan_core::Config;
use koan_storage::missions::{extract_now_flag, MissionsError, MissionsFile};

#[derive(Subcommand)]
pub enum MissionCommand {
    /// Enqueue a new mission.
    Add {
        /// Mission text (and, inline, an optional `[project:NAME]` tag or a
        /// trailing `--now` to mark it urgent).
        #[arg(allow_hyphen_values = true)]
        text: Vec<String>,
        /// Insert at the top of Pending instead of the bottom.
        #[arg(long)]
        urgent: bool,
    },
    /// List Pending, In Progress, Done, and Failed missions.
    List,
    /// Move a matching Pending mission to In Progress.
    Start {
        /// Substring of the mission's first line.
        needle: Vec<String>,
    },
    /// Mark a matching mission Done.
    Complete {
        /// Substring of the mission's first line.
        needle: Vec<String>,
    },
    /// Mark a matching mission Failed.
    Fail {
        /// Substring of the mission's first line.
        needle: Vec<String>,
    },
    /// Cancel a Pending mission by 1-based position or substring.
    Cancel {
        /// A 1-based Pending position, or a substring of the first line.
        id_or_needle: Vec<String>,
    },
    /// Move a Pending mission to a new 1-based position (default: top).
    Reorder {
        /// Current 1-based position.
        from: usize,
        /// Target 1-based position (default 1).
        to: Option<usize>,
    },
}

#[derive(Subcommand)]
pub enum IdeaCommand {
    /// Add an idea to the backlog.
    Add {
        /// Idea text.
        text: Vec<String>,
    },
    /// List the idea backlog.
    List,
    /// Delete a 1-based idea.
    Delete {
        /// 1-based position in the Ideas list.
        index: usize,
    },
    /// Promote a 1-based idea to the top of Pending.
    Promote {
        /// 1-based position in the Ideas list.
        index: usize,
    },
    /// Promote every idea to Pending, preserving relative order.
    PromoteAll,
}

pub fn handle_mission(
    cmd: MissionCommand,
    config: &Config,
    missions: &mut MissionsFile,
) -> Result<String, MissionsError> {
    match cmd {
        MissionCommand::Add { text, urgent } => {
            let text = text.join(" ");
            let (text, now_flag) = extract_now_flag(&text);
            let urgent = urgent || now_flag;
            if let Some(tag) = koan_storage::missions::extract_project_tag(&text) {
                if !config.projects.is_empty() && !config.projects.contains(&tag) {
                    return Ok(format!(
                        "unknown project {tag:?}. known projects: {}",
                        config.projects.join(", ")
                    ));
                }
            }
            missions.insert_mission(&text, urgent);
            Ok(if urgent { "mission queued (urgent).".to_string() } else { "mission queued.".to_string() })
        }
        MissionCommand::List => Ok(list_missions(missions)),
        MissionCommand::Start { needle } => {
            let needle = needle.join(" ");
            let now_unix = SystemClock.now_unix();
            Ok(if missions.start_mission(&needle, now_unix) {
                format!("started: {needle}")
            } else {
                format!("no pending mission matches {needle:?}")
            })
        }
        MissionCommand::Complete { needle } => {
            let needle = needle.join(" ");
            let now_unix = SystemClock.now_unix();
            Ok(if missions.complete_mission(&needle, now_unix) {
                format!("completed: {needle}")
            } else {
                format!("no mission matches {needle:?}")
            })
        }
        MissionCommand::Fail { needle } => {
            let needle = needle.join(" ");
            let now_unix = SystemClock.now_unix();
            Ok(if missions.fail_mission(&needle, now_unix) {
                format!("failed: {needle}")
            } else {
                format!("no mission matches {needle:?}")
            })
        }
        MissionCommand::Cancel { id_or_needle } => {
            let needle = id_or_needle.join(" ");
            match missions.cancel_pending_mission(&needle) {
                Ok(cancelled) => Ok(format!("cancelled: {cancelled}")),
                Err(e) => Err(e),
            }
        }
        MissionCommand::Reorder { from, to } => {
            let to = to.unwrap_or(1);
            missions.reorder_mission(from, to)?;
            Ok(format!("moved pending #{from} to #{to}"))
        }
    }
}

pub fn handle_idea(cmd: IdeaCommand, missions: &mut MissionsFile) -> Result<String, MissionsError> {
    match cmd {
        IdeaCommand::Add { text } => {
            let text = text.join(" ");
            missions.insert_idea(&text);
            Ok("added to ideas.".to_string())
        }
        IdeaCommand::List => Ok(list_ideas(missions)),
        IdeaCommand::Delete { index } => match missions.delete_idea(index) {
            Some(text) => Ok(format!("deleted idea #{index}: {text}")),
            None => Ok(format!("no idea at #{index}")),
        },
        IdeaCommand::Promote { index } => Ok(if missions.promote_idea(index) {
            format!("promoted idea #{index} to pending.")
        } else {
            format!("no idea at #{index}")
        }),
        IdeaCommand::PromoteAll => {
            let n = missions.promote_all_ideas();
            Ok(format!("promoted {n} idea(s) to pending."))
        }
    }
}

fn list_missions(missions: &MissionsFile) -> String {
    let mut lines = Vec::new();
    for (label, items) in [
        ("pending", missions.pending()),
        ("in progress", missions.in_progress()),
        ("done", missions.done()),
        ("failed", missions.failed()),
    ] {
        lines.push(format!("{label} ({}):", items.len()));
        for (i, item) in items.iter().enumerate() {
            lines.push(format!("  {}. {}", i + 1, item.first_line()));
        }
    }
    lines.join("\n")
}

fn list_ideas(missions: &MissionsFile) -> String {
    let ideas = missions.ideas();
    if ideas.is_empty() {
        return "ideas: (none)".to_string();
    }
    let mut lines = vec![format!("ideas ({}):", ideas.len())];
    for (i, item) in ideas.iter().enumerate() {
        lines.push(format!("  {}. {}", i + 1, item.first_line()));
    }
    lines.join("\n")
}
