// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared command handlers: local-only state mutations and queries that
//! both the bridge and (for local testing) the CLI dispatch to. None of
//! these spawn the worker CLI synchronously — `/chat` and `/mission` only
//! enqueue or classify; the actual worker invocation happens on the agent
//! loop's or bridge's own schedule.

use std::path::Path;

use koan_core::mission::PauseReason;
use koan_storage::missions::{clean_mission_display, extract_now_flag, MissionsFile};
use koan_storage::{journal, signals::Signals, UsageState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("signal error: {0}")]
    Signal(#[from] koan_storage::signals::SignalError),

    #[error("journal error: {0}")]
    Journal(#[from] journal::JournalError),

    #[error("missions error: {0}")]
    Missions(#[from] koan_storage::missions::MissionsError),
}

/// Everything a command handler needs to read or touch state, gathered up
/// front by the caller (bridge or CLI) so this module stays free of direct
/// environment/config access.
pub struct CommandContext<'a> {
    pub root: &'a Path,
    pub instance_dir: &'a Path,
    pub projects: &'a [String],
    pub now_unix: i64,
    pub run_pid_alive: bool,
    pub bridge_pid_alive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub reply: String,
}

impl CommandOutcome {
    fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into() }
    }
}

/// Dispatches a recognized `/`-prefixed command. `text` is the full message
/// including the leading slash; unrecognized commands get a static reply
/// pointing at `/help`.
pub fn handle_command(
    ctx: &CommandContext,
    missions: &mut MissionsFile,
    usage: &UsageState,
    text: &str,
) -> Result<CommandOutcome, CommandError> {
    let signals = Signals::new(ctx.root);
    let trimmed = text.trim();
    let (command, rest) = split_command(trimmed);

    match command {
        "/stop" => {
            signals.set("stop")?;
            Ok(CommandOutcome::new("stopping after the current step."))
        }
        "/pause" => {
            if signals.is_set("pause") {
                return Ok(CommandOutcome::new("already paused."));
            }
            signals.set("pause")?;
            signals.write_text("pause-reason", PauseReason::Manual.as_str())?;
            Ok(CommandOutcome::new("paused."))
        }
        "/resume" => handle_resume(ctx, &signals),
        "/status" => Ok(CommandOutcome::new(status_report(ctx, &signals, missions))),
        "/ping" => Ok(CommandOutcome::new(ping_report(ctx))),
        "/usage" => Ok(CommandOutcome::new(usage_report(ctx, usage, missions))),
        "/help" => Ok(CommandOutcome::new(HELP_TEXT.to_string())),
        "/verbose" => {
            signals.set("verbose")?;
            Ok(CommandOutcome::new("verbose mode on."))
        }
        "/silent" => {
            signals.clear("verbose")?;
            Ok(CommandOutcome::new("verbose mode off."))
        }
        "/chat" => Ok(CommandOutcome::new(format!("chat: {}", rest.trim()))),
        "/mission" => handle_mission_command(ctx, missions, rest),
        "/idea" => {
            missions.insert_idea(rest.trim());
            Ok(CommandOutcome::new("added to ideas."))
        }
        "/reflect" => {
            let timestamp = koan_core::time_fmt::format_unix(ctx.now_unix);
            journal::append_shared_journal(ctx.root, &timestamp, rest.trim())?;
            Ok(CommandOutcome::new("reflection recorded."))
        }
        "/sparring" => Ok(CommandOutcome::new("starting a sparring session.")),
        "/log" | "/journal" => handle_journal_command(ctx, rest),
        _ => Ok(CommandOutcome::new("unrecognized command. try /help.")),
    }
}

fn split_command(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest),
        None => (text, ""),
    }
}

/// Legacy auto-resume fallback: modern writes always produce `pause-reason`;
/// this only reads the older `.koan-quota-reset` timestamp file if the
/// modern one is missing, applying a 2-hour heuristic reset window.
const LEGACY_RESET_WINDOW_SECS: i64 = 2 * 3600;

/// If `pause-reason` is missing but the legacy `.koan-quota-reset` timestamp
/// file is present and recent (within [`LEGACY_RESET_WINDOW_SECS`]), treat
/// the pause as a quota pause rather than reporting a bare "resumed.".
fn legacy_quota_reason(signals: &Signals, now_unix: i64) -> Option<PauseReason> {
    let ts: i64 = signals.read_text("quota-reset")?.trim().parse().ok()?;
    if (now_unix - ts).abs() <= LEGACY_RESET_WINDOW_SECS {
        Some(PauseReason::Quota)
    } else {
        None
    }
}

fn handle_resume(ctx: &CommandContext, signals: &Signals) -> Result<CommandOutcome, CommandError> {
    if !signals.is_set("pause") {
        return Ok(CommandOutcome::new("not paused."));
    }
    let reason = signals.read_text("pause-reason");
    let reason = reason
        .as_deref()
        .and_then(PauseReason::parse)
        .or_else(|| legacy_quota_reason(signals, ctx.now_unix));
    signals.clear("pause")?;
    signals.clear("pause-reason")?;
    signals.clear("quota-reset")?;

    match reason {
        Some(PauseReason::Quota) => Ok(CommandOutcome::new("resumed (was paused for quota).")),
        Some(PauseReason::MaxRuns) => Ok(CommandOutcome::new("resumed (was paused at run ceiling).")),
        Some(PauseReason::Errors) => Ok(CommandOutcome::new("resumed (was paused after repeated errors).")),
        Some(PauseReason::Manual) | None => Ok(CommandOutcome::new("resumed.")),
    }
}

fn status_report(ctx: &CommandContext, signals: &Signals, missions: &MissionsFile) -> String {
    let mut lines = vec!["status:".to_string()];
    lines.push(if !ctx.run_pid_alive {
        "- not running".to_string()
    } else if signals.is_set("pause") {
        let reason = signals.read_text("pause-reason").unwrap_or_default();
        format!("- paused ({reason})")
    } else {
        "- running".to_string()
    });

    let pending_by_project = missions.group_by_project();
    let in_progress = missions.in_progress();
    for (project, items) in &pending_by_project {
        let in_progress_count = in_progress
            .iter()
            .filter(|i| i.project.as_deref().unwrap_or("default") == project.as_str())
            .count();
        lines.push(format!("- {project}: {} pending, {in_progress_count} in progress", items.len()));
        for item in items.iter().take(3) {
            lines.push(format!("    - {}", clean_mission_display(&item.text, 120)));
        }
    }
    lines.join("\n")
}

fn ping_report(ctx: &CommandContext) -> String {
    let run = if ctx.run_pid_alive { "🟢 agent loop" } else { "🔴 agent loop" };
    let bridge = if ctx.bridge_pid_alive { "🟢 bridge" } else { "🔴 bridge" };
    format!("{run}\n{bridge}")
}

fn usage_report(ctx: &CommandContext, usage: &UsageState, missions: &MissionsFile) -> String {
    let mut lines = vec![format!("missions run this session: {}", usage.missions_run)];
    lines.push(format!("pending: {}", missions.pending().len()));
    lines.push(format!("in progress: {}", missions.in_progress().len()));
    if let Ok(pending) = journal::read_pending(ctx.instance_dir) {
        if let Some(pending) = pending {
            lines.push("current journal entry:".to_string());
            lines.push(pending);
        }
    }
    lines.join("\n")
}

fn handle_mission_command(
    ctx: &CommandContext,
    missions: &mut MissionsFile,
    text: &str,
) -> Result<CommandOutcome, CommandError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(CommandOutcome::new("usage: /mission <text>"));
    }
    let (text, urgent) = extract_now_flag(text);
    let text = text.as_str();
    if let Some(tag) = koan_storage::missions::extract_project_tag(text) {
        if !ctx.projects.is_empty() && !ctx.projects.contains(&tag) {
            return Ok(CommandOutcome::new(format!(
                "unknown project {tag:?}. known projects: {}",
                ctx.projects.join(", ")
            )));
        }
    }
    missions.insert_mission(text, urgent);
    Ok(CommandOutcome::new(if urgent { "mission queued (urgent)." } else { "mission queued." }.to_string()))
}

fn handle_journal_command(ctx: &CommandContext, rest: &str) -> Result<CommandOutcome, CommandError> {
    let mut parts = rest.split_whitespace();
    let mut project = parts.next().map(|s| s.to_string());
    let mut date_token = parts.next().map(|s| s.to_string());

    // `/journal 2026-01-05` (date only, no project) is a common shorthand.
    if let Some(p) = &project {
        if date_token.is_none() && looks_like_date_token(p) {
            date_token = Some(p.clone());
            project = None;
        }
    }

    let date = resolve_date_token(date_token.as_deref(), ctx.now_unix);
    let project = project.unwrap_or_else(|| "default".to_string());

    match journal::read_journal(ctx.instance_dir, &date, &project)? {
        Some(entry) => Ok(CommandOutcome::new(entry)),
        None => Ok(CommandOutcome::new(format!("no journal entry for {project} on {date}."))),
    }
}

fn looks_like_date_token(token: &str) -> bool {
    token == "yesterday" || (token.len() == 10 && token.as_bytes().get(4) == Some(&b'-'))
}

fn resolve_date_token(token: Option<&str>, now_unix: i64) -> String {
    use chrono::{Duration, TimeZone, Utc};
    let now = Utc.timestamp_opt(now_unix, 0).single().unwrap_or_else(Utc::now);
    match token {
        Some("yesterday") => (now - Duration::days(1)).format("%Y-%m-%d").to_string(),
        Some(explicit) => explicit.to_string(),
        None => now.format("%Y-%m-%d").to_string(),
    }
}

const HELP_TEXT: &str = "\
commands:
  /stop             stop after the current step
  /pause            pause the agent loop
  /resume           resume from a pause
  /status           runner mode, pause reason, pending/in-progress summary
  /ping             process liveness
  /usage            usage/quota summary
  /chat <text>      force the chat path
  /mission <text>   enqueue a mission
  /idea <text>      add an idea
  /reflect <text>   record a journal reflection
  /log [project] [date]   look up a journal entry
  /verbose / /silent      toggle verbose logging
  /help             this text";

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
