// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The iteration planner: a pure function from a state snapshot to a tagged
//! decision enum, with no I/O inside the decision function itself.
//!
//! Recurring-mission injection and the autonomous-mode dice roll are both
//! effects the *caller* performs before/alongside calling [`plan_iteration`]:
//! the injector's due templates are inserted into the caller's mutable
//! `MissionsFile` ahead of time (the planner only reports what was
//! injected, for logging), and the deep-mode probability draw is supplied
//! as `dice_roll` rather than sampled inside this function.

use koan_storage::missions::{MissionsFile, Item};
use koan_storage::UsageState;

/// Variants an autonomous mission may run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutonomousMode {
    Review,
    Implement,
    Deep,
}

impl AutonomousMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AutonomousMode::Review => "review",
            AutonomousMode::Implement => "implement",
            AutonomousMode::Deep => "deep",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanAction {
    Mission {
        project: String,
        title: String,
        autonomous_mode: String,
    },
    Autonomous {
        project: String,
        mode: AutonomousMode,
        focus_area: Option<String>,
    },
    Contemplative {
        project: String,
    },
    FocusWait {
        remaining_secs: i64,
    },
    ScheduleWait,
    WaitPause {
        reason: String,
    },
    Error {
        message: String,
    },
}

/// Tunable thresholds, kept separate from environment-derived [`koan_core::Config`]
/// so tests can construct them directly.
#[derive(Debug, Clone)]
pub struct PlanConfig {
    /// Fraction (0.0-1.0) of quota held back as a safety margin before the
    /// planner considers the budget exhausted.
    pub safety_margin: f64,
    /// Quota percentage at/under which autonomous mode downgrades to review.
    pub review_threshold_pct: f64,
    /// Probability (0.0-1.0) of picking `deep` mode when quota is ample and
    /// the project hasn't been worked recently.
    pub deep_mode_probability: f64,
    /// A project counts as "recently worked" if visited within this many
    /// seconds.
    pub recent_window_secs: i64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            safety_margin: 0.10,
            review_threshold_pct: 25.0,
            deep_mode_probability: 0.15,
            recent_window_secs: 6 * 3600,
        }
    }
}

/// Snapshot of everything the planner needs. Constructed by the agent loop
/// from the missions file, usage state, and recurring/focus/schedule
/// modules; never fetched by the planner itself.
pub struct PlanContext<'a> {
    pub config: PlanConfig,
    pub missions: &'a MissionsFile,
    pub usage: &'a UsageState,
    pub now_unix: i64,
    pub projects: &'a [String],
    pub last_project: Option<&'a str>,
    /// Unix timestamp each project was last worked on, for deep-mode gating.
    pub project_last_worked: &'a [(String, i64)],
    /// `Some(remaining_secs)` when focus mode is active and not yet expired.
    pub focus_remaining_secs: Option<i64>,
    /// `false` outside configured working hours when a schedule predicate
    /// is configured; `true` when no schedule restriction applies.
    pub in_work_hours: bool,
    /// Precomputed draw in `[0, 1)`, supplied by the caller's RNG, used only
    /// for the deep-mode probability check (keeps this function pure).
    pub dice_roll: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PlanOutput {
    pub action: PlanAction,
    pub display_lines: Vec<String>,
    /// Available-quota percentage with the safety margin already applied.
    pub quota_pct: f64,
}

impl Default for PlanAction {
    fn default() -> Self {
        PlanAction::ScheduleWait
    }
}

/// Percentage of quota still available, after subtracting the configured
/// safety margin. Quota model: `usage.estimated_reset` marks the session
/// boundary; between now and that reset, 100% is budgeted minus an assumed
/// linear consumption tracked via `missions_run`. The external
/// quota-exhaustion predicate (reading the worker's own output) is the
/// source of truth for actual exhaustion; this is only the planner's own
/// pacing heuristic.
fn available_quota_pct(usage: &UsageState, config: &PlanConfig) -> f64 {
    let raw = if usage.missions_run == 0 {
        100.0
    } else {
        // Consumption estimate: each mission burns a fixed notional slice;
        // the external quota predicate is the source of truth for actual
        // exhaustion, this is only the planner's own pacing heuristic.
        (100.0 - (usage.missions_run as f64 * 4.0)).max(0.0)
    };
    (raw - config.safety_margin * 100.0).max(0.0)
}

/// First Pending item carrying a project tag; `None` if every Pending item
/// is untagged or Pending is empty.
fn first_tagged_project(items: &[&Item]) -> Option<String> {
    items.iter().find_map(|i| i.project.clone())
}

fn round_robin_project(projects: &[String], last: Option<&str>) -> Option<String> {
    if projects.is_empty() {
        return None;
    }
    let last_idx = last.and_then(|l| projects.iter().position(|p| p == l));
    let next_idx = match last_idx {
        Some(i) => (i + 1) % projects.len(),
        None => 0,
    };
    Some(projects[next_idx].clone())
}

fn select_project(ctx: &PlanContext) -> Option<String> {
    let pending = ctx.missions.pending();
    first_tagged_project(&pending).or_else(|| round_robin_project(ctx.projects, ctx.last_project))
}

fn select_mode(ctx: &PlanContext, project: &str, quota_pct: f64) -> AutonomousMode {
    if quota_pct <= ctx.config.review_threshold_pct {
        return AutonomousMode::Review;
    }
    let recently_worked = ctx
        .project_last_worked
        .iter()
        .find(|(p, _)| p == project)
        .map(|(_, ts)| ctx.now_unix - ts < ctx.config.recent_window_secs)
        .unwrap_or(false);
    if !recently_worked && ctx.dice_roll < ctx.config.deep_mode_probability {
        return AutonomousMode::Deep;
    }
    AutonomousMode::Implement
}

/// Compute the planner's decision for this iteration. Pure: no filesystem
/// or network access, no mutation of `ctx.missions`.
pub fn plan_iteration(ctx: &PlanContext) -> PlanOutput {
    let quota_pct = available_quota_pct(ctx.usage, &ctx.config);
    let mut display_lines = vec![format!("quota available: {quota_pct:.0}%")];

    if !ctx.in_work_hours {
        display_lines.push("outside configured work hours".to_string());
        return PlanOutput {
            action: PlanAction::ScheduleWait,
            display_lines,
            quota_pct,
        };
    }

    if let Some(remaining) = ctx.focus_remaining_secs {
        if remaining > 0 {
            display_lines.push(format!("focus mode active, {remaining}s remaining"));
            return PlanOutput {
                action: PlanAction::FocusWait { remaining_secs: remaining },
                display_lines,
                quota_pct,
            };
        }
    }

    if quota_pct <= 0.0 {
        display_lines.push("quota exhausted".to_string());
        return PlanOutput {
            action: PlanAction::WaitPause { reason: "quota".to_string() },
            display_lines,
            quota_pct,
        };
    }

    if let Some(project) = select_project(ctx) {
        if !ctx.projects.is_empty() && !ctx.projects.contains(&project) {
            return PlanOutput {
                action: PlanAction::Error {
                    message: format!("unknown project {project:?}"),
                },
                display_lines,
                quota_pct,
            };
        }
        if let Some(item) = ctx.missions.extract_next_pending(Some(&project)) {
            display_lines.push(format!("running mission for {project}"));
            return PlanOutput {
                action: PlanAction::Mission {
                    project,
                    title: item.first_line().to_string(),
                    autonomous_mode: String::new(),
                },
                display_lines,
                quota_pct,
            };
        }
        // Project was chosen (round-robin) but has no matching Pending item:
        // fall through to autonomous mode for that project.
        let mode = select_mode(ctx, &project, quota_pct);
        display_lines.push(format!("no pending work, running autonomous ({}) on {project}", mode.as_str()));
        return PlanOutput {
            action: PlanAction::Autonomous {
                project,
                mode,
                focus_area: None,
            },
            display_lines,
            quota_pct,
        };
    }

    if let Some(item) = ctx.missions.extract_next_pending(None) {
        display_lines.push("running untagged mission under default project".to_string());
        return PlanOutput {
            action: PlanAction::Mission {
                project: "default".to_string(),
                title: item.first_line().to_string(),
                autonomous_mode: String::new(),
            },
            display_lines,
            quota_pct,
        };
    }

    PlanOutput {
        action: PlanAction::ScheduleWait,
        display_lines,
        quota_pct,
    }
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;
