// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use koan_storage::missions::MissionsFile;
use koan_storage::UsageState;

const EMPTY: &str = "# Missions\n\n## Pending\n\n## In Progress\n\n## Done\n\n## Failed\n";

fn ctx<'a>(
    missions: &'a MissionsFile,
    usage: &'a UsageState,
    projects: &'a [String],
    last_project: Option<&'a str>,
) -> PlanContext<'a> {
    PlanContext {
        config: PlanConfig::default(),
        missions,
        usage,
        now_unix: 1_700_000_000,
        projects,
        last_project,
        project_last_worked: &[],
        focus_remaining_secs: None,
        in_work_hours: true,
        dice_roll: 0.99,
    }
}

#[test]
fn picks_pending_mission_for_tagged_project() {
    let mut missions = MissionsFile::parse(EMPTY);
    missions.insert_mission("- [project:koan] fix the bug", false);
    let usage = UsageState::default();
    let projects = vec!["koan".to_string()];
    let output = plan_iteration(&ctx(&missions, &usage, &projects, None));
    match output.action {
        PlanAction::Mission { project, title, .. } => {
            assert_eq!(project, "koan");
            assert!(title.contains("fix the bug"));
        }
        other => panic!("expected Mission, got {other:?}"),
    }
}

#[test]
fn round_robins_project_when_no_pending_tag() {
    let missions = MissionsFile::parse(EMPTY);
    let usage = UsageState::default();
    let projects = vec!["alpha".to_string(), "beta".to_string()];
    let output = plan_iteration(&ctx(&missions, &usage, &projects, Some("alpha")));
    match output.action {
        PlanAction::Autonomous { project, .. } => assert_eq!(project, "beta"),
        other => panic!("expected Autonomous, got {other:?}"),
    }
}

#[test]
fn round_robin_wraps_to_first_project() {
    let missions = MissionsFile::parse(EMPTY);
    let usage = UsageState::default();
    let projects = vec!["alpha".to_string(), "beta".to_string()];
    let output = plan_iteration(&ctx(&missions, &usage, &projects, Some("beta")));
    match output.action {
        PlanAction::Autonomous { project, .. } => assert_eq!(project, "alpha"),
        other => panic!("expected Autonomous, got {other:?}"),
    }
}

#[test]
fn low_quota_forces_review_mode() {
    let missions = MissionsFile::parse(EMPTY);
    let usage = UsageState {
        missions_run: 18,
        ..UsageState::default()
    };
    let projects = vec!["alpha".to_string()];
    let mut c = ctx(&missions, &usage, &projects, None);
    c.dice_roll = 0.0;
    let output = plan_iteration(&c);
    match output.action {
        PlanAction::Autonomous { mode, .. } => assert_eq!(mode, AutonomousMode::Review),
        other => panic!("expected Autonomous, got {other:?}"),
    }
}

#[test]
fn ample_quota_and_low_dice_roll_picks_deep_mode() {
    let missions = MissionsFile::parse(EMPTY);
    let usage = UsageState::default();
    let projects = vec!["alpha".to_string()];
    let mut c = ctx(&missions, &usage, &projects, None);
    c.dice_roll = 0.01;
    let output = plan_iteration(&c);
    match output.action {
        PlanAction::Autonomous { mode, .. } => assert_eq!(mode, AutonomousMode::Deep),
        other => panic!("expected Autonomous, got {other:?}"),
    }
}

#[test]
fn recently_worked_project_never_gets_deep_mode() {
    let missions = MissionsFile::parse(EMPTY);
    let usage = UsageState::default();
    let projects = vec!["alpha".to_string()];
    let mut c = ctx(&missions, &usage, &projects, None);
    c.dice_roll = 0.01;
    c.project_last_worked = &[("alpha".to_string(), 1_699_999_000)];
    let output = plan_iteration(&c);
    match output.action {
        PlanAction::Autonomous { mode, .. } => assert_eq!(mode, AutonomousMode::Implement),
        other => panic!("expected Autonomous, got {other:?}"),
    }
}

#[test]
fn quota_exhausted_yields_wait_pause() {
    let missions = MissionsFile::parse(EMPTY);
    let usage = UsageState {
        missions_run: 100,
        ..UsageState::default()
    };
    let projects = vec!["alpha".to_string()];
    let output = plan_iteration(&ctx(&missions, &usage, &projects, None));
    assert_eq!(output.action, PlanAction::WaitPause { reason: "quota".to_string() });
}

#[test]
fn focus_mode_yields_focus_wait() {
    let missions = MissionsFile::parse(EMPTY);
    let usage = UsageState::default();
    let projects = vec!["alpha".to_string()];
    let mut c = ctx(&missions, &usage, &projects, None);
    c.focus_remaining_secs = Some(120);
    let output = plan_iteration(&c);
    assert_eq!(output.action, PlanAction::FocusWait { remaining_secs: 120 });
}

#[test]
fn outside_work_hours_yields_schedule_wait() {
    let missions = MissionsFile::parse(EMPTY);
    let usage = UsageState::default();
    let projects = vec!["alpha".to_string()];
    let mut c = ctx(&missions, &usage, &projects, None);
    c.in_work_hours = false;
    let output = plan_iteration(&c);
    assert_eq!(output.action, PlanAction::ScheduleWait);
}

#[test]
fn unknown_project_tag_errors() {
    let mut missions = MissionsFile::parse(EMPTY);
    missions.insert_mission("- [project:ghost] do something", false);
    let usage = UsageState::default();
    let projects = vec!["alpha".to_string()];
    let output = plan_iteration(&ctx(&missions, &usage, &projects, None));
    assert!(matches!(output.action, PlanAction::Error { .. }));
}

#[test]
fn no_projects_and_no_pending_yields_schedule_wait() {
    let missions = MissionsFile::parse(EMPTY);
    let usage = UsageState::default();
    let projects: Vec<String> = vec![];
    let output = plan_iteration(&ctx(&missions, &usage, &projects, None));
    assert_eq!(output.action, PlanAction::ScheduleWait);
}
