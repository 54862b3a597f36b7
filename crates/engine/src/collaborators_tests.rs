// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn noop_ritual_runner_always_succeeds() {
    let runner = NoOpRitualRunner;
    runner.run_morning().await.unwrap();
    runner.run_evening().await.unwrap();
}

#[tokio::test]
async fn fake_ritual_runner_counts_calls() {
    let runner = FakeRitualRunner::default();
    runner.run_morning().await.unwrap();
    runner.run_morning().await.unwrap();
    runner.run_evening().await.unwrap();
    assert_eq!(runner.morning_calls.load(Ordering::SeqCst), 2);
    assert_eq!(runner.evening_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn fake_skill_dispatcher_recognizes_configured_prefixes() {
    let dispatcher = FakeSkillDispatcher {
        recognized_prefixes: vec!["/status".to_string(), "/ping".to_string()],
        scripted: None,
    };
    assert!(dispatcher.is_skill_mission("/status please"));
    assert!(!dispatcher.is_skill_mission("mission: fix the bug"));
}

#[tokio::test]
async fn fake_skill_dispatcher_returns_none_for_unrecognized_text() {
    let dispatcher = FakeSkillDispatcher::default();
    let result = dispatcher.dispatch("implement the thing", Path::new("/tmp")).await;
    assert!(result.is_none());
}

#[test]
fn process_skill_dispatcher_recognizes_namespace() {
    let dispatcher = ProcessSkillDispatcher::default();
    assert!(dispatcher.is_skill_mission("/mission new idea"));
    assert!(!dispatcher.is_skill_mission("implement the login form"));
}

#[tokio::test]
async fn noop_auto_merge_checker_never_acts() {
    let checker = NoOpAutoMergeChecker;
    assert!(checker.check(Path::new("/tmp")).await.unwrap().is_none());
}

#[tokio::test]
async fn fake_auto_merge_checker_returns_scripted_action() {
    let checker = FakeAutoMergeChecker {
        scripted: Some(AutoMergeAction::MergedLocally { branch: "auto/fix-1".to_string() }),
    };
    let action = checker.check(Path::new("/tmp")).await.unwrap();
    assert_eq!(action, Some(AutoMergeAction::MergedLocally { branch: "auto/fix-1".to_string() }));
}

#[tokio::test]
async fn noop_recurring_injector_never_injects() {
    let injector = NoOpRecurringInjector;
    assert!(injector.due_template(1_700_000_000).await.is_none());
}

#[tokio::test]
async fn fake_recurring_injector_returns_scripted_template() {
    let injector = FakeRecurringInjector {
        scripted: Some("mission: weekly dependency audit".to_string()),
    };
    assert_eq!(
        injector.due_template(1_700_000_000).await,
        Some("mission: weekly dependency audit".to_string())
    );
}

#[test]
fn phrase_quota_detector_matches_known_phrases() {
    let detector = PhraseQuotaDetector::default_phrases();
    assert!(detector.exhausted("Error: Rate limit reached, try again later"));
    assert!(!detector.exhausted("mission completed successfully"));
}

#[test]
fn fake_quota_detector_returns_scripted_value() {
    let detector = FakeQuotaDetector { scripted: true };
    assert!(detector.exhausted("anything"));
}

#[tokio::test]
async fn noop_instance_committer_never_fails() {
    let committer = NoOpInstanceCommitter;
    committer.commit(Path::new("/tmp"), "msg").await.unwrap();
}

#[tokio::test]
async fn fake_instance_committer_records_messages() {
    let committer = FakeInstanceCommitter::default();
    committer.commit(Path::new("/tmp"), "mission done").await.unwrap();
    assert_eq!(committer.messages.lock().as_slice(), ["mission done".to_string()]);
}

#[tokio::test]
async fn fake_project_git_sync_records_paths() {
    let syncer = FakeProjectGitSync::default();
    syncer.sync(Path::new("/tmp/proj")).await.unwrap();
    assert_eq!(syncer.synced.lock().as_slice(), [std::path::PathBuf::from("/tmp/proj")]);
}
