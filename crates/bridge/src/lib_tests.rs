// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use koan_adapters::FakeWorkerCli;
use koan_storage::missions::MissionsFile;
use koan_storage::UsageState;
use tempfile::tempdir;

use super::*;

fn deps(root: &std::path::Path, configured_chat_id: i64) -> BridgeDeps {
    BridgeDeps {
        root: root.to_path_buf(),
        instance_dir: root.join("instance"),
        projects: vec!["default".to_string()],
        project_paths: HashMap::new(),
        configured_chat_id,
        worker_bin: "claude".to_string(),
        chat_timeout: Duration::from_secs(5),
    }
}

#[test]
fn startup_creates_instance_dir_and_heartbeat() {
    let dir = tempdir().unwrap();
    let d = deps(dir.path(), 42);
    startup(&d, 1_700_000_000).unwrap();

    assert!(d.instance_dir.exists());
    let heartbeat = dir.path().join(".koan-bridge-heartbeat");
    assert_eq!(std::fs::read_to_string(heartbeat).unwrap(), "1700000000");
}

#[test]
fn handle_update_ignores_messages_from_other_chat_ids() {
    let dir = tempdir().unwrap();
    let d = deps(dir.path(), 42);
    std::fs::create_dir_all(&d.instance_dir).unwrap();
    let chat_worker = ChatWorker::new(Arc::new(FakeWorkerCli::default()));
    let mut missions = MissionsFile::parse("");
    let usage = UsageState::default();

    let reply = handle_update(
        &d,
        &chat_worker,
        &mut missions,
        &usage,
        1_700_000_000,
        true,
        true,
        Classification::Mission,
        "fix the login bug",
        99,
    )
    .unwrap();

    assert_eq!(reply, None);
    assert!(missions.pending().is_empty());
}

#[test]
fn handle_update_command_dispatches_and_replies() {
    let dir = tempdir().unwrap();
    let d = deps(dir.path(), 42);
    std::fs::create_dir_all(&d.instance_dir).unwrap();
    let chat_worker = ChatWorker::new(Arc::new(FakeWorkerCli::default()));
    let mut missions = MissionsFile::parse("");
    let usage = UsageState::default();

    let reply = handle_update(
        &d,
        &chat_worker,
        &mut missions,
        &usage,
        1_700_000_000,
        true,
        true,
        Classification::Command,
        "/ping",
        42,
    )
    .unwrap();

    assert!(reply.unwrap().contains("agent loop"));
}

#[test]
fn handle_update_mission_enqueues_and_replies() {
    let dir = tempdir().unwrap();
    let d = deps(dir.path(), 42);
    std::fs::create_dir_all(&d.instance_dir).unwrap();
    let chat_worker = ChatWorker::new(Arc::new(FakeWorkerCli::default()));
    let mut missions = MissionsFile::parse("");
    let usage = UsageState::default();

    let reply = handle_update(
        &d,
        &chat_worker,
        &mut missions,
        &usage,
        1_700_000_000,
        true,
        true,
        Classification::Mission,
        "fix the login bug",
        42,
    )
    .unwrap();

    assert_eq!(reply, Some("mission queued.".to_string()));
    assert_eq!(missions.pending().len(), 1);
}

#[test]
fn handle_update_empty_chat_text_is_dropped() {
    let dir = tempdir().unwrap();
    let d = deps(dir.path(), 42);
    std::fs::create_dir_all(&d.instance_dir).unwrap();
    let chat_worker = ChatWorker::new(Arc::new(FakeWorkerCli::default()));
    let mut missions = MissionsFile::parse("");
    let usage = UsageState::default();

    let reply = handle_update(
        &d, &chat_worker, &mut missions, &usage, 1_700_000_000, true, true,
        Classification::Chat, "   ", 42,
    )
    .unwrap();

    assert_eq!(reply, None);
}

#[tokio::test]
async fn chat_worker_refuses_concurrent_invocations() {
    let dir = tempdir().unwrap();
    let d = deps(dir.path(), 42);
    std::fs::create_dir_all(&d.instance_dir).unwrap();
    let worker = Arc::new(FakeWorkerCli::default().with_run_duration(Duration::from_millis(50)));
    let chat_worker = ChatWorker::new(worker);

    assert!(chat_worker.try_spawn(&d, "how's it going?", 1_700_000_000));
    assert!(chat_worker.is_busy());
    assert!(!chat_worker.try_spawn(&d, "another question", 1_700_000_001));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!chat_worker.is_busy());
}

#[test]
fn classify_text_reexport_matches_engine_classifier() {
    assert_eq!(classify_text("/status"), Classification::Command);
    assert_eq!(classify_text("fix the bug"), Classification::Mission);
    assert_eq!(classify_text("how's it going?"), Classification::Chat);
}
