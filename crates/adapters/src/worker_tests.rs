// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

fn sample_cmd(dir: &std::path::Path) -> WorkerCommand {
    WorkerCommand {
        binary: "claude".to_string(),
        args: vec!["--mission".to_string(), "do it".to_string()],
        cwd: dir.to_path_buf(),
        stdout_path: dir.join("out.log"),
        stderr_path: dir.join("err.log"),
    }
}

#[tokio::test]
async fn fake_worker_returns_scripted_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let cli = FakeWorkerCli::with_exit_codes([0]);
    let handle = cli.spawn(&sample_cmd(dir.path())).await.unwrap();
    let outcome = handle.wait().await.unwrap();
    assert!(outcome.success());
}

#[tokio::test]
async fn fake_worker_records_calls() {
    let dir = tempfile::tempdir().unwrap();
    let cli = FakeWorkerCli::default();
    let _ = cli.spawn(&sample_cmd(dir.path())).await.unwrap();
    let calls = cli.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].binary, "claude");
}

#[tokio::test]
async fn fake_worker_honors_simulated_kill() {
    let dir = tempfile::tempdir().unwrap();
    let cli = FakeWorkerCli::with_exit_codes([0]).with_run_duration(Duration::from_secs(10));
    let handle = cli.spawn(&sample_cmd(dir.path())).await.unwrap();

    let cli_for_kill = cli.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cli_for_kill.simulate_kill();
    });

    let outcome = handle.wait().await.unwrap();
    assert!(!outcome.success());
    assert!(cli.is_killed());
}
