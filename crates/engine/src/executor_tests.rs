// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use koan_adapters::worker::FakeWorkerCli;
use koan_adapters::WorkerCommand;
use std::time::Duration;

fn cmd() -> WorkerCommand {
    WorkerCommand {
        binary: "claude".to_string(),
        args: vec![],
        cwd: std::env::temp_dir(),
        stdout_path: std::env::temp_dir().join("koan-executor-test.out"),
        stderr_path: std::env::temp_dir().join("koan-executor-test.err"),
    }
}

#[test]
fn enter_phase_restores_previous_phase_on_drop() {
    let state = SignalState::new();
    assert_eq!(state.current_phase(), None);
    {
        let _outer = state.enter_phase("mission");
        assert_eq!(state.current_phase(), Some("mission".to_string()));
        {
            let _inner = state.enter_phase("chat-reply");
            assert_eq!(state.current_phase(), Some("chat-reply".to_string()));
        }
        assert_eq!(state.current_phase(), Some("mission".to_string()));
    }
    assert_eq!(state.current_phase(), None);
    assert!(!state.task_running());
}

#[test]
fn register_interrupt_outside_phase_is_immediate() {
    let state = SignalState::new();
    assert_eq!(state.register_interrupt(Instant::now()), InterruptTap::Immediate);
}

#[test]
fn register_interrupt_first_then_second_within_window() {
    let state = SignalState::new();
    let _phase = state.enter_phase("mission");
    let now = Instant::now();
    assert_eq!(state.register_interrupt(now), InterruptTap::First);
    assert_eq!(state.register_interrupt(now), InterruptTap::Second);
    // The tap state resets after escalating: a third call starts over.
    assert_eq!(state.register_interrupt(now), InterruptTap::First);
}

#[tokio::test]
async fn worker_executor_returns_outcome_when_no_interrupt() {
    let cli = FakeWorkerCli::with_exit_codes([0]);
    let state = SignalState::new();
    let outcome = WorkerExecutor::run(&cli, cmd(), &state, "mission").await.unwrap();
    assert!(outcome.success());
}

#[tokio::test]
async fn worker_executor_propagates_worker_failure() {
    let cli = FakeWorkerCli::with_exit_codes([1]);
    let state = SignalState::new();
    let outcome = WorkerExecutor::run(&cli, cmd(), &state, "mission").await.unwrap();
    assert!(!outcome.success());
}

#[tokio::test]
async fn worker_executor_escalates_on_double_tap_interrupt() {
    let cli = FakeWorkerCli::default().with_run_duration(Duration::from_millis(150));
    let state = SignalState::new();

    let run = tokio::spawn({
        let state = state.clone();
        async move { WorkerExecutor::run(&cli, cmd(), &state, "mission").await }
    });

    // Give the spawn a moment to enter the protected phase, then double-tap.
    tokio::time::sleep(Duration::from_millis(10)).await;
    state.notify_interrupt();
    tokio::time::sleep(Duration::from_millis(10)).await;
    state.notify_interrupt();

    let result = run.await.unwrap();
    assert!(matches!(result, Err(ExecutorError::Interrupted)));
}

#[tokio::test]
async fn worker_executor_single_interrupt_does_not_cancel() {
    let cli = FakeWorkerCli::with_exit_codes([0]);
    let state = SignalState::new();

    let run = tokio::spawn({
        let state = state.clone();
        async move { WorkerExecutor::run(&cli, cmd(), &state, "mission").await }
    });

    tokio::time::sleep(Duration::from_millis(5)).await;
    state.notify_interrupt();

    let result = run.await.unwrap();
    assert!(result.unwrap().success());
}
