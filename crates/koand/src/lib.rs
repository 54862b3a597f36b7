// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wiring for `koand`: turns a loaded [`koan_core::Config`] into a fully
//! populated [`LoopDeps`], and the process-level crash-recovery wrapper
//! around [`AgentLoop::run`]. Split out of `main.rs` so it can be exercised
//! without an actual process entry point, mirroring `lifecycle.rs` in
//! `examples/groblegark-oddjobs/crates/daemon`.

use std::time::Duration;

use koan_adapters::worker::ProcessWorkerCli;
use koan_core::{Clock, Config, SystemClock};
use koan_engine::collaborators::{
    NoOpAutoMergeChecker, NoOpInstanceCommitter, NoOpProjectGitSync, NoOpRecurringInjector,
};
use koan_engine::{
    AgentLoop, AgentLoopError, ExitReason, LoopDeps, PhraseQuotaDetector, ProcessRitualRunner,
    ProcessSkillDispatcher,
};

/// A single crash-recovery wrapper gives up after this many consecutive
/// process-level crashes, per `spec.md` §7 ("Process crash").
pub const MAX_MAIN_CRASHES: u32 = 5;

/// Linear backoff cap between crash-recovery restarts, in seconds.
const MAIN_CRASH_BACKOFF_CAP_SECS: u64 = 60;

/// Exit code the binary reports for each outcome, per `spec.md` §6.
pub mod exit_code {
    pub const CLEAN: i32 = 0;
    pub const MISCONFIGURED: i32 = 1;
    pub const RESTART: i32 = 42;
}

/// Builds the full dependency set for a production agent loop from a loaded
/// [`Config`]. The caller supplies `signal_state` since it must be shared
/// with the process's own interrupt handler, set up in `main.rs`.
pub fn build_loop_deps(
    config: &Config,
    signal_state: koan_engine::SignalState,
) -> LoopDeps<SystemClock> {
    let morning_cmd = std::env::var("KOAN_MORNING_RITUAL_CMD")
        .ok()
        .map(|bin| (bin, Vec::new()));
    let evening_cmd = std::env::var("KOAN_EVENING_RITUAL_CMD")
        .ok()
        .map(|bin| (bin, Vec::new()));

    LoopDeps {
        root: config.koan_root.clone(),
        instance_dir: config.instance_dir.clone(),
        clock: SystemClock,
        worker: std::sync::Arc::new(ProcessWorkerCli),
        worker_bin: config.worker_bin.clone(),
        projects: config.projects.clone(),
        project_paths: config.project_paths.clone(),
        plan_config: Default::default(),
        max_runs: config.max_runs,
        git_sync_interval: config.git_sync_interval,
        poll_interval: Duration::from_secs(60),
        startup_collaborators: Vec::new(),
        ritual: Box::new(ProcessRitualRunner { morning_cmd, evening_cmd }),
        skill_dispatcher: Box::new(ProcessSkillDispatcher::default()),
        auto_merge: Box::new(NoOpAutoMergeChecker),
        recurring: Box::new(NoOpRecurringInjector),
        quota_detector: Box::new(PhraseQuotaDetector::default_phrases()),
        committer: Box::new(NoOpInstanceCommitter),
        project_git_sync: Box::new(NoOpProjectGitSync),
        signal_state,
    }
}

/// Runs `AgentLoop::startup` + `AgentLoop::run` under the process-level
/// crash-recovery wrapper described in `spec.md` §4.G / §7: a
/// `SystemExit(42)`-equivalent ([`ExitReason::Restart`]) re-enters the inner
/// loop immediately; any other error counts against [`MAX_MAIN_CRASHES`],
/// sleeping `min(10 * n, 60)`s between attempts.
pub async fn run_with_crash_recovery<C: Clock>(
    build: impl Fn() -> LoopDeps<C>,
) -> Result<(), AgentLoopError> {
    let mut crashes: u32 = 0;
    loop {
        let agent_loop = AgentLoop::new(build());
        let outcome = async {
            let _lock = agent_loop.startup().await?;
            Ok::<ExitReason, AgentLoopError>(agent_loop.run().await)
        }
        .await;

        match outcome {
            Ok(ExitReason::Stopped) => return Ok(()),
            Ok(ExitReason::Restart) => {
                tracing::info!("restart requested, re-entering agent loop");
                continue;
            }
            Err(e) => {
                crashes += 1;
                tracing::error!(error = %e, crashes, "agent loop crashed");
                if crashes >= MAX_MAIN_CRASHES {
                    return Err(e);
                }
                let backoff = Duration::from_secs((10 * crashes as u64).min(MAIN_CRASH_BACKOFF_CAP_SECS));
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
