// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The top-level agent loop: startup, the per-iteration body, the pause
//! handler, and iteration-level crash recovery.
//!
//! Grounded on `run.py::main_loop/_run_iteration/_handle_iteration_error/
//! handle_pause` (see `examples/original_source/koan`). Process-level crash
//! recovery (`spec.md` §4.G's `MAX_MAIN_CRASHES` outer wrapper) is the
//! binary's concern, not this library's: `koand`'s `main.rs` re-enters
//! [`AgentLoop::run`] on `ExitReason::Restart` and on an unexpected panic
//! boundary, counting crashes the way `run.py::main` counts them around its
//! own `main_loop()` call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use koan_adapters::{WorkerCli, WorkerCommand};
use koan_core::mission::PauseReason;
use koan_core::Clock;
use koan_storage::missions::MissionsFile;
use koan_storage::signals::{self, Signals};
use koan_storage::{history, journal, outbox, UsageState};
use parking_lot::Mutex;
use thiserror::Error;

use crate::collaborators::{
    AutoMergeAction, AutoMergeChecker, CollaboratorError, InstanceCommitter, ProjectGitSync,
    QuotaDetector, RecurringInjector, RitualRunner, SkillDispatcher, StartupCollaborator,
};
use crate::executor::{ExecutorError, SignalState, WorkerExecutor};
use crate::planner::{plan_iteration, AutonomousMode, PlanAction, PlanConfig, PlanContext};

/// Iteration-level recovery gives up and pauses after this many consecutive
/// failed iterations.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// Total time the pause handler sleeps (in [`PAUSE_POLL_INTERVAL`]
/// increments) before re-evaluating the planner, per `spec.md` §4.G.
const PAUSE_POLL_INTERVAL: Duration = Duration::from_secs(5);
const PAUSE_SLEEP_TOTAL: Duration = Duration::from_secs(5 * 60);

/// Fine-grained polling interval while waiting for a new Pending mission to
/// wake the loop early, per `spec.md` §5 ("1s for mission detection").
const WAKE_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Signal-file polling granularity during the wake-on-event sleep, per
/// `spec.md` §5 ("5s for signal files").
const SIGNAL_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default quota-pause reset window when the planner has no sharper
/// estimate, matching scenario S4 (`T + 5 hours`).
const DEFAULT_QUOTA_RESET_SECS: i64 = 5 * 3600;

#[derive(Debug, Error)]
pub enum AgentLoopError {
    #[error("missions error: {0}")]
    Missions(#[from] koan_storage::missions::MissionsError),

    #[error("signal error: {0}")]
    Signal(#[from] koan_storage::signals::SignalError),

    #[error("journal error: {0}")]
    Journal(#[from] journal::JournalError),

    #[error("usage error: {0}")]
    Usage(#[from] koan_storage::UsageError),

    #[error("outbox error: {0}")]
    Outbox(#[from] outbox::OutboxError),

    #[error("history error: {0}")]
    History(#[from] history::HistoryError),

    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown project {0:?}")]
    UnknownProject(String),

    #[error("startup precondition failed: {0}")]
    Startup(String),
}

/// What [`AgentLoop::run`] stopped for, mapped to process exit codes by the
/// caller per `spec.md` §6 (`Stopped` -> 0, `Restart` -> 42).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Stopped,
    Restart,
}

/// Everything the loop needs to run, gathered once by the binary's startup
/// code. Collaborators are trait objects (each independently swappable in
/// tests); `C: Clock` stays a generic parameter since every call site
/// threads the same concrete clock through.
pub struct LoopDeps<C: Clock> {
    pub root: PathBuf,
    pub instance_dir: PathBuf,
    pub clock: C,
    pub worker: Arc<dyn WorkerCli>,
    pub worker_bin: String,
    pub projects: Vec<String>,
    pub project_paths: HashMap<String, PathBuf>,
    pub plan_config: PlanConfig,
    pub max_runs: Option<u64>,
    pub git_sync_interval: u64,
    /// How long an ordinary (non-paused) iteration sleeps before planning
    /// again, subject to early wake on a new Pending mission.
    pub poll_interval: Duration,
    pub startup_collaborators: Vec<Box<dyn StartupCollaborator>>,
    pub ritual: Box<dyn RitualRunner>,
    pub skill_dispatcher: Box<dyn SkillDispatcher>,
    pub auto_merge: Box<dyn AutoMergeChecker>,
    pub recurring: Box<dyn RecurringInjector>,
    pub quota_detector: Box<dyn QuotaDetector>,
    pub committer: Box<dyn InstanceCommitter>,
    pub project_git_sync: Box<dyn ProjectGitSync>,
    pub signal_state: SignalState,
}

impl<C: Clock> LoopDeps<C> {
    fn project_cwd(&self, project: &str) -> PathBuf {
        self.project_paths
            .get(project)
            .cloned()
            .unwrap_or_else(|| self.root.join(project))
    }
}

/// Mutable run-to-run bookkeeping the loop's own collaborators (the
/// planner, the dedup guard) are deliberately kept ignorant of.
struct RunState {
    run_count: u64,
    consecutive_errors: u32,
    last_project: Option<String>,
    project_last_worked: Vec<(String, i64)>,
    startup_unix: i64,
    rng: u64,
}

impl RunState {
    fn new(startup_unix: i64) -> Self {
        Self {
            run_count: 0,
            consecutive_errors: 0,
            last_project: None,
            project_last_worked: Vec::new(),
            startup_unix,
            rng: (startup_unix as u64) ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    /// xorshift64*: good enough for the planner's deep-mode dice roll. Not
    /// cryptographic — the planner keeps itself pure by accepting this as
    /// an argument instead of sampling internally (see `planner.rs`).
    fn dice_roll(&mut self) -> f64 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng = x;
        (x >> 11) as f64 / (1u64 << 53) as f64
    }

    fn mark_worked(&mut self, project: &str, now_unix: i64) {
        if let Some(slot) = self.project_last_worked.iter_mut().find(|(p, _)| p == project) {
            slot.1 = now_unix;
        } else {
            self.project_last_worked.push((project.to_string(), now_unix));
        }
    }
}

enum IterationSignal {
    Continue,
    Stop,
    Restart,
}

pub struct AgentLoop<C: Clock> {
    deps: LoopDeps<C>,
    state: Mutex<RunState>,
}

impl<C: Clock> AgentLoop<C> {
    pub fn new(deps: LoopDeps<C>) -> Self {
        let startup_unix = deps.clock.now_unix();
        Self {
            deps,
            state: Mutex::new(RunState::new(startup_unix)),
        }
    }

    fn signals(&self) -> Signals<'_> {
        Signals::new(&self.deps.root)
    }

    fn missions_path(&self) -> PathBuf {
        self.deps.instance_dir.join("missions.md")
    }

    /// Startup sequence (`spec.md` §4.G items 1-8), run once before
    /// [`AgentLoop::run`]. Returns the held pidfile lock; the caller must
    /// keep it alive for the process's lifetime — dropping it early
    /// releases the single-instance guarantee.
    pub async fn startup(&self) -> Result<signals::PidLock, AgentLoopError> {
        if !self.deps.root.exists() {
            return Err(AgentLoopError::Startup(format!(
                "koan root {} does not exist",
                self.deps.root.display()
            )));
        }
        std::fs::create_dir_all(&self.deps.instance_dir)?;

        let lock = signals::acquire_pidfile(&self.deps.root, "run").map_err(|e| match e {
            koan_storage::signals::SignalError::AlreadyRunning(name, pid) => {
                AgentLoopError::Startup(format!("{name} already running (pid {pid})"))
            }
            other => AgentLoopError::Signal(other),
        })?;

        let sig = self.signals();
        sig.clear("stop")?;

        sig.write_text(
            "project",
            self.deps.projects.first().map(String::as_str).unwrap_or("default"),
        )?;

        for collaborator in &self.deps.startup_collaborators {
            if let Err(e) = collaborator.run().await {
                tracing::warn!(collaborator = collaborator.name(), error = %e, "startup collaborator failed");
            }
        }

        for project in &self.deps.projects {
            let path = self.deps.project_cwd(project);
            if let Err(e) = self.deps.project_git_sync.sync(&path).await {
                tracing::warn!(project, error = %e, "startup git sync failed");
            }
        }

        outbox::append(&self.deps.instance_dir, "\u{1F7E2} koan agent loop started.")?;
        Ok(lock)
    }

    /// Runs iterations until the loop stops or a restart is requested,
    /// applying iteration-level recovery around each one.
    pub async fn run(&self) -> ExitReason {
        loop {
            match self.run_iteration().await {
                Ok(IterationSignal::Continue) => {
                    self.state.lock().consecutive_errors = 0;
                }
                Ok(IterationSignal::Stop) => return ExitReason::Stopped,
                Ok(IterationSignal::Restart) => return ExitReason::Restart,
                Err(e) => {
                    let n = {
                        let mut state = self.state.lock();
                        state.consecutive_errors += 1;
                        state.consecutive_errors
                    };
                    tracing::error!(error = %e, consecutive_errors = n, "iteration failed");
                    if n == 1 || n % 5 == 0 {
                        let _ = outbox::append(
                            &self.deps.instance_dir,
                            &format!("\u{26A0}\u{FE0F} iteration error ({n}): {e}"),
                        );
                    }
                    if n >= MAX_CONSECUTIVE_ERRORS {
                        let now = self.deps.clock.now_unix();
                        let _ = self.create_pause(PauseReason::Errors, now + DEFAULT_QUOTA_RESET_SECS, None);
                        let _ = outbox::append(
                            &self.deps.instance_dir,
                            "\u{1F534} too many consecutive errors, pausing.",
                        );
                        return ExitReason::Stopped;
                    }
                    let backoff = Duration::from_secs((10 * n as u64).min(300));
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn run_iteration(&self) -> Result<IterationSignal, AgentLoopError> {
        let sig = self.signals();

        if sig.is_set("stop") {
            outbox::append(&self.deps.instance_dir, "\u{1F6D1} stopping, as requested.")?;
            return Ok(IterationSignal::Stop);
        }

        let startup_unix = self.state.lock().startup_unix;
        if sig.is_set("restart") {
            let restarted_after_startup = sig
                .mtime("restart")
                .and_then(|m| m.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64 > startup_unix)
                .unwrap_or(false);
            if restarted_after_startup {
                sig.clear("restart")?;
                return Ok(IterationSignal::Restart);
            }
        }

        if sig.is_set("pause") {
            return self.handle_pause().await;
        }

        let now_unix = self.deps.clock.now_unix();
        let instance_dir = self.deps.instance_dir.clone();
        let missions_path = self.missions_path();
        let mut missions = MissionsFile::from_path(&missions_path)?;
        let usage = UsageState::load(&instance_dir)?;

        if let Some(template) = self.deps.recurring.due_template(now_unix).await {
            missions.insert_mission(&template, false);
            missions.save(&missions_path)?;
        }

        let (last_project, project_last_worked, dice_roll) = {
            let mut state = self.state.lock();
            (
                state.last_project.clone(),
                state.project_last_worked.clone(),
                state.dice_roll(),
            )
        };

        let plan_ctx = PlanContext {
            config: self.deps.plan_config.clone(),
            missions: &missions,
            usage: &usage,
            now_unix,
            projects: &self.deps.projects,
            last_project: last_project.as_deref(),
            project_last_worked: &project_last_worked,
            focus_remaining_secs: None,
            in_work_hours: true,
            dice_roll,
        };
        let output = plan_iteration(&plan_ctx);
        sig.write_text("status", &output.display_lines.join("; "))?;

        match output.action {
            PlanAction::Error { message } => Err(AgentLoopError::UnknownProject(message)),
            PlanAction::FocusWait { .. } | PlanAction::ScheduleWait => {
                self.sleep_wake_on_mission().await;
                Ok(IterationSignal::Continue)
            }
            PlanAction::WaitPause { reason } => {
                outbox::append(&instance_dir, "\u{1F4CB} wrapping up before pausing.")?;
                let pause_reason = PauseReason::parse(&reason).unwrap_or(PauseReason::Quota);
                let resume_at = now_unix + DEFAULT_QUOTA_RESET_SECS;
                self.create_pause(pause_reason, resume_at, None)?;
                outbox::append(
                    &instance_dir,
                    &format!(
                        "\u{23F8}\u{FE0F} pausing ({reason}), expected resume at {}.",
                        koan_core::time_fmt::format_unix(resume_at)
                    ),
                )?;
                Ok(IterationSignal::Continue)
            }
            PlanAction::Contemplative { project } => {
                let _ = self.run_contemplative(&project).await;
                self.sleep_wake_on_mission().await;
                Ok(IterationSignal::Continue)
            }
            PlanAction::Mission { project, title, .. } => {
                let mut usage = usage;
                self.run_mission_cycle(&mut missions, &mut usage, &project, &title, None).await
            }
            PlanAction::Autonomous { project, mode, focus_area } => {
                let title = format!(
                    "autonomous {} session ({})",
                    mode.as_str(),
                    focus_area.clone().unwrap_or_else(|| "general".to_string())
                );
                let mut usage = usage;
                self.run_mission_cycle(&mut missions, &mut usage, &project, &title, Some(mode)).await
            }
        }
    }

    async fn run_mission_cycle(
        &self,
        missions: &mut MissionsFile,
        usage: &mut UsageState,
        project: &str,
        title: &str,
        autonomous_mode: Option<AutonomousMode>,
    ) -> Result<IterationSignal, AgentLoopError> {
        let instance_dir = self.deps.instance_dir.clone();
        let missions_path = self.missions_path();
        let now_unix = self.deps.clock.now_unix();
        let is_real_mission = autonomous_mode.is_none();

        if is_real_mission && history::should_skip_mission(&instance_dir, title) {
            missions.fail_mission(title, now_unix);
            missions.save(&missions_path)?;
            history::record_execution(&instance_dir, title, project, now_unix, history::Outcome::Failed)?;
            outbox::append(
                &instance_dir,
                &format!("\u{274C} skipping {title:?}: attempted too many times."),
            )?;
            return Ok(IterationSignal::Continue);
        }

        let project_cwd = self.deps.project_cwd(project);

        if is_real_mission && self.deps.skill_dispatcher.is_skill_mission(title) {
            return self
                .run_skill_mission(missions, &missions_path, title, &project_cwd, &instance_dir, now_unix)
                .await;
        }

        if is_real_mission {
            missions.start_mission(title, now_unix);
            missions.save(&missions_path)?;
        }
        self.state.lock().mark_worked(project, now_unix);

        journal::start_pending(&instance_dir, &format!("# {title}"))?;

        let log_dir = instance_dir.join("logs");
        let stdout_path = log_dir.join(format!("{project}-worker.out"));
        let stderr_path = log_dir.join(format!("{project}-worker.err"));
        let cmd = WorkerCommand {
            binary: self.deps.worker_bin.clone(),
            args: vec![title.to_string()],
            cwd: project_cwd.clone(),
            stdout_path: stdout_path.clone(),
            stderr_path: stderr_path.clone(),
        };

        let outcome = WorkerExecutor::run(self.deps.worker.as_ref(), cmd, &self.deps.signal_state, "mission").await;
        let interrupted = matches!(outcome, Err(ExecutorError::Interrupted));
        let success = matches!(&outcome, Ok(o) if o.success());

        if is_real_mission {
            // Finalize before the post-mission pipeline so a subsequent
            // quota-exhaustion pause can never skip recording the outcome.
            if success {
                missions.complete_mission(title, now_unix);
            } else {
                missions.fail_mission(title, now_unix);
            }
            missions.save(&missions_path)?;
            history::record_execution(
                &instance_dir,
                title,
                project,
                now_unix,
                if success { history::Outcome::Done } else { history::Outcome::Failed },
            )?;
        }

        usage.record_mission();
        usage.save(&instance_dir)?;

        let date = today_string(now_unix);
        journal::archive_pending(&instance_dir, &date, project)?;

        let combined = format!(
            "{}\n{}",
            std::fs::read_to_string(&stdout_path).unwrap_or_default(),
            std::fs::read_to_string(&stderr_path).unwrap_or_default(),
        );
        if self.deps.quota_detector.exhausted(&combined) {
            let resume_at = now_unix + DEFAULT_QUOTA_RESET_SECS;
            self.create_pause(PauseReason::Quota, resume_at, None)?;
            self.deps.committer.commit(&instance_dir, &format!("{title} ({project})")).await?;
            outbox::append(
                &instance_dir,
                &format!(
                    "\u{23F8}\u{FE0F} quota exhausted, pausing until {}.",
                    koan_core::time_fmt::format_unix(resume_at)
                ),
            )?;
            return Ok(IterationSignal::Continue);
        }

        if let Ok(Some(action)) = self.deps.auto_merge.check(&project_cwd).await {
            self.notify_auto_merge(&instance_dir, &action)?;
        }

        let marker = if success { "\u{2705}" } else { "\u{274C}" };
        outbox::append(&instance_dir, &format!("{marker} {title} ({project})"))?;
        self.deps.committer.commit(&instance_dir, &format!("{title} ({project})")).await?;

        let run_count = {
            let mut state = self.state.lock();
            state.run_count += 1;
            state.last_project = Some(project.to_string());
            state.run_count
        };

        if run_count % self.deps.git_sync_interval.max(1) == 0 {
            let _ = self.deps.project_git_sync.sync(&project_cwd).await;
        }

        if let Some(max_runs) = self.deps.max_runs {
            if run_count >= max_runs {
                let _ = self.deps.ritual.run_evening().await;
                self.create_pause(PauseReason::MaxRuns, now_unix + DEFAULT_QUOTA_RESET_SECS, None)?;
                outbox::append(&instance_dir, "\u{1F319} run ceiling reached, pausing for the day.")?;
            }
        }

        if interrupted {
            return Ok(IterationSignal::Stop);
        }
        Ok(IterationSignal::Continue)
    }

    /// A mission whose text opens on a recognized slash command is routed
    /// to a direct subprocess runner rather than the worker CLI. If the
    /// runner doesn't recognize it after all, it is failed outright rather
    /// than falling through to the worker CLI, per `spec.md` §4.G.
    async fn run_skill_mission(
        &self,
        missions: &mut MissionsFile,
        missions_path: &Path,
        title: &str,
        project_cwd: &Path,
        instance_dir: &Path,
        now_unix: i64,
    ) -> Result<IterationSignal, AgentLoopError> {
        missions.start_mission(title, now_unix);
        missions.save(missions_path)?;

        match self.deps.skill_dispatcher.dispatch(title, project_cwd).await {
            Some(result) => {
                let success = result.exit_code == 0;
                if success {
                    missions.complete_mission(title, now_unix);
                } else {
                    missions.fail_mission(title, now_unix);
                }
                missions.save(missions_path)?;
                let marker = if success { "\u{2705}" } else { "\u{274C}" };
                outbox::append(instance_dir, &format!("{marker} {title} (skill)"))?;
            }
            None => {
                missions.fail_mission(title, now_unix);
                missions.save(missions_path)?;
                outbox::append(instance_dir, &format!("\u{274C} {title}: no matching skill runner."))?;
            }
        }
        Ok(IterationSignal::Continue)
    }

    async fn run_contemplative(&self, project: &str) -> Result<(), AgentLoopError> {
        let instance_dir = self.deps.instance_dir.clone();
        let project_cwd = self.deps.project_cwd(project);
        journal::start_pending(&instance_dir, "# contemplative session")?;

        let log_dir = instance_dir.join("logs");
        let cmd = WorkerCommand {
            binary: self.deps.worker_bin.clone(),
            args: vec!["--read-only".to_string(), "reflect on recent progress".to_string()],
            cwd: project_cwd,
            stdout_path: log_dir.join("contemplative.out"),
            stderr_path: log_dir.join("contemplative.err"),
        };
        let _ = WorkerExecutor::run(self.deps.worker.as_ref(), cmd, &self.deps.signal_state, "contemplative").await;

        let now_unix = self.deps.clock.now_unix();
        journal::archive_pending(&instance_dir, &today_string(now_unix), project)?;
        Ok(())
    }

    /// Sleeps up to `poll_interval`, waking early if a new Pending mission
    /// shows up. `spec.md` §5 fixes the two polling granularities: 1s for
    /// mission detection, 5s for signal files.
    async fn sleep_wake_on_mission(&self) {
        let sig = self.signals();
        let missions_path = self.missions_path();
        let had_pending = MissionsFile::from_path(&missions_path)
            .map(|m| !m.pending().is_empty())
            .unwrap_or(false);

        let signal_every = (SIGNAL_POLL_INTERVAL.as_secs() / WAKE_POLL_INTERVAL.as_secs()).max(1);
        let mut elapsed = Duration::ZERO;
        let mut tick: u64 = 0;
        while elapsed < self.deps.poll_interval {
            tokio::time::sleep(WAKE_POLL_INTERVAL).await;
            elapsed += WAKE_POLL_INTERVAL;
            tick += 1;

            if !had_pending {
                let now_pending = MissionsFile::from_path(&missions_path)
                    .map(|m| !m.pending().is_empty())
                    .unwrap_or(false);
                if now_pending {
                    return;
                }
            }

            if tick % signal_every == 0 && (sig.is_set("stop") || sig.is_set("pause")) {
                return;
            }
        }
    }

    /// Pause handler (`spec.md` §4.G): writes paused status, checks
    /// auto-resume, otherwise spends roughly half the time on a
    /// contemplative session before sleeping in 5s increments for 5
    /// minutes, watching for resume/restart/stop.
    async fn handle_pause(&self) -> Result<IterationSignal, AgentLoopError> {
        let sig = self.signals();
        sig.write_text("status", "paused")?;

        if let Some((reason, resume_at, _human)) = self.read_pause_state(&sig) {
            let now = self.deps.clock.now_unix();
            if now >= resume_at {
                sig.clear("pause")?;
                sig.clear("pause-reason")?;
                let mut usage = UsageState::load(&self.deps.instance_dir)?;
                usage.reset_session(now);
                usage.save(&self.deps.instance_dir)?;
                outbox::append(
                    &self.deps.instance_dir,
                    &format!("\u{25B6}\u{FE0F} resumed (was paused for {}).", reason.as_str()),
                )?;
                return Ok(IterationSignal::Continue);
            }
        }

        let dice_roll = self.state.lock().dice_roll();
        if dice_roll < 0.5 {
            if let Some(project) = self.deps.projects.first().cloned() {
                let _ = self.run_contemplative(&project).await;
            }
        }

        let mut slept = Duration::ZERO;
        while slept < PAUSE_SLEEP_TOTAL {
            if sig.is_set("stop") {
                outbox::append(&self.deps.instance_dir, "\u{1F6D1} stopping while paused.")?;
                return Ok(IterationSignal::Stop);
            }
            if sig.is_set("restart") {
                sig.clear("restart")?;
                return Ok(IterationSignal::Restart);
            }
            if !sig.is_set("pause") {
                break;
            }
            tokio::time::sleep(PAUSE_POLL_INTERVAL).await;
            slept += PAUSE_POLL_INTERVAL;
        }
        Ok(IterationSignal::Continue)
    }

    fn read_pause_state(&self, sig: &Signals) -> Option<(PauseReason, i64, Option<String>)> {
        let text = sig.read_text("pause-reason")?;
        let mut lines = text.lines();
        let reason = PauseReason::parse(lines.next()?.trim())?;
        let resume_at: i64 = lines.next()?.trim().parse().ok()?;
        let human = lines.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Some((reason, resume_at, human))
    }

    /// Writes the `pause` signal plus a `pause-reason` file (reason line,
    /// then the resume unix timestamp, then an optional human string).
    /// `resume_at` must be strictly in the future — invariant 7 forbids a
    /// pause that is immediately resumable.
    fn create_pause(&self, reason: PauseReason, resume_at: i64, human: Option<&str>) -> Result<(), AgentLoopError> {
        let sig = self.signals();
        sig.set("pause")?;
        let mut text = format!("{}\n{}\n", reason.as_str(), resume_at);
        if let Some(human) = human {
            text.push_str(human);
            text.push('\n');
        }
        sig.write_text("pause-reason", &text)?;
        Ok(())
    }

    fn notify_auto_merge(&self, instance_dir: &Path, action: &AutoMergeAction) -> Result<(), AgentLoopError> {
        let text = match action {
            AutoMergeAction::MergedLocally { branch } => format!("\u{1F500} merged {branch} locally."),
            AutoMergeAction::OpenedPullRequest { branch, url } => {
                format!("\u{1F500} opened a pull request for {branch}: {url}")
            }
        };
        outbox::append(instance_dir, &text)?;
        Ok(())
    }
}

fn today_string(now_unix: i64) -> String {
    koan_core::time_fmt::format_unix(now_unix)[..10].to_string()
}

#[cfg(test)]
#[path = "agent_loop_tests.rs"]
mod tests;
