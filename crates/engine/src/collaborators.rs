// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup collaborators and post-mission side collaborators: a grab-bag of
//! best-effort, independently replaceable behaviors the agent loop runs
//! around the core mission cycle. Each has a real implementation (a
//! subprocess spawn, a git/PR check) and a fake/no-op default, mirroring the
//! adapter traits in `koan-adapters`.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("collaborator failed: {0}")]
    Failed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A best-effort step run once at startup, in sequence. Failures are logged
/// and swallowed by the caller — none of these are allowed to abort startup.
#[async_trait]
pub trait StartupCollaborator: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self) -> Result<(), CollaboratorError>;
}

/// Time-of-day-gated best-effort subprocess, for the morning/evening
/// rituals. The evening ritual runs immediately before a `max_runs` pause;
/// the morning ritual runs once per day at startup if the configured hour
/// has passed.
#[async_trait]
pub trait RitualRunner: Send + Sync {
    async fn run_morning(&self) -> Result<(), CollaboratorError>;
    async fn run_evening(&self) -> Result<(), CollaboratorError>;
}

/// Spawns a configured subprocess for each ritual, detached, ignoring its
/// exit status beyond logging.
pub struct ProcessRitualRunner {
    pub morning_cmd: Option<(String, Vec<String>)>,
    pub evening_cmd: Option<(String, Vec<String>)>,
}

#[async_trait]
impl RitualRunner for ProcessRitualRunner {
    async fn run_morning(&self) -> Result<(), CollaboratorError> {
        run_detached(&self.morning_cmd).await
    }

    async fn run_evening(&self) -> Result<(), CollaboratorError> {
        run_detached(&self.evening_cmd).await
    }
}

async fn run_detached(cmd: &Option<(String, Vec<String>)>) -> Result<(), CollaboratorError> {
    let Some((binary, args)) = cmd else {
        return Ok(());
    };
    tokio::process::Command::new(binary)
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| CollaboratorError::Failed(e.to_string()))?;
    Ok(())
}

#[derive(Default)]
pub struct NoOpRitualRunner;

#[async_trait]
impl RitualRunner for NoOpRitualRunner {
    async fn run_morning(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    async fn run_evening(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeRitualRunner {
    pub morning_calls: std::sync::atomic::AtomicUsize,
    pub evening_calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl RitualRunner for FakeRitualRunner {
    async fn run_morning(&self) -> Result<(), CollaboratorError> {
        self.morning_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn run_evening(&self) -> Result<(), CollaboratorError> {
        self.evening_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

/// Output of a skill mission run directly as a subprocess, bypassing the
/// worker CLI.
#[derive(Debug, Clone)]
pub struct SkillResult {
    pub exit_code: i32,
    pub stdout_path: std::path::PathBuf,
    pub stderr_path: std::path::PathBuf,
}

/// Routes a recognized slash-command mission to a direct subprocess runner
/// instead of the worker CLI.
#[async_trait]
pub trait SkillDispatcher: Send + Sync {
    fn is_skill_mission(&self, text: &str) -> bool;
    async fn dispatch(&self, text: &str, cwd: &Path) -> Option<SkillResult>;
}

/// Recognizes the same `/`-prefixed command namespace the bridge accepts,
/// and runs the matching skill binary with a 600-second timeout.
pub struct ProcessSkillDispatcher {
    pub skill_bin: String,
    pub timeout: std::time::Duration,
}

impl Default for ProcessSkillDispatcher {
    fn default() -> Self {
        Self {
            skill_bin: "koan-skill".to_string(),
            timeout: std::time::Duration::from_secs(600),
        }
    }
}

const SKILL_COMMANDS: &[&str] = &[
    "/stop", "/pause", "/resume", "/status", "/ping", "/usage", "/help", "/verbose", "/silent",
    "/chat", "/mission", "/idea", "/reflect", "/sparring", "/log", "/journal",
];

#[async_trait]
impl SkillDispatcher for ProcessSkillDispatcher {
    fn is_skill_mission(&self, text: &str) -> bool {
        let trimmed = text.trim_start();
        SKILL_COMMANDS.iter().any(|c| trimmed.starts_with(c))
    }

    async fn dispatch(&self, text: &str, cwd: &Path) -> Option<SkillResult> {
        if !self.is_skill_mission(text) {
            return None;
        }
        let stdout_path = cwd.join(".koan-skill.out");
        let stderr_path = cwd.join(".koan-skill.err");
        let stdout = std::fs::File::create(&stdout_path).ok()?;
        let stderr = std::fs::File::create(&stderr_path).ok()?;
        let child = tokio::process::Command::new(&self.skill_bin)
            .arg(text)
            .current_dir(cwd)
            .stdin(std::process::Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .ok()?;
        let status = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .ok()?
            .ok()?;
        Some(SkillResult {
            exit_code: status.status.code().unwrap_or(-1),
            stdout_path,
            stderr_path,
        })
    }
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeSkillDispatcher {
    pub recognized_prefixes: Vec<String>,
    pub scripted: Option<SkillResult>,
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl SkillDispatcher for FakeSkillDispatcher {
    fn is_skill_mission(&self, text: &str) -> bool {
        self.recognized_prefixes.iter().any(|p| text.trim_start().starts_with(p.as_str()))
    }

    async fn dispatch(&self, text: &str, _cwd: &Path) -> Option<SkillResult> {
        if !self.is_skill_mission(text) {
            return None;
        }
        self.scripted.clone()
    }
}

/// What to do after a mission leaves a project on an auto-merge-eligible
/// branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoMergeAction {
    MergedLocally { branch: String },
    OpenedPullRequest { branch: String, url: String },
}

/// Checks whether a project directory is sitting on a branch matching a
/// configured auto-merge prefix with no uncommitted changes, and if so
/// performs (or requests) the merge/PR flow. The concrete git/hosting
/// implementation is external; this crate only defines the contract.
#[async_trait]
pub trait AutoMergeChecker: Send + Sync {
    async fn check(&self, project_path: &Path) -> Result<Option<AutoMergeAction>, CollaboratorError>;
}

#[derive(Default)]
pub struct NoOpAutoMergeChecker;

#[async_trait]
impl AutoMergeChecker for NoOpAutoMergeChecker {
    async fn check(&self, _project_path: &Path) -> Result<Option<AutoMergeAction>, CollaboratorError> {
        Ok(None)
    }
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeAutoMergeChecker {
    pub scripted: Option<AutoMergeAction>,
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl AutoMergeChecker for FakeAutoMergeChecker {
    async fn check(&self, _project_path: &Path) -> Result<Option<AutoMergeAction>, CollaboratorError> {
        Ok(self.scripted.clone())
    }
}

/// A cron-like external module of recurring mission templates. Checked once
/// per iteration before planning; if a template is due, its text is inserted
/// into Pending as a side effect and returned for logging.
#[async_trait]
pub trait RecurringInjector: Send + Sync {
    async fn due_template(&self, now_unix: i64) -> Option<String>;
}

#[derive(Default)]
pub struct NoOpRecurringInjector;

#[async_trait]
impl RecurringInjector for NoOpRecurringInjector {
    async fn due_template(&self, _now_unix: i64) -> Option<String> {
        None
    }
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeRecurringInjector {
    pub scripted: Option<String>,
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl RecurringInjector for FakeRecurringInjector {
    async fn due_template(&self, _now_unix: i64) -> Option<String> {
        self.scripted.clone()
    }
}

/// Scans a worker invocation's combined stdout+stderr for signs the
/// external LLM quota has been exhausted. `spec.md` §1/§7 explicitly leaves
/// the grammar external; this trait is the seam, not an implementation of
/// that grammar.
pub trait QuotaDetector: Send + Sync {
    fn exhausted(&self, combined_output: &str) -> bool;
}

/// Conservative default: looks for a small set of phrases real CLI tools
/// tend to emit on rate-limit/quota errors. Never a complete grammar — an
/// operator wiring up a specific worker CLI should supply their own.
#[derive(Default)]
pub struct PhraseQuotaDetector {
    pub phrases: Vec<String>,
}

impl PhraseQuotaDetector {
    pub fn default_phrases() -> Self {
        Self {
            phrases: vec![
                "quota exceeded".to_string(),
                "rate limit".to_string(),
                "usage limit reached".to_string(),
            ],
        }
    }
}

impl QuotaDetector for PhraseQuotaDetector {
    fn exhausted(&self, combined_output: &str) -> bool {
        let lower = combined_output.to_ascii_lowercase();
        self.phrases.iter().any(|p| lower.contains(p.as_str()))
    }
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeQuotaDetector {
    pub scripted: bool,
}

#[cfg(any(test, feature = "test-support"))]
impl QuotaDetector for FakeQuotaDetector {
    fn exhausted(&self, _combined_output: &str) -> bool {
        self.scripted
    }
}

/// Commits the instance directory's own state (missions.md, usage state,
/// journal) to its tracking repository, if any. `spec.md` §1 excludes git
/// tooling from the core's scope beyond this contract; the default no-op
/// implementation is correct for an instance directory that isn't version
/// controlled at all.
#[async_trait]
pub trait InstanceCommitter: Send + Sync {
    async fn commit(&self, instance_dir: &Path, message: &str) -> Result<(), CollaboratorError>;
}

#[derive(Default)]
pub struct NoOpInstanceCommitter;

#[async_trait]
impl InstanceCommitter for NoOpInstanceCommitter {
    async fn commit(&self, _instance_dir: &Path, _message: &str) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeInstanceCommitter {
    pub messages: parking_lot::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl InstanceCommitter for FakeInstanceCommitter {
    async fn commit(&self, _instance_dir: &Path, message: &str) -> Result<(), CollaboratorError> {
        self.messages.lock().push(message.to_string());
        Ok(())
    }
}

/// Periodic fetch + fast-forward for a single project's working tree, run
/// every `KOAN_GIT_SYNC_INTERVAL` iterations by the agent loop and once per
/// project at startup. Best-effort, like every other collaborator here.
#[async_trait]
pub trait ProjectGitSync: Send + Sync {
    async fn sync(&self, project_path: &Path) -> Result<(), CollaboratorError>;
}

#[derive(Default)]
pub struct NoOpProjectGitSync;

#[async_trait]
impl ProjectGitSync for NoOpProjectGitSync {
    async fn sync(&self, _project_path: &Path) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeProjectGitSync {
    pub synced: parking_lot::Mutex<Vec<std::path::PathBuf>>,
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl ProjectGitSync for FakeProjectGitSync {
    async fn sync(&self, project_path: &Path) -> Result<(), CollaboratorError> {
        self.synced.lock().push(project_path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
#[path = "collaborators_tests.rs"]
mod tests;
