// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access, shared by `koand`, `koan-bridge`,
//! and `koan`. No dotenv parsing or banner printing — callers that want a
//! `.env` file load it before calling [`Config::load`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// Resolved configuration common to the agent loop and the bridge.
#[derive(Debug, Clone)]
pub struct Config {
    /// `KOAN_ROOT` — root directory holding signal files and projects.
    pub koan_root: PathBuf,
    /// `KOAN_INSTANCE_DIR`, default `$KOAN_ROOT/instance`.
    pub instance_dir: PathBuf,
    /// `KOAN_PROJECT_PATH`, optional current-project override.
    pub project_path: Option<PathBuf>,
    /// `KOAN_PROJECTS`, the ordered project list the planner round-robins
    /// through. Defaults to a single project named `default`.
    pub projects: Vec<String>,
    /// Working directory for each configured project, keyed by name.
    /// Entries absent here fall back to `$KOAN_ROOT/<name>`.
    pub project_paths: HashMap<String, PathBuf>,
    /// `KOAN_WORKER_BIN`, default `claude`.
    pub worker_bin: String,
    /// `KOAN_MAX_RUNS`, unset means unbounded.
    pub max_runs: Option<u64>,
    /// `KOAN_GIT_SYNC_INTERVAL`, default 10 runs.
    pub git_sync_interval: u64,
    /// `KOAN_LOG_DIR`, default `$KOAN_ROOT/logs`.
    pub log_dir: PathBuf,
    /// `KOAN_LOG_LEVEL`, default `info`.
    pub log_level: String,
}

impl Config {
    /// Load the configuration shared by the agent loop and the CLI.
    /// Requires `KOAN_ROOT` to be set.
    pub fn load() -> Result<Self, CoreError> {
        let koan_root = env_path("KOAN_ROOT").ok_or(CoreError::MissingEnv("KOAN_ROOT"))?;

        let instance_dir =
            env_path("KOAN_INSTANCE_DIR").unwrap_or_else(|| koan_root.join("instance"));
        let log_dir = env_path("KOAN_LOG_DIR").unwrap_or_else(|| koan_root.join("logs"));
        let project_path = env_path("KOAN_PROJECT_PATH");

        let (projects, project_paths) = parse_projects(
            std::env::var("KOAN_PROJECTS").ok().as_deref(),
            project_path.as_deref(),
        );

        Ok(Self {
            project_path,
            projects,
            project_paths,
            worker_bin: std::env::var("KOAN_WORKER_BIN").unwrap_or_else(|_| "claude".to_string()),
            max_runs: std::env::var("KOAN_MAX_RUNS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok()),
            git_sync_interval: std::env::var("KOAN_GIT_SYNC_INTERVAL")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(10),
            log_level: std::env::var("KOAN_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            koan_root,
            instance_dir,
            log_dir,
        })
    }
}

/// Parses `KOAN_PROJECTS` as a comma-separated list of `name` or `name=path`
/// entries. With no variable set, falls back to a single project named
/// `default`, pointed at `KOAN_PROJECT_PATH` if given.
fn parse_projects(raw: Option<&str>, project_path: Option<&std::path::Path>) -> (Vec<String>, HashMap<String, PathBuf>) {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        let mut paths = HashMap::new();
        if let Some(path) = project_path {
            paths.insert("default".to_string(), path.to_path_buf());
        }
        return (vec!["default".to_string()], paths);
    };

    let mut names = Vec::new();
    let mut paths = HashMap::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        match entry.split_once('=') {
            Some((name, path)) => {
                names.push(name.trim().to_string());
                paths.insert(name.trim().to_string(), PathBuf::from(path.trim()));
            }
            None => names.push(entry.to_string()),
        }
    }
    if names.is_empty() {
        names.push("default".to_string());
    }
    (names, paths)
}

/// Bridge-specific configuration (token/chat-id/poll-interval), loaded
/// separately since the CLI and the agent loop never need it.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub poll_interval: Duration,
    pub chat_timeout: Duration,
}

impl BridgeConfig {
    pub fn load() -> Result<Self, CoreError> {
        let telegram_token = std::env::var("KOAN_TELEGRAM_TOKEN")
            .map_err(|_| CoreError::MissingEnv("KOAN_TELEGRAM_TOKEN"))?;
        let telegram_chat_id = std::env::var("KOAN_TELEGRAM_CHAT_ID")
            .map_err(|_| CoreError::MissingEnv("KOAN_TELEGRAM_CHAT_ID"))?;

        let poll_interval = std::env::var("KOAN_BRIDGE_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(3));

        let chat_timeout = std::env::var("KOAN_CHAT_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(180));

        Ok(Self {
            telegram_token,
            telegram_chat_id,
            poll_interval,
            chat_timeout,
        })
    }

    /// First few and last four characters of the token, for startup logging
    /// without leaking the credential (`awake.py` prints a similar
    /// fingerprint, never the full secret).
    pub fn token_fingerprint(&self) -> String {
        fingerprint(&self.telegram_token)
    }
}

fn fingerprint(secret: &str) -> String {
    if secret.len() <= 8 {
        return "***".to_string();
    }
    format!("{}...{}", &secret[..4], &secret[secret.len() - 4..])
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().map(PathBuf::from)
}
