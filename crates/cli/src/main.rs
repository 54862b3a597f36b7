// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `koan` — the operator-facing CLI.
//!
//! Inspects and mutates the same on-disk state `koand` and `koan-bridge`
//! read and write (missions, signals, usage), without going through either
//! long-running process — the "IPC" here is the filesystem itself, per
//! `SPEC_FULL.md` §1. Commands that have a `/`-prefixed bridge equivalent
//! (`/stop`, `/status`, ...) are dispatched through the same
//! `koan_engine::commands::handle_command` the bridge uses, so the two
//! front-ends never drift. Mission/idea queue editing that has no chat
//! command (reorder, cancel, promote) lives in `commands.rs`.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use koan_core::clock::{Clock, SystemClock};
use koan_core::Config;
use koan_storage::missions::MissionsFile;
use koan_storage::{signals, UsageState};
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Config(#[from] koan_core::CoreError),

    #[error("{0}")]
    Missions(#[from] koan_storage::missions::MissionsError),

    #[error("{0}")]
    Command(#[from] koan_engine::commands::CommandError),

    #[error("{0}")]
    Usage(#[from] koan_storage::usage::UsageError),
}

#[derive(Parser)]
#[command(name = "koan", version, about = "Operator CLI for a koan agent-loop instance")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stop the agent loop after its current step.
    Stop,
    /// Pause the agent loop.
    Pause,
    /// Resume the agent loop from a pause.
    Resume,
    /// Runner mode, pause reason, and per-project pending/in-progress summary.
    Status,
    /// Process liveness of the agent loop and the bridge.
    Ping,
    /// Usage/quota report.
    Usage,
    /// Turn on forwarding every progress update through the outbox.
    Verbose,
    /// Turn off verbose outbox forwarding.
    Silent,
    /// Force the chat path for a message, bypassing mission classification.
    Chat {
        /// Message text.
        text: Vec<String>,
    },
    /// Record a journal reflection.
    Reflect {
        /// Reflection text.
        text: Vec<String>,
    },
    /// Look up a journal entry.
    Log {
        /// Project name, or a date if no project is given.
        project: Option<String>,
        /// `YYYY-MM-DD` or `yesterday`.
        date: Option<String>,
    },
    /// Mission queue operations.
    #[command(subcommand)]
    Mission(commands::MissionCommand),
    /// Idea backlog operations.
    #[command(subcommand)]
    Idea(commands::IdeaCommand),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("koan: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::load()?;
    let missions_path = config.instance_dir.join("missions.md");
    let mut missions = MissionsFile::from_path(&missions_path)?;
    let now_unix = SystemClock.now_unix();

    match cli.command {
        Command::Mission(cmd) => {
            let reply = commands::handle_mission(cmd, &config, &mut missions)?;
            missions.save(&missions_path)?;
            println!("{reply}");
            Ok(())
        }
        Command::Idea(cmd) => {
            let reply = commands::handle_idea(cmd, &mut missions)?;
            missions.save(&missions_path)?;
            println!("{reply}");
            Ok(())
        }
        other => {
            let text = to_slash_text(other);
            let usage = UsageState::load(&config.instance_dir)?;
            let run_pid_alive = signals::check_pidfile(&config.koan_root, "run").is_some();
            let bridge_pid_alive = signals::check_pidfile(&config.koan_root, "bridge").is_some();
            let ctx = koan_engine::commands::CommandContext {
                root: &config.koan_root,
                instance_dir: &config.instance_dir,
                projects: &config.projects,
                now_unix,
                run_pid_alive,
                bridge_pid_alive,
            };
            let outcome = koan_engine::commands::handle_command(&ctx, &mut missions, &usage, &text)?;
            missions.save(&missions_path)?;
            println!("{}", outcome.reply);
            Ok(())
        }
    }
}

/// Renders the remaining subcommands as the `/`-prefixed text
/// `handle_command` expects, keeping exactly one implementation of each of
/// these behaviors in the codebase.
fn to_slash_text(command: Command) -> String {
    match command {
        Command::Stop => "/stop".to_string(),
        Command::Pause => "/pause".to_string(),
        Command::Resume => "/resume".to_string(),
        Command::Status => "/status".to_string(),
        Command::Ping => "/ping".to_string(),
        Command::Usage => "/usage".to_string(),
        Command::Verbose => "/verbose".to_string(),
        Command::Silent => "/silent".to_string(),
        Command::Chat { text } => format!("/chat {}", text.join(" ")),
        Command::Reflect { text } => format!("/reflect {}", text.join(" ")),
        Command::Log { project, date } => {
            let mut parts = vec!["/log".to_string()];
            if let Some(p) = project {
                parts.push(p);
            }
            if let Some(d) = date {
                parts.push(d);
            }
            parts.join(" ")
        }
        Command::Mission(_) | Command::Idea(_) => unreachable!("handled before to_slash_text"),
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
