// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn renders_plain_commands_as_slash_text() {
    assert_eq!(to_slash_text(Command::Stop), "/stop");
    assert_eq!(to_slash_text(Command::Pause), "/pause");
    assert_eq!(to_slash_text(Command::Resume), "/resume");
    assert_eq!(to_slash_text(Command::Status), "/status");
    assert_eq!(to_slash_text(Command::Ping), "/ping");
    assert_eq!(to_slash_text(Command::Usage), "/usage");
    assert_eq!(to_slash_text(Command::Verbose), "/verbose");
    assert_eq!(to_slash_text(Command::Silent), "/silent");
}

#[test]
fn renders_chat_and_reflect_with_joined_text() {
    assert_eq!(
        to_slash_text(Command::Chat { text: vec!["how's".to_string(), "it".to_string(), "going?".to_string()] }),
        "/chat how's it going?"
    );
    assert_eq!(
        to_slash_text(Command::Reflect { text: vec!["worth".to_string(), "noting".to_string()] }),
        "/reflect worth noting"
    );
}

#[test]
fn renders_log_with_optional_project_and_date() {
    assert_eq!(to_slash_text(Command::Log { project: None, date: None }), "/log");
    assert_eq!(
        to_slash_text(Command::Log { project: Some("koan".to_string()), date: None }),
        "/log koan"
    );
    assert_eq!(
        to_slash_text(Command::Log { project: Some("koan".to_string()), date: Some("2026-01-05".to_string()) }),
        "/log koan 2026-01-05"
    );
}

#[test]
fn cli_parses_mission_add_with_urgent_flag() {
    let cli = Cli::try_parse_from(["koan", "mission", "add", "--urgent", "fix", "the", "bug"]).unwrap();
    match cli.command {
        Command::Mission(commands::MissionCommand::Add { text, urgent }) => {
            assert!(urgent);
            assert_eq!(text, vec!["fix", "the", "bug"]);
        }
        _ => panic!("expected Mission(Add)"),
    }
}

#[test]
fn cli_parses_idea_promote_all() {
    let cli = Cli::try_parse_from(["koan", "idea", "promote-all"]).unwrap();
    assert!(matches!(cli.command, Command::Idea(commands::IdeaCommand::PromoteAll)));
}
