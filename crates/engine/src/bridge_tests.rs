// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use koan_adapters::FakeChatTransport;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn classifies_slash_prefixed_text_as_command() {
    assert_eq!(classify("/status"), Classification::Command);
    assert_eq!(classify("  /ping"), Classification::Command);
}

#[test]
fn classifies_explicit_mission_prefix_regardless_of_length() {
    let long = format!("mission: {}", "x".repeat(500));
    assert_eq!(classify(&long), Classification::Mission);
    assert_eq!(classify("mission: fix it"), Classification::Mission);
}

#[test]
fn classifies_short_imperative_text_as_mission() {
    assert_eq!(classify("fix the login bug"), Classification::Mission);
    assert_eq!(classify("implement dark mode"), Classification::Mission);
}

#[test]
fn classifies_long_imperative_text_as_mission_too() {
    let long = format!("refactor {}", "the widget layer ".repeat(30));
    assert!(long.len() > 200);
    assert_eq!(classify(&long), Classification::Mission);
}

#[test]
fn classifies_bare_non_verb_text_as_chat() {
    assert_eq!(classify("fix"), Classification::Chat);
    assert_eq!(classify("how's it going?"), Classification::Chat);
}

#[tokio::test]
async fn tick_dispatches_updates_and_advances_offset() {
    let dir = tempdir().unwrap();
    let transport = Arc::new(FakeChatTransport::default());
    transport.push_update(1, "mission: fix the bug", 42);
    transport.push_update(2, "hey there", 42);

    let poller = BridgePoller::new(transport.clone(), dir.path().to_path_buf(), Duration::from_secs(3));

    let mut seen = Vec::new();
    poller.tick(|classification, text, _chat_id| seen.push((classification, text.to_string()))).await.unwrap();

    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], (Classification::Mission, "mission: fix the bug".to_string()));
    assert_eq!(seen[1], (Classification::Chat, "hey there".to_string()));

    // A second tick with nothing new queued sees nothing.
    let mut seen_again = Vec::new();
    poller.tick(|c, t, _chat_id| seen_again.push((c, t.to_string()))).await.unwrap();
    assert!(seen_again.is_empty());
}

#[tokio::test]
async fn tick_flushes_queued_outbox_message() {
    let dir = tempdir().unwrap();
    koan_storage::outbox::append(dir.path(), "status: all good").unwrap();

    let transport = Arc::new(FakeChatTransport::default());
    let poller = BridgePoller::new(transport.clone(), dir.path().to_path_buf(), Duration::from_secs(3));

    poller.tick(|_, _, _| {}).await.unwrap();

    assert_eq!(transport.sent_messages(), vec!["status: all good".to_string()]);
}

#[tokio::test]
async fn tick_retries_outbox_flush_after_send_failure() {
    let dir = tempdir().unwrap();
    koan_storage::outbox::append(dir.path(), "status: retry me").unwrap();

    let transport = Arc::new(FakeChatTransport::default());
    transport.fail_next_sends(true);
    let poller = BridgePoller::new(transport.clone(), dir.path().to_path_buf(), Duration::from_secs(3));

    poller.tick(|_, _, _| {}).await.unwrap();
    assert!(transport.sent_messages().is_empty());

    transport.fail_next_sends(false);
    poller.tick(|_, _, _| {}).await.unwrap();
    assert_eq!(transport.sent_messages(), vec!["status: retry me".to_string()]);
}
