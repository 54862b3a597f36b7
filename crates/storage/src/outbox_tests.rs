// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn flush_on_empty_outbox_is_noop() {
    let dir = tempdir().unwrap();
    let sent = flush(dir.path(), |_| true).unwrap();
    assert!(!sent);
}

#[test]
fn flush_sends_and_truncates_on_success() {
    let dir = tempdir().unwrap();
    append(dir.path(), "hello there").unwrap();
    let mut seen = None;
    let sent = flush(dir.path(), |text| {
        seen = Some(text.to_string());
        true
    })
    .unwrap();
    assert!(sent);
    assert_eq!(seen.unwrap(), "hello there");

    let content = std::fs::read_to_string(outbox_path(dir.path())).unwrap();
    assert!(content.is_empty());
}

#[test]
fn flush_preserves_content_on_send_failure() {
    let dir = tempdir().unwrap();
    append(dir.path(), "retry me").unwrap();
    let sent = flush(dir.path(), |_| false).unwrap();
    assert!(!sent);

    let content = std::fs::read_to_string(outbox_path(dir.path())).unwrap();
    assert!(content.contains("retry me"));

    // A subsequent flush still finds the message and can succeed.
    let sent_again = flush(dir.path(), |_| true).unwrap();
    assert!(sent_again);
}

#[test]
fn append_accumulates_multiple_lines() {
    let dir = tempdir().unwrap();
    append(dir.path(), "first").unwrap();
    append(dir.path(), "second").unwrap();
    let content = std::fs::read_to_string(outbox_path(dir.path())).unwrap();
    assert_eq!(content, "first\nsecond\n");
}
