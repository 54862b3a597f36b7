// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn entry(role: Role, text: &str, ts: i64) -> ChatEntry {
    ChatEntry {
        role,
        text: text.to_string(),
        ts,
    }
}

#[test]
fn append_and_read_all_round_trips() {
    let dir = tempdir().unwrap();
    append(dir.path(), &entry(Role::User, "hi", 1)).unwrap();
    append(dir.path(), &entry(Role::Assistant, "hello", 2)).unwrap();

    let all = read_all(dir.path());
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].text, "hi");
    assert_eq!(all[1].role, Role::Assistant);
}

#[test]
fn recent_returns_tail_in_order() {
    let dir = tempdir().unwrap();
    for i in 0..5 {
        append(dir.path(), &entry(Role::User, &format!("msg{i}"), i)).unwrap();
    }
    let last_two = recent(dir.path(), 2);
    assert_eq!(last_two.len(), 2);
    assert_eq!(last_two[0].text, "msg3");
    assert_eq!(last_two[1].text, "msg4");
}

#[test]
fn compaction_collapses_old_entries_by_day() {
    let dir = tempdir().unwrap();
    // Two entries on the same old day.
    append(dir.path(), &entry(Role::User, "old 1", 1_700_000_000)).unwrap();
    append(dir.path(), &entry(Role::Assistant, "old 2", 1_700_000_050)).unwrap();
    // One recent entry, after the cutoff.
    append(dir.path(), &entry(Role::User, "fresh", 1_800_000_000)).unwrap();

    compact_at_startup(dir.path(), 1_750_000_000).unwrap();

    let all = read_all(dir.path());
    assert_eq!(all.len(), 2);
    assert!(all[0].text.contains("2 messages"));
    assert_eq!(all[1].text, "fresh");
}

#[test]
fn compaction_with_no_old_entries_is_noop() {
    let dir = tempdir().unwrap();
    append(dir.path(), &entry(Role::User, "fresh", 1_800_000_000)).unwrap();
    compact_at_startup(dir.path(), 1_000).unwrap();
    assert_eq!(read_all(dir.path()).len(), 1);
}
