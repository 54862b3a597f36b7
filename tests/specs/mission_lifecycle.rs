//! `spec.md` §8 scenarios S1 and S3, driven through the `koan` CLI instead
//! of calling `koan-storage` directly.

use crate::prelude::Instance;

/// S1 — mission round trip: add, start, complete.
#[test]
fn mission_round_trip_add_start_complete() {
    let instance = Instance::new();

    instance
        .koan()
        .args(&["mission", "add", "[project:default]", "Fix", "login", "bug"])
        .passes()
        .stdout_has("mission queued.");

    instance.koan().args(&["mission", "start", "Fix", "login", "bug"]).passes();
    instance.koan().args(&["mission", "complete", "Fix", "login", "bug"]).passes();

    let content = instance.read_missions();
    assert!(content.contains("## Done"));
    let done_section = content.split("## Done").nth(1).expect("Done section present");
    assert!(done_section.contains("- [project:default] Fix login bug"));
    assert!(done_section.contains("\u{2705} ("));

    assert!(!content.contains("## Pending\n\n-"));
    let in_progress = content.split("## In Progress").nth(1).unwrap();
    let in_progress_block = in_progress.split("## Done").next().unwrap();
    assert!(!in_progress_block.trim().contains("- "));
}

/// S3 — starting a new mission flushes any stale In Progress item to Done
/// untouched, then moves the new one up.
#[test]
fn starting_a_mission_flushes_stale_in_progress_to_done() {
    let instance = Instance::new();
    instance.write_missions(
        "# Missions\n\n## Ideas\n\n## Pending\n\n- [project:default] new task\n\n## In Progress\n\n- [project:default] stale task\n\n## Done\n\n## Failed\n",
    );

    instance.koan().args(&["mission", "start", "new", "task"]).passes();

    let content = instance.read_missions();
    let in_progress = content.split("## In Progress").nth(1).unwrap();
    let in_progress_block = in_progress.split("## Done").next().unwrap();
    assert!(in_progress_block.contains("- [project:default] new task"));
    assert!(!in_progress_block.contains("stale task"));

    let done = content.split("## Done").nth(1).unwrap();
    let done_block = done.split("## Failed").next().unwrap();
    assert!(done_block.contains("- [project:default] stale task"));
    assert!(!done_block.contains("\u{2705}"), "flushed stale items carry no completion marker");
}

#[test]
fn mission_add_rejects_unknown_project_tag() {
    let instance = Instance::new();
    let reply = instance
        .koan()
        .args(&["mission", "add", "[project:nope]", "do", "something"])
        .passes();
    reply.stdout_has("unknown project");

    let content = instance.read_missions();
    assert!(!content.contains("do something"));
}

#[test]
fn mission_list_shows_counts_for_every_section() {
    let instance = Instance::new();
    instance.koan().args(&["mission", "add", "write", "the", "quarterly", "report"]).passes();

    instance.koan().args(&["mission", "list"]).passes().stdout_eq(
        "pending (1):\n  1. - write the quarterly report\nin progress (0):\ndone (0):\nfailed (0):",
    );
}

#[test]
fn mission_cancel_on_empty_pending_fails() {
    let instance = Instance::new();
    instance.koan().args(&["mission", "cancel", "anything"]).fails();
}

#[test]
fn mission_add_with_trailing_now_flag_is_queued_urgent_and_stripped() {
    let instance = Instance::new();
    instance.koan().args(&["mission", "add", "ship", "it", "--now"]).passes().stdout_has("urgent");

    let content = instance.read_missions();
    assert!(content.contains("- ship it"));
    assert!(!content.contains("--now"));
}
