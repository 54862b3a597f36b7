//! `/stop`, `/pause`, `/resume` via the CLI, observed as signal files on
//! disk the way `koand`'s agent loop would observe them.

use crate::prelude::Instance;

#[test]
fn stop_sets_the_stop_signal_file() {
    let instance = Instance::new();
    assert!(!instance.signal_set("stop"));

    instance.koan().args(&["stop"]).passes().stdout_has("stop");
    assert!(instance.signal_set("stop"));
}

#[test]
fn pause_then_resume_round_trips_the_pause_signal() {
    let instance = Instance::new();

    instance.koan().args(&["pause"]).passes();
    assert!(instance.signal_set("pause"));
    assert_eq!(
        std::fs::read_to_string(instance.signal_path("pause-reason")).unwrap_or_default(),
        "manual"
    );

    instance
        .koan()
        .args(&["resume"])
        .passes()
        .stdout_has("resumed.");
    assert!(!instance.signal_set("pause"));
    assert!(!instance.signal_set("pause-reason"));
}

#[test]
fn pausing_twice_reports_already_paused() {
    let instance = Instance::new();
    instance.koan().args(&["pause"]).passes();
    instance
        .koan()
        .args(&["pause"])
        .passes()
        .stdout_has("already paused");
}

#[test]
fn resume_without_a_pause_is_a_harmless_no_op() {
    let instance = Instance::new();
    instance
        .koan()
        .args(&["resume"])
        .passes()
        .stdout_has("not paused.");
    assert!(!instance.signal_set("pause"));
}

#[test]
fn ping_reports_both_processes_as_not_running_when_no_pidfile_exists() {
    let instance = Instance::new();
    let reply = instance.koan().args(&["ping"]).passes();
    let stdout = reply.stdout();
    assert!(stdout.contains("\u{1f534} agent loop"));
    assert!(stdout.contains("\u{1f534} bridge"));
}
