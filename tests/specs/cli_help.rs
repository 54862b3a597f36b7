//! Basic CLI surface: help/version never touch `KOAN_ROOT`.

use assert_cmd::cargo::CommandCargoExt;

use crate::prelude::Instance;

#[test]
fn koan_help_shows_usage() {
    let instance = Instance::new();
    instance.koan().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn koan_version_shows_version() {
    let instance = Instance::new();
    instance.koan().args(&["--version"]).passes().stdout_has("koan");
}

#[test]
fn koan_without_koan_root_fails_misconfigured() {
    let mut cmd = std::process::Command::cargo_bin("koan").expect("koan binary built");
    cmd.args(["status"]).env_remove("KOAN_ROOT");
    let output = cmd.output().expect("command should run");
    assert!(!output.status.success());
}
