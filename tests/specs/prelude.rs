//! Test helpers for the `koan` CLI's black-box specs.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use assert_cmd::cargo::CommandCargoExt;

/// An isolated `KOAN_ROOT` for one test: `instance/missions.md` plus
/// whatever signal files a test writes directly.
pub struct Instance {
    root: tempfile::TempDir,
}

impl Instance {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(root.path().join("instance")).expect("mkdir instance");
        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn instance_dir(&self) -> PathBuf {
        self.root.path().join("instance")
    }

    pub fn missions_path(&self) -> PathBuf {
        self.instance_dir().join("missions.md")
    }

    pub fn write_missions(&self, content: &str) {
        std::fs::write(self.missions_path(), content).expect("write missions.md");
    }

    pub fn read_missions(&self) -> String {
        std::fs::read_to_string(self.missions_path()).unwrap_or_default()
    }

    pub fn signal_path(&self, name: &str) -> PathBuf {
        self.root.path().join(format!(".koan-{name}"))
    }

    pub fn write_signal(&self, name: &str, content: &str) {
        std::fs::write(self.signal_path(name), content).expect("write signal file");
    }

    pub fn signal_set(&self, name: &str) -> bool {
        self.signal_path(name).exists()
    }

    /// A `koan` invocation scoped to this instance's root.
    pub fn koan(&self) -> CliBuilder {
        CliBuilder::new(self.root.path().to_path_buf())
    }
}

pub struct CliBuilder {
    root: PathBuf,
    args: Vec<String>,
}

impl CliBuilder {
    fn new(root: PathBuf) -> Self {
        Self { root, args: Vec::new() }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    fn command(self) -> Command {
        let mut cmd = Command::cargo_bin("koan").expect("koan binary built");
        cmd.args(&self.args);
        cmd.env("KOAN_ROOT", &self.root);
        cmd.env_remove("KOAN_PROJECTS");
        cmd.env_remove("KOAN_PROJECT_PATH");
        cmd
    }

    pub fn passes(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            output.status.success(),
            "expected success, got {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    pub fn fails(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected failure, but it passed\nstdout: {}",
            String::from_utf8_lossy(&output.stdout)
        );
        RunAssert { output }
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(expected), "stdout does not contain {expected:?}\nstdout: {stdout}");
        self
    }

    /// Exact stdout match with a diff on failure. Prefer this for specs
    /// pinning a full rendered reply rather than a substring.
    pub fn stdout_eq(self, expected: &str) -> Self {
        let stdout = self.stdout();
        similar_asserts::assert_eq!(stdout.trim_end(), expected);
        self
    }
}
