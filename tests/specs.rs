//! Behavioral specifications for the `koan` CLI against a fresh instance
//! directory: black-box tests that invoke the binary and check its effect
//! on `missions.md` / signal files / stdout, the way
//! `examples/groblegark-oddjobs/tests/specs.rs` checks `oj` against `ojd`.
//!
//! These exercise `spec.md` §8's literal scenarios (S1-S3 here; S4/S6 are
//! unit-tested in `koan-engine` where a `FakeClock`/`FakeWorkerCli` is
//! available, S5 in `koan-engine::bridge_tests`) end to end through the CLI
//! binary rather than library calls, and the boundary behaviors that are
//! observable at the CLI surface (unknown project, empty Pending cancel).

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/cli_help.rs"]
mod cli_help;
#[path = "specs/mission_lifecycle.rs"]
mod mission_lifecycle;
#[path = "specs/idea_backlog.rs"]
mod idea_backlog;
#[path = "specs/signals.rs"]
mod signals;
