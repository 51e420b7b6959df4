//! Integration tests for the CLI surface: help, version, argument parsing.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

pub fn kitchen() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("kitchen-ssh"));
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("KITCHEN_SSH_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    // clap with arg_required_else_help shows help on stderr and exits 2
    kitchen()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Drive instances over SSH"));
}

#[test]
fn test_cli_help_lists_lifecycle_commands() {
    kitchen()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("converge"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("destroy"));
}

#[test]
fn test_cli_version_flag_shows_version() {
    kitchen()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(concat!(
            "kitchen-ssh ",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_exec_requires_a_command() {
    kitchen()
        .arg("exec")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_unknown_subcommand_fails() {
    kitchen()
        .arg("provision")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
