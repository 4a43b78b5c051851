//! CLI smoke tests for relkit.
//!
//! These tests verify that the commands parse their arguments and fail
//! cleanly on bad input, without needing a toolchain.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the relkit binary.
fn relkit_cmd() -> Command {
  cargo_bin_cmd!("relkit")
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  relkit_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  relkit_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("relkit"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &["build", "plan", "info"] {
    relkit_cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

#[test]
fn build_help_lists_container_options() {
  relkit_cmd()
    .args(["build", "--help"])
    .assert()
    .success()
    .stdout(predicate::str::contains("--docker"))
    .stdout(predicate::str::contains("--image-version"))
    .stdout(predicate::str::contains("--with-sanitizer"));
}

// =============================================================================
// Argument validation
// =============================================================================

#[test]
fn build_requires_output() {
  relkit_cmd()
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("--output"));
}

#[test]
fn malformed_arch_is_rejected() {
  relkit_cmd()
    .args(["plan", "--arch", "x86_64"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid architecture"));
}

#[test]
fn unknown_sanitizer_is_rejected() {
  relkit_cmd()
    .args(["plan", "--with-sanitizer", "leak"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown sanitizer"));
}

#[test]
fn unknown_build_type_is_rejected() {
  relkit_cmd()
    .args(["plan", "--build-type", "Fast"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown build type"));
}

#[test]
fn unsafe_product_name_is_rejected() {
  relkit_cmd()
    .args(["plan", "--name", "foo;rm -rf"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid product name"));
}

// =============================================================================
// info
// =============================================================================

#[test]
fn info_shows_directories() {
  let temp = TempDir::new().unwrap();

  relkit_cmd()
    .arg("info")
    .arg("--work-dir")
    .arg(temp.path())
    .env_remove("RELKIT_BUILDER_DIR")
    .assert()
    .success()
    .stdout(predicate::str::contains("Work dir"))
    .stdout(predicate::str::contains("docker/builder"));
}
