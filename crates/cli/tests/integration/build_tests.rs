//! Build command integration tests.
//!
//! These stop before the native toolchain runs, so they need neither cmake
//! nor a container runtime.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn build_missing_profile_fails_before_staging() {
  let env = TestEnv::new();
  let output = env.output_path();

  env
    .relkit_cmd()
    .args(["build", "--profile", "nightly", "--output"])
    .arg(&output)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to compose configuration"))
    .stderr(predicate::str::contains("profile 'nightly' not found"));

  assert!(!output.exists());
}

#[test]
fn build_outside_repository_fails() {
  let env = TestEnv::new();

  env
    .relkit_cmd()
    .arg("build")
    .arg("--output")
    .arg(env.output_path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed to read version metadata"));

  assert!(!env.path("build").exists());
}

#[test]
fn build_honours_work_dir_flag() {
  let env = TestEnv::new();
  let other = env.temp.path().join("elsewhere");
  std::fs::create_dir_all(&other).unwrap();

  env
    .relkit_cmd()
    .args(["build", "--work-dir"])
    .arg(&other)
    .arg("--output")
    .arg(env.output_path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("elsewhere"));
}
