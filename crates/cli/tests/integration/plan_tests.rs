//! Plan command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn plan_missing_profile_fails() {
  let env = TestEnv::new();

  env
    .relkit_cmd()
    .args(["plan", "--profile", "nightly"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("profile 'nightly' not found"));
}

#[test]
fn plan_rejects_profile_paths() {
  let env = TestEnv::new();

  env
    .relkit_cmd()
    .args(["plan", "--profile", "../default"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid profile name"));
}

#[test]
fn plan_outside_repository_fails() {
  let env = TestEnv::new();

  env
    .relkit_cmd()
    .arg("plan")
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed to read version metadata"));
}

#[test]
fn plan_prints_settings_and_commands() {
  if !TestEnv::has_git() {
    return;
  }
  let env = TestEnv::new();
  env.init_repo();

  env
    .relkit_cmd()
    .args(["plan", "--arch", "linux-aarch64", "--build-jobs", "8"])
    .assert()
    .success()
    .stdout(predicate::str::contains("-DENABLE_CLICKHOUSE_ALL=ON"))
    .stdout(predicate::str::contains("toolchain-aarch64.cmake"))
    .stdout(predicate::str::contains("ninja -j8 clickhouse-bundle"));
}

#[test]
fn plan_json_is_machine_readable() {
  if !TestEnv::has_git() {
    return;
  }
  let env = TestEnv::new();
  env.init_repo();

  let output = env
    .relkit_cmd()
    .args(["plan", "--json", "--with-sanitizer", "memory", "--package"])
    .output()
    .unwrap();
  assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

  let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let config = &plan["configuration"];
  assert_eq!(config["-DENABLE_CLICKHOUSE_ALL"], "OFF");
  assert_eq!(config["-DENABLE_CLICKHOUSE_SERVER"], "ON");
  assert_eq!(config["-DSANITIZE"], "memory");
  assert_eq!(config["-DENABLE_TESTS"], "OFF");
  assert_eq!(config["-DVERSION_GITHASH"].as_str().unwrap().len(), 40);

  let configure = plan["commands"]["configure"].as_str().unwrap();
  assert!(configure.starts_with("LD_LIBRARY_PATH="));
  assert!(configure.contains("cmake --debug-trycompile"));
  assert!(configure.ends_with(" .."));
}
