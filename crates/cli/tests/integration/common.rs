//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

pub const DEFAULT_PROFILE: &str = "\
# defaults shared by every build
-DENABLE_TESTS=OFF
-DENABLE_UTILS=OFF
-DENABLE_CLICKHOUSE_ALL=ON
";

pub const VERSIONS: &str = "\
SET(VERSION_MAJOR 23)
SET(VERSION_MINOR 8)
SET(VERSION_STRING 23.8.1.1)
";

/// Isolated test environment.
///
/// Each test gets its own source tree, builder directory, home and git
/// configuration, so nothing leaks into the real user environment.
pub struct TestEnv {
  pub temp: TempDir,
  pub work_dir: PathBuf,
}

impl TestEnv {
  /// A source tree with a default profile and a versions file.
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let work_dir = temp.path().join("mqdb");
    let env = Self { temp, work_dir };
    env.write_file("docker/builder/profile.d/default", DEFAULT_PROFILE);
    env.write_file("cmake/autogenerated_versions.txt", VERSIONS);
    env.write_file("LICENSE", "license");
    env.write_file("NOTICE.txt", "notice");
    env
  }

  /// Write a file relative to the work directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.work_dir.join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn home(&self) -> PathBuf {
    let p = self.temp.path().join("home");
    std::fs::create_dir_all(&p).unwrap();
    p
  }

  pub fn output_path(&self) -> PathBuf {
    self.temp.path().join("output")
  }

  /// Whether a usable git binary is on PATH.
  pub fn has_git() -> bool {
    StdCommand::new("git")
      .arg("--version")
      .output()
      .map(|o| o.status.success())
      .unwrap_or(false)
  }

  /// Turn the work directory into a repository with one commit.
  pub fn init_repo(&self) {
    let git = |args: &[&str]| {
      let status = self
        .git_command()
        .args(args)
        .current_dir(&self.work_dir)
        .status()
        .unwrap();
      assert!(status.success(), "git {:?} failed", args);
    };
    git(&["init", "-q"]);
    git(&[
      "-c",
      "user.name=relkit",
      "-c",
      "user.email=relkit@example.com",
      "-c",
      "commit.gpgsign=false",
      "commit",
      "-q",
      "--allow-empty",
      "-m",
      "init",
    ]);
  }

  fn git_command(&self) -> StdCommand {
    let mut cmd = StdCommand::new("git");
    for (key, value) in self.isolation_vars() {
      cmd.env(key, value);
    }
    cmd
  }

  fn isolation_vars(&self) -> Vec<(&'static str, PathBuf)> {
    vec![
      ("HOME", self.home()),
      ("GIT_CONFIG_GLOBAL", self.home().join(".gitconfig")),
      ("GIT_CEILING_DIRECTORIES", self.temp.path().to_path_buf()),
    ]
  }

  /// Get a pre-configured Command for the relkit binary.
  ///
  /// Sets `RELKIT_WORK_DIR` to the test tree and isolates `HOME` and git's
  /// global configuration.
  pub fn relkit_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("relkit");
    cmd.env("RELKIT_WORK_DIR", &self.work_dir);
    cmd.env_remove("RELKIT_BUILDER_DIR");
    cmd.env_remove("RUST_LOG");
    for (key, value) in self.isolation_vars() {
      cmd.env(key, value);
    }
    cmd
  }

  pub fn path(&self, relative: &str) -> PathBuf {
    self.work_dir.join(relative)
  }
}
