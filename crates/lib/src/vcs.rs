//! Read-only revision queries against the work tree.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::process::{CommandRunner, CommandSpec, ProcessError};

/// Commit identity baked into the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revision {
  pub hash: String,
  /// Committer date as printed by `git show --format=%ci`.
  pub date: String,
}

/// Mark `work_dir` as a safe directory so git accepts trees owned by another
/// user, as happens with bind-mounted sources inside the build container.
pub fn trust_directory(runner: &dyn CommandRunner, work_dir: &Path) -> Result<(), ProcessError> {
  let spec = CommandSpec::new("git")
    .args(["config", "--global", "--add", "safe.directory"])
    .arg(work_dir.display().to_string());
  runner.run(&spec)
}

pub fn commit_hash(runner: &dyn CommandRunner, work_dir: &Path) -> Result<String, ProcessError> {
  let spec = CommandSpec::new("git").args(["rev-parse", "HEAD"]).current_dir(work_dir);
  runner.capture(&spec)
}

pub fn commit_date(runner: &dyn CommandRunner, work_dir: &Path, hash: &str) -> Result<String, ProcessError> {
  let spec = CommandSpec::new("git")
    .args(["show", "-s", "--format=%ci", hash])
    .current_dir(work_dir);
  runner.capture(&spec)
}

/// Trust the work tree, then read the current commit and its date.
pub fn current_revision(runner: &dyn CommandRunner, work_dir: &Path) -> Result<Revision, ProcessError> {
  trust_directory(runner, work_dir)?;
  let hash = commit_hash(runner, work_dir)?;
  let date = commit_date(runner, work_dir, &hash)?;
  debug!(hash = %hash, date = %date, "resolved revision");
  Ok(Revision { hash, date })
}
