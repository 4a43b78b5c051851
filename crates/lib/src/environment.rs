//! Directories a single invocation works with.
//!
//! An [`Environment`] is resolved once at startup and handed to every
//! component; nothing else in the crate derives paths from the process
//! location.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::consts::VERSION_FILE;

/// Overrides the work directory when `--work-dir` is not given.
pub const WORK_DIR_VAR: &str = "RELKIT_WORK_DIR";

/// Overrides the builder directory (profiles, package descriptors, Dockerfile).
pub const BUILDER_DIR_VAR: &str = "RELKIT_BUILDER_DIR";

#[derive(Debug, Error)]
pub enum EnvironmentError {
  #[error("failed to resolve {}: {source}", path.display())]
  Resolve { path: PathBuf, source: std::io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Environment {
  /// Root of the native source tree.
  pub work_dir: PathBuf,
  /// Builder support files: `profile.d/`, `package.d/`, `Dockerfile`.
  pub builder_dir: PathBuf,
  /// CMake binary directory.
  pub build_dir: PathBuf,
  /// Staging tree and final artifacts.
  pub output_dir: PathBuf,
}

impl Environment {
  /// Build an environment from explicit directories.
  pub fn new(work_dir: impl Into<PathBuf>, builder_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
    let work_dir = work_dir.into();
    Self {
      build_dir: work_dir.join("build"),
      work_dir,
      builder_dir: builder_dir.into(),
      output_dir: output_dir.into(),
    }
  }

  /// Resolve the environment for this process.
  ///
  /// The work directory comes from `work_dir`, then `RELKIT_WORK_DIR`, then the
  /// current directory. The builder directory comes from `RELKIT_BUILDER_DIR`,
  /// defaulting to `<work_dir>/docker/builder`. Relative paths are made
  /// absolute against the current directory.
  pub fn discover(work_dir: Option<&Path>, output_dir: &Path) -> Result<Self, EnvironmentError> {
    let work_dir = match work_dir {
      Some(dir) => dir.to_path_buf(),
      None => std::env::var_os(WORK_DIR_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".")),
    };
    let work_dir = absolute(&work_dir)?;

    let builder_dir = match std::env::var_os(BUILDER_DIR_VAR) {
      Some(dir) => absolute(Path::new(&dir))?,
      None => work_dir.join("docker").join("builder"),
    };

    Ok(Self::new(work_dir, builder_dir, absolute(output_dir)?))
  }

  pub fn profile_dir(&self) -> PathBuf {
    self.builder_dir.join("profile.d")
  }

  pub fn package_dir(&self) -> PathBuf {
    self.builder_dir.join("package.d")
  }

  pub fn dockerfile(&self) -> PathBuf {
    self.builder_dir.join("Dockerfile")
  }

  pub fn version_file(&self) -> PathBuf {
    self.work_dir.join(VERSION_FILE)
  }

  /// Last component of the work directory, used as its container mount name.
  pub fn work_dir_name(&self) -> String {
    self
      .work_dir
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "src".to_string())
  }
}

/// Make `path` absolute without requiring it to exist.
pub fn absolute(path: &Path) -> Result<PathBuf, EnvironmentError> {
  let resolved = std::path::absolute(path).map_err(|e| EnvironmentError::Resolve {
    path: path.to_path_buf(),
    source: e,
  })?;
  Ok(normalize(&resolved))
}

fn normalize(path: &Path) -> PathBuf {
  use std::path::Component;

  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        out.pop();
      }
      other => out.push(other.as_os_str()),
    }
  }
  out
}
