//! Configure, build and install steps of the native toolchain.
//!
//! Command construction is pure ([`BuildInvoker::configure_command`] and
//! friends) so the emitted invocations can be inspected without running them.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::ConfigurationSet;
use crate::consts::BUILD_TARGET;
use crate::environment::Environment;
use crate::options::Arch;
use crate::process::{CommandRunner, CommandSpec, ProcessError, run_best_effort};

#[derive(Debug, Error)]
pub enum InvokeError {
  #[error("failed to prepare build directory {}: {source}", path.display())]
  Prepare { path: PathBuf, source: std::io::Error },

  #[error(transparent)]
  Process(#[from] ProcessError),
}

/// Runs CMake and ninja for one configuration.
pub struct BuildInvoker<'a> {
  env: &'a Environment,
  runner: &'a dyn CommandRunner,
  toolchain_env: BTreeMap<String, String>,
}

impl<'a> BuildInvoker<'a> {
  /// Create an invoker whose commands see the LLVM libraries of the
  /// toolchain named by `LLVM_VERSION` in the current process environment.
  pub fn new(env: &'a Environment, runner: &'a dyn CommandRunner) -> Self {
    let llvm_version = std::env::var("LLVM_VERSION").unwrap_or_default();
    let library_path = std::env::var("LD_LIBRARY_PATH").unwrap_or_default();
    Self::with_toolchain_env(env, runner, toolchain_env(&llvm_version, &library_path))
  }

  pub fn with_toolchain_env(
    env: &'a Environment,
    runner: &'a dyn CommandRunner,
    toolchain_env: BTreeMap<String, String>,
  ) -> Self {
    Self {
      env,
      runner,
      toolchain_env,
    }
  }

  /// The `cmake` invocation for `set`, run from the build directory.
  pub fn configure_command(&self, set: &ConfigurationSet) -> CommandSpec {
    let heavy_builds = if set.get("-DSANITIZE") == Some("address") {
      "-DENABLE_CHECK_HEAVY_BUILDS=OFF"
    } else {
      "-DENABLE_CHECK_HEAVY_BUILDS=ON"
    };

    CommandSpec::new("cmake")
      .args(["--debug-trycompile", "-DCMAKE_VERBOSE_MAKEFILE=1", "-LA", heavy_builds])
      .args(set.to_args())
      .arg("..")
      .current_dir(&self.env.build_dir)
      .envs(&self.toolchain_env)
  }

  /// The `ninja` invocation for the bundle target. `jobs == 0` leaves the job
  /// count to ninja.
  pub fn build_command(&self, set: &ConfigurationSet, jobs: u32) -> CommandSpec {
    let mut spec = CommandSpec::new("ninja");
    // clang-tidy findings in one unit must not hide the rest
    if set.get("-DENABLE_CLANG_TIDY") == Some("ON") {
      spec = spec.arg("-k0");
    }
    if jobs > 0 {
      spec = spec.arg(format!("-j{}", jobs));
    }
    spec
      .arg(BUILD_TARGET)
      .current_dir(&self.env.build_dir)
      .envs(&self.toolchain_env)
  }

  /// `ninja install` into the output directory.
  pub fn install_command(&self) -> CommandSpec {
    CommandSpec::new("ninja")
      .arg("install")
      .current_dir(&self.env.build_dir)
      .env("DESTDIR", self.env.output_dir.display().to_string())
  }

  /// Reconfigure from scratch and build.
  ///
  /// Any `CMakeCache.txt` left by a previous run is removed first, so
  /// re-running with different options reconfigures cleanly.
  pub fn invoke(&self, set: &ConfigurationSet, arch: &Arch, jobs: u32) -> Result<(), InvokeError> {
    let build_dir = &self.env.build_dir;
    fs::create_dir_all(build_dir).map_err(|e| InvokeError::Prepare {
      path: build_dir.clone(),
      source: e,
    })?;

    let cache = build_dir.join("CMakeCache.txt");
    if cache.exists() {
      debug!(path = %cache.display(), "removing configure cache");
      fs::remove_file(&cache).map_err(|e| InvokeError::Prepare {
        path: cache.clone(),
        source: e,
      })?;
    }

    for (key, value) in set.iter() {
      debug!(key = %key, value = %value, "cmake setting");
    }

    info!(arch = %arch, jobs, "configuring");
    self.runner.run(&self.configure_command(set))?;

    info!(target = BUILD_TARGET, "building");
    self.runner.run(&self.build_command(set, jobs))?;
    Ok(())
  }

  pub fn install(&self) -> Result<(), InvokeError> {
    info!(destdir = %self.env.output_dir.display(), "installing");
    self.runner.run(&self.install_command())?;
    Ok(())
  }

  /// Print compiler cache statistics; failures are ignored.
  pub fn show_cache_stats(&self) {
    run_best_effort(self.runner, &CommandSpec::new("ccache").arg("--show-stats"));
  }
}

/// Environment shared by configure and build: the toolchain's LLVM libraries
/// go in front of any inherited library path.
pub fn toolchain_env(llvm_version: &str, library_path: &str) -> BTreeMap<String, String> {
  let mut value = format!("/usr/lib/llvm-{}/lib", llvm_version);
  if !library_path.is_empty() {
    value.push(':');
    value.push_str(library_path);
  }
  let mut vars = BTreeMap::new();
  vars.insert("LD_LIBRARY_PATH".to_string(), value);
  vars
}
