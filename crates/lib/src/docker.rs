//! Re-running an invocation inside the builder container.
//!
//! The delegate makes sure the builder image exists, then starts a container
//! with the work tree, the compiler cache and the output directory mounted
//! under [`CONTAINER_ROOT`], and runs the same command line there with the
//! host-only flags removed.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::{APP_NAME, CONTAINER_ROOT};
use crate::environment::Environment;
use crate::process::{CommandRunner, CommandSpec, ProcessError};

/// Overrides the program started inside the container.
pub const ENTRYPOINT_VAR: &str = "RELKIT_CONTAINER_ENTRYPOINT";

pub const DEFAULT_REPOSITORY: &str = "mqdb/builder";
pub const DEFAULT_IMAGE_VERSION: &str = "2.9.1";

/// Host-only flags without a value.
const HOST_SWITCHES: [&str; 3] = ["--docker", "--force-build-image", "--as-root"];

/// Host-only flags taking a value. The work tree is the container's cwd, so
/// a host `--work-dir` is dropped too.
const HOST_VALUED: [&str; 4] = ["--image", "--image-version", "--ccache", "--work-dir"];

#[derive(Debug, Error)]
pub enum DockerError {
  #[error("failed to build image {image}: {source}")]
  BuildImage {
    image: String,
    #[source]
    source: ProcessError,
  },

  #[error("containerized build failed: {0}")]
  Run(#[source] ProcessError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerOptions {
  pub repository: String,
  pub image_version: String,
  /// Build the image from the local Dockerfile instead of pulling it.
  pub force_build_image: bool,
  /// Run as `0:0` instead of the calling user.
  pub as_root: bool,
  /// Host compiler cache mounted into the container.
  pub ccache: PathBuf,
  /// Program run inside the container.
  pub entrypoint: String,
}

impl DockerOptions {
  pub fn new(ccache: impl Into<PathBuf>) -> Self {
    Self {
      repository: DEFAULT_REPOSITORY.to_string(),
      image_version: DEFAULT_IMAGE_VERSION.to_string(),
      force_build_image: false,
      as_root: false,
      ccache: ccache.into(),
      entrypoint: default_entrypoint(),
    }
  }

  pub fn image(&self) -> String {
    format!("{}:{}", self.repository, self.image_version)
  }
}

/// `RELKIT_CONTAINER_ENTRYPOINT`, or this tool's own name.
pub fn default_entrypoint() -> String {
  std::env::var(ENTRYPOINT_VAR)
    .ok()
    .filter(|s| !s.is_empty())
    .unwrap_or_else(|| APP_NAME.to_string())
}

/// Strip host-only flags from `argv` and point `--output` at the container
/// mount. Both `--flag value` and `--flag=value` spellings are handled.
pub fn container_args(argv: &[String]) -> Vec<String> {
  let output = format!("{}/output", CONTAINER_ROOT);
  let mut args = Vec::with_capacity(argv.len() + 1);
  let mut iter = argv.iter();

  while let Some(arg) = iter.next() {
    let (flag, inline) = match arg.split_once('=') {
      Some((flag, value)) if flag.starts_with("--") => (flag, Some(value)),
      _ => (arg.as_str(), None),
    };

    if HOST_SWITCHES.contains(&flag) {
      continue;
    }
    if HOST_VALUED.contains(&flag) {
      if inline.is_none() {
        iter.next();
      }
      continue;
    }
    if flag == "--output" {
      if inline.is_none() {
        iter.next();
        args.push("--output".to_string());
        args.push(output.clone());
      } else {
        args.push(format!("--output={}", output));
      }
      continue;
    }
    args.push(arg.clone());
  }
  args
}

/// `uid:gid` the container runs as.
pub fn container_user(as_root: bool) -> String {
  if as_root {
    return "0:0".to_string();
  }
  effective_user()
}

#[cfg(unix)]
fn effective_user() -> String {
  let uid = rustix::process::geteuid();
  let gid = rustix::process::getegid();
  format!("{}:{}", uid.as_raw(), gid.as_raw())
}

#[cfg(not(unix))]
fn effective_user() -> String {
  "0:0".to_string()
}

pub struct DockerDelegate<'a> {
  env: &'a Environment,
  runner: &'a dyn CommandRunner,
  options: DockerOptions,
}

impl<'a> DockerDelegate<'a> {
  pub fn new(env: &'a Environment, runner: &'a dyn CommandRunner, options: DockerOptions) -> Self {
    Self { env, runner, options }
  }

  pub fn options(&self) -> &DockerOptions {
    &self.options
  }

  /// Whether the image is already available locally. Query failures count
  /// as absent.
  pub fn image_present(&self) -> bool {
    let image = self.options.image();
    let spec = CommandSpec::new("docker").args(["images", "-q", image.as_str()]);
    match self.runner.capture(&spec) {
      Ok(out) => !out.is_empty(),
      Err(e) => {
        debug!(image = %image, error = %e, "image query failed");
        false
      }
    }
  }

  /// `docker build` of the builder image from the local Dockerfile.
  pub fn build_image_command(&self) -> CommandSpec {
    CommandSpec::new("docker")
      .args(["build", "--rm=true", "-t"])
      .arg(self.options.image())
      .arg("-f")
      .arg(self.env.dockerfile().display().to_string())
      .arg(self.env.builder_dir.display().to_string())
      .current_dir(&self.env.work_dir)
  }

  /// Build the image when forced, otherwise pull it if it is missing. A
  /// failed pull is logged and left to `docker run` to report.
  pub fn ensure_image(&self) -> Result<(), DockerError> {
    let image = self.options.image();
    if self.options.force_build_image {
      info!(image = %image, "building builder image");
      return self
        .runner
        .run(&self.build_image_command())
        .map_err(|e| DockerError::BuildImage { image, source: e });
    }

    if self.image_present() {
      debug!(image = %image, "image present locally");
      return Ok(());
    }

    info!(image = %image, "pulling builder image");
    if let Err(e) = self.runner.run(&CommandSpec::new("docker").args(["pull", image.as_str()])) {
      warn!(image = %image, error = %e, "cannot pull image");
    }
    Ok(())
  }

  /// The `docker run` invocation executing `args` in the container.
  pub fn run_command(&self, args: &[String], user: &str, tty: bool) -> CommandSpec {
    let mount_name = self.env.work_dir_name();
    let work_mount = format!("{}/{}", CONTAINER_ROOT, mount_name);

    let mut spec = CommandSpec::new("docker")
      .arg("run")
      .arg(format!("--user={}", user))
      .args(["--hostname", "builder", "--rm", "--workdir"])
      .arg(work_mount.as_str())
      .arg(format!("--volume={}:{}/output", self.env.output_dir.display(), CONTAINER_ROOT))
      .arg(format!("--volume={}:{}", self.env.work_dir.display(), work_mount))
      .arg(format!("--volume={}:{}/.ccache", self.options.ccache.display(), CONTAINER_ROOT));
    if tty {
      spec = spec.arg("-it");
    }
    spec
      .arg(self.options.image())
      .arg(self.options.entrypoint.as_str())
      .args(args.iter().cloned())
      .current_dir(&self.env.work_dir)
  }

  /// Make sure the image exists, then run `argv` (this process's arguments,
  /// without the program name) inside the container.
  pub fn run(&self, argv: &[String]) -> Result<(), DockerError> {
    use std::io::IsTerminal;

    self.ensure_image()?;
    let args = container_args(argv);
    let user = container_user(self.options.as_root);
    let tty = std::io::stdout().is_terminal();
    info!(image = %self.options.image(), user = %user, args = ?args, "running build in container");
    self
      .runner
      .run(&self.run_command(&args, &user, tty))
      .map_err(DockerError::Run)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testutil::RecordingRunner;

  fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
  }

  fn env() -> Environment {
    Environment::new("/src/mqdb", "/src/mqdb/docker/builder", "/tmp/out")
  }

  fn options() -> DockerOptions {
    let mut options = DockerOptions::new("/home/dev/.ccache");
    options.entrypoint = "relkit".to_string();
    options
  }

  #[test]
  fn container_args_drop_host_flags() {
    let args = container_args(&argv(&[
      "build",
      "--docker",
      "--arch",
      "linux-aarch64",
      "--image-version",
      "3.0.0",
      "--ccache=/home/dev/.ccache",
      "--image",
      "local/builder",
      "--force-build-image",
      "--as-root",
      "--package",
    ]));
    assert_eq!(args, argv(&["build", "--arch", "linux-aarch64", "--package"]));
  }

  #[test]
  fn container_args_drop_host_work_dir() {
    assert_eq!(
      container_args(&argv(&["build", "--work-dir", "/home/dev/mqdb", "--output", "/tmp/out", "--docker"])),
      argv(&["build", "--output", "/builder/output"])
    );
    assert_eq!(
      container_args(&argv(&["build", "--work-dir=/home/dev/mqdb", "--package"])),
      argv(&["build", "--package"])
    );
  }

  #[test]
  fn container_args_rewrite_output() {
    assert_eq!(
      container_args(&argv(&["build", "--output", "/tmp/out", "--name", "MqDB"])),
      argv(&["build", "--output", "/builder/output", "--name", "MqDB"])
    );
    assert_eq!(
      container_args(&argv(&["build", "--output=/tmp/out"])),
      argv(&["build", "--output=/builder/output"])
    );
  }

  #[test]
  fn run_command_mounts_tree_cache_and_output() {
    let env = env();
    let runner = RecordingRunner::new();
    let delegate = DockerDelegate::new(&env, &runner, options());

    let cmd = delegate.run_command(&argv(&["build", "--package"]), "1000:1000", false);
    assert_eq!(
      cmd.to_string(),
      "docker run --user=1000:1000 --hostname builder --rm --workdir /builder/mqdb \
       --volume=/tmp/out:/builder/output --volume=/src/mqdb:/builder/mqdb \
       --volume=/home/dev/.ccache:/builder/.ccache mqdb/builder:2.9.1 relkit build --package"
    );

    let tty = delegate.run_command(&[], "0:0", true);
    let image_pos = tty.args.iter().position(|a| a == "mqdb/builder:2.9.1").unwrap();
    assert_eq!(tty.args[image_pos - 1], "-it");
  }

  #[test]
  fn root_mapping() {
    assert_eq!(container_user(true), "0:0");
    assert!(container_user(false).contains(':'));
  }

  #[test]
  fn present_image_is_not_pulled() {
    let env = env();
    let runner = RecordingRunner::new().respond("images -q", "4f1e2a9c0b7d");
    DockerDelegate::new(&env, &runner, options()).ensure_image().unwrap();
    assert_eq!(runner.lines(), vec!["docker images -q mqdb/builder:2.9.1"]);
  }

  #[test]
  fn missing_image_is_pulled_best_effort() {
    let env = env();
    let runner = RecordingRunner::new().fail_on("docker pull");
    DockerDelegate::new(&env, &runner, options()).ensure_image().unwrap();
    assert_eq!(
      runner.lines(),
      vec!["docker images -q mqdb/builder:2.9.1", "docker pull mqdb/builder:2.9.1"]
    );
  }

  #[test]
  fn forced_build_uses_local_dockerfile() {
    let env = env();
    let runner = RecordingRunner::new();
    let mut opts = options();
    opts.force_build_image = true;
    DockerDelegate::new(&env, &runner, opts).ensure_image().unwrap();
    assert_eq!(
      runner.lines(),
      vec![
        "docker build --rm=true -t mqdb/builder:2.9.1 -f /src/mqdb/docker/builder/Dockerfile /src/mqdb/docker/builder"
      ]
    );
  }

  #[test]
  fn failed_image_build_is_fatal() {
    let env = env();
    let runner = RecordingRunner::new().fail_on("docker build");
    let mut opts = options();
    opts.force_build_image = true;
    let err = DockerDelegate::new(&env, &runner, opts).ensure_image().unwrap_err();
    assert!(matches!(err, DockerError::BuildImage { .. }));
  }
}
