//! External tool invocation.
//!
//! Commands are described as structured argument lists ([`CommandSpec`]) and
//! executed through a [`CommandRunner`]. Nothing here goes through a shell, so
//! version strings and product names are passed to tools verbatim.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while running an external tool.
#[derive(Debug, Error)]
pub enum ProcessError {
  /// The program could not be started at all.
  #[error("failed to spawn {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// The program ran and exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  Failed { cmd: String, code: Option<i32> },

  /// Captured output was not valid UTF-8.
  #[error("command produced non-utf8 output: {cmd}")]
  Utf8 { cmd: String },
}

/// A single external command: program, arguments, working directory and the
/// environment variables layered on top of the inherited environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: Option<PathBuf>,
  pub env: BTreeMap<String, String>,
}

impl CommandSpec {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: None,
      env: BTreeMap::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
    self.cwd = Some(dir.as_ref().to_path_buf());
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  pub fn envs(mut self, vars: &BTreeMap<String, String>) -> Self {
    for (key, value) in vars {
      self.env.insert(key.clone(), value.clone());
    }
    self
  }

  fn to_command(&self) -> Command {
    let mut command = Command::new(&self.program);
    command.args(&self.args);
    if let Some(cwd) = &self.cwd {
      command.current_dir(cwd);
    }
    for (key, value) in &self.env {
      command.env(key, value);
    }
    command
  }
}

/// Renders the command the way a user would type it, for logs only.
impl fmt::Display for CommandSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (key, value) in &self.env {
      write!(f, "{}={} ", key, quote(value))?;
    }
    write!(f, "{}", quote(&self.program))?;
    for arg in &self.args {
      write!(f, " {}", quote(arg))?;
    }
    Ok(())
  }
}

fn quote(word: &str) -> String {
  let plain = !word.is_empty()
    && word
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || "-_./=:+,@%".contains(c));
  if plain {
    word.to_string()
  } else {
    format!("'{}'", word.replace('\'', r"'\''"))
  }
}

/// Executes external commands, blocking until each one exits.
pub trait CommandRunner {
  /// Run the command with inherited stdio. Non-zero exit is an error.
  fn run(&self, spec: &CommandSpec) -> Result<(), ProcessError>;

  /// Run the command and return its trimmed stdout. Non-zero exit is an error.
  fn capture(&self, spec: &CommandSpec) -> Result<String, ProcessError>;
}

/// Runs commands on the host with `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
  fn run(&self, spec: &CommandSpec) -> Result<(), ProcessError> {
    info!(cmd = %spec, "running command");
    let status = spec.to_command().status().map_err(|e| ProcessError::Spawn {
      program: spec.program.clone(),
      source: e,
    })?;

    if !status.success() {
      return Err(ProcessError::Failed {
        cmd: spec.to_string(),
        code: status.code(),
      });
    }
    Ok(())
  }

  fn capture(&self, spec: &CommandSpec) -> Result<String, ProcessError> {
    info!(cmd = %spec, "running command");
    let output = spec
      .to_command()
      .stdin(Stdio::null())
      .stderr(Stdio::piped())
      .output()
      .map_err(|e| ProcessError::Spawn {
        program: spec.program.clone(),
        source: e,
      })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "command stderr");
      }
      return Err(ProcessError::Failed {
        cmd: spec.to_string(),
        code: output.status.code(),
      });
    }

    let stdout = String::from_utf8(output.stdout).map_err(|_| ProcessError::Utf8 { cmd: spec.to_string() })?;
    Ok(stdout.trim().to_string())
  }
}

/// Run an informational command whose failure must not stop the pipeline.
pub fn run_best_effort(runner: &dyn CommandRunner, spec: &CommandSpec) {
  if let Err(e) = runner.run(spec) {
    warn!(cmd = %spec, error = %e, "best-effort command failed, continuing");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testutil::{RecordingRunner, shell_cmd};

  #[test]
  fn display_quotes_words_with_spaces() {
    let spec = CommandSpec::new("git")
      .args(["show", "-s", "--format=%ci"])
      .env("VERSION_STRING", "1.2 beta");
    assert_eq!(spec.to_string(), "VERSION_STRING='1.2 beta' git show -s --format=%ci");
  }

  #[test]
  fn display_escapes_single_quotes() {
    let spec = CommandSpec::new("echo").arg("it's");
    assert_eq!(spec.to_string(), r"echo 'it'\''s'");
  }

  #[test]
  #[cfg(unix)]
  fn system_runner_captures_trimmed_stdout() {
    let (program, args) = shell_cmd("echo '  hello  '");
    let spec = CommandSpec::new(program).args(args);
    assert_eq!(SystemRunner.capture(&spec).unwrap(), "hello");
  }

  #[test]
  #[cfg(unix)]
  fn system_runner_passes_env_without_shell_interpolation() {
    let (program, args) = shell_cmd("printf %s \"$RELKIT_PROBE\"");
    let spec = CommandSpec::new(program).args(args).env("RELKIT_PROBE", "$(whoami) ; x");
    assert_eq!(SystemRunner.capture(&spec).unwrap(), "$(whoami) ; x");
  }

  #[test]
  #[cfg(unix)]
  fn system_runner_reports_exit_code() {
    let (program, args) = shell_cmd("exit 3");
    let spec = CommandSpec::new(program).args(args);
    let result = SystemRunner.run(&spec);
    assert!(matches!(result, Err(ProcessError::Failed { code: Some(3), .. })));
  }

  #[test]
  fn system_runner_reports_missing_program() {
    let spec = CommandSpec::new("relkit-definitely-not-a-program");
    let result = SystemRunner.run(&spec);
    assert!(matches!(result, Err(ProcessError::Spawn { .. })));
  }

  #[test]
  fn best_effort_swallows_failures() {
    let runner = RecordingRunner::new().fail_on("ccache");
    run_best_effort(&runner, &CommandSpec::new("ccache").arg("--show-stats"));
    assert_eq!(runner.commands().len(), 1);
  }
}
