//! Test utilities for relkit-lib.
//!
//! This module provides a scripted [`CommandRunner`] that records every
//! command instead of executing it, plus cross-platform shell helpers for the
//! few tests that really spawn processes.

use std::cell::RefCell;

use crate::process::{CommandRunner, CommandSpec, ProcessError};

type Hook = Box<dyn Fn(&CommandSpec)>;

/// Records commands and answers `capture` calls from canned responses.
///
/// Matchers are substrings of the rendered command line.
#[derive(Default)]
pub struct RecordingRunner {
  commands: RefCell<Vec<CommandSpec>>,
  responses: Vec<(String, String)>,
  failures: Vec<String>,
  hooks: Vec<(String, Hook)>,
}

impl RecordingRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Answer `capture` calls matching `pattern` with `output`.
  pub fn respond(mut self, pattern: &str, output: &str) -> Self {
    self.responses.push((pattern.to_string(), output.to_string()));
    self
  }

  /// Fail every command matching `pattern` with exit code 1.
  pub fn fail_on(mut self, pattern: &str) -> Self {
    self.failures.push(pattern.to_string());
    self
  }

  /// Run `hook` for every command matching `pattern`, to fake tool side effects.
  pub fn on_run(mut self, pattern: &str, hook: impl Fn(&CommandSpec) + 'static) -> Self {
    self.hooks.push((pattern.to_string(), Box::new(hook)));
    self
  }

  /// A runner that answers the git queries made during composition.
  pub fn with_git() -> Self {
    Self::new()
      .respond("rev-parse HEAD", "0123456789abcdef0123456789abcdef01234567")
      .respond("show -s", "2024-03-01 12:00:00 +0800")
  }

  pub fn commands(&self) -> Vec<CommandSpec> {
    self.commands.borrow().clone()
  }

  /// Rendered command lines, in execution order.
  pub fn lines(&self) -> Vec<String> {
    self.commands.borrow().iter().map(ToString::to_string).collect()
  }

  fn record(&self, spec: &CommandSpec) -> Result<String, ProcessError> {
    self.commands.borrow_mut().push(spec.clone());
    let line = spec.to_string();

    if self.failures.iter().any(|p| line.contains(p.as_str())) {
      return Err(ProcessError::Failed { cmd: line, code: Some(1) });
    }

    for (pattern, hook) in &self.hooks {
      if line.contains(pattern.as_str()) {
        hook(spec);
      }
    }

    Ok(
      self
        .responses
        .iter()
        .find(|(p, _)| line.contains(p.as_str()))
        .map(|(_, out)| out.clone())
        .unwrap_or_default(),
    )
  }
}

impl CommandRunner for RecordingRunner {
  fn run(&self, spec: &CommandSpec) -> Result<(), ProcessError> {
    self.record(spec).map(|_| ())
  }

  fn capture(&self, spec: &CommandSpec) -> Result<String, ProcessError> {
    self.record(spec)
  }
}

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}
