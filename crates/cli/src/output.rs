//! Terminal presentation for build reports and plans.
//!
//! Status lines go to stdout, problems to stderr. Colors are only emitted
//! when the target stream supports them.

use std::time::Duration;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

const SUCCESS: &str = "✓";
const ERROR: &str = "✗";
const WARNING: &str = "⚠";
const INFO: &str = "•";
const ARROW: &str = "→";

/// Revision abbreviated the way release notes quote it.
pub fn short_revision(hash: &str) -> &str {
  hash.get(..12).unwrap_or(hash)
}

/// Artifact size with a binary unit.
pub fn format_bytes(bytes: u64) -> String {
  const UNITS: [&str; 3] = ["KB", "MB", "GB"];

  if bytes < 1024 {
    return format!("{} B", bytes);
  }
  let mut size = bytes as f64 / 1024.0;
  let mut unit = 0;
  while size >= 1024.0 && unit + 1 < UNITS.len() {
    size /= 1024.0;
    unit += 1;
  }
  format!("{:.1} {}", size, UNITS[unit])
}

/// Wall time of a build step. Native builds run for hours, short steps for
/// milliseconds.
pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  match secs {
    3600.. => format!("{}h {}m", secs / 3600, (secs % 3600) / 60),
    60.. => format!("{}m {}s", secs / 60, secs % 60),
    1.. => format!("{}.{:02}s", secs, duration.subsec_millis() / 10),
    0 => format!("{}ms", duration.subsec_millis()),
  }
}

pub fn print_success(message: &str) {
  println!("{} {}", SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()), message);
}

pub fn print_info(message: &str) {
  println!("{} {}", INFO.if_supports_color(Stream::Stdout, |s| s.blue()), message);
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

/// An indented `label: value` line under the last status line.
pub fn print_stat(label: &str, value: &str) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

/// A rendered command line from a plan.
pub fn print_command(line: &str) {
  println!("  {} {}", ARROW.if_supports_color(Stream::Stdout, |s| s.cyan()), line);
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON output")?;
  println!("{}", json);
  Ok(())
}
