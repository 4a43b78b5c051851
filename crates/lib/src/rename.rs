//! Rebranding of an installed tree.
//!
//! The native build always installs under the canonical product name. When a
//! different product name is requested, entries in a few well-known
//! subdirectories of the staging tree are renamed, and symlinks into the
//! multi-call binary become small dispatch scripts.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Subdirectories holding renamable configuration directories.
const CONFIG_DIRS: [&str; 1] = ["etc"];

/// Subdirectories holding renamable executables and their debug symbols.
const BINARY_DIRS: [&str; 2] = ["usr/bin", "usr/lib/debug/usr/bin"];

/// Subdirectory whose symlinks are turned into dispatch scripts.
const LINK_DIR: &str = "usr/bin";

#[derive(Debug, Error)]
pub enum RenameError {
  #[error("failed to walk {}: {source}", path.display())]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("failed to rename {} to {}: {source}", from.display(), to.display())]
  Rename {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write dispatch script {}: {source}", path.display())]
  Script {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to update {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// What a rename pass changed, as paths after renaming.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenameReport {
  pub directories: Vec<PathBuf>,
  pub files: Vec<PathBuf>,
  pub scripts: Vec<PathBuf>,
}

impl RenameReport {
  pub fn is_empty(&self) -> bool {
    self.directories.is_empty() && self.files.is_empty() && self.scripts.is_empty()
  }
}

/// Rename every artifact of `tree` that carries `canonical` in its file name
/// to use `target` instead.
///
/// Nothing happens when both names are equal ignoring case. Missing
/// subdirectories are skipped, and a tree that no longer contains the
/// canonical name is left untouched, so repeated calls are harmless.
pub fn rename(tree: &Path, canonical: &str, target: &str) -> Result<RenameReport, RenameError> {
  if canonical.eq_ignore_ascii_case(target) {
    debug!(name = %target, "product keeps canonical name");
    return Ok(RenameReport::default());
  }

  let from = canonical.to_ascii_lowercase();
  let to = target.to_ascii_lowercase();
  let mut report = RenameReport::default();

  for dir in CONFIG_DIRS {
    report.directories.extend(rename_directories(&tree.join(dir), &from, &to)?);
  }
  for dir in BINARY_DIRS {
    report.files.extend(rename_files(&tree.join(dir), &from, &to)?);
  }
  report.scripts = replace_links(&tree.join(LINK_DIR), &from, &to)?;

  for path in report.files.iter().chain(&report.scripts) {
    make_executable(path)?;
  }

  info!(
    from = %canonical,
    to = %target,
    directories = report.directories.len(),
    files = report.files.len(),
    scripts = report.scripts.len(),
    "renamed artifacts"
  );
  Ok(report)
}

/// Replace every occurrence of `from` in `name`; `from` and `to` are lowercase.
///
/// Returns `None` when `name` does not mention `from`.
fn substitute(name: &str, from: &str, to: &str, ignore_case: bool) -> Option<String> {
  let haystack = if ignore_case {
    name.to_ascii_lowercase()
  } else {
    name.to_string()
  };
  if !haystack.contains(from) {
    return None;
  }

  let mut out = String::with_capacity(name.len());
  let mut rest = 0;
  for (start, _) in haystack.match_indices(from) {
    out.push_str(&name[rest..start]);
    out.push_str(to);
    rest = start + from.len();
  }
  out.push_str(&name[rest..]);
  Some(out)
}

fn file_name(path: &Path) -> Option<&str> {
  path.file_name().and_then(|n| n.to_str())
}

/// Every entry below `root`, children before their parent. The listing is
/// taken up front so renames do not disturb the traversal.
fn walk(root: &Path) -> Result<Vec<walkdir::DirEntry>, RenameError> {
  WalkDir::new(root)
    .min_depth(1)
    .contents_first(true)
    .into_iter()
    .collect::<Result<Vec<_>, _>>()
    .map_err(|e| RenameError::Walk {
      path: root.to_path_buf(),
      source: e,
    })
}

fn move_entry(from: &Path, to: &Path) -> Result<(), RenameError> {
  debug!(from = %from.display(), to = %to.display(), "renaming");
  fs::rename(from, to).map_err(|e| RenameError::Rename {
    from: from.to_path_buf(),
    to: to.to_path_buf(),
    source: e,
  })
}

fn rename_directories(root: &Path, from: &str, to: &str) -> Result<Vec<PathBuf>, RenameError> {
  if !root.is_dir() {
    return Ok(Vec::new());
  }

  let mut renamed = Vec::new();
  for entry in walk(root)? {
    if !entry.file_type().is_dir() {
      continue;
    }
    let path = entry.path();
    let Some(new_name) = file_name(path).and_then(|n| substitute(n, from, to, false)) else {
      continue;
    };
    let dest = path.with_file_name(new_name);
    move_entry(path, &dest)?;
    renamed.push(dest);
  }
  Ok(renamed)
}

fn rename_files(root: &Path, from: &str, to: &str) -> Result<Vec<PathBuf>, RenameError> {
  if !root.is_dir() {
    return Ok(Vec::new());
  }

  let mut renamed = Vec::new();
  for entry in walk(root)? {
    if !entry.file_type().is_file() {
      continue;
    }
    let path = entry.path();
    let Some(new_name) = file_name(path).and_then(|n| substitute(n, from, to, true)) else {
      continue;
    };
    let dest = path.with_file_name(new_name);
    move_entry(path, &dest)?;
    renamed.push(dest);
  }
  Ok(renamed)
}

/// Body of the script standing in for a symlink named `link_name` pointing
/// at `link_target`.
///
/// A link `<from>-server -> <from>` becomes `<to> server "$@"`, so the
/// multi-call binary still sees the subcommand it used to infer from argv[0].
pub fn dispatch_script(link_name: &str, link_target: &str, from: &str, to: &str) -> String {
  let program = substitute(link_target, from, to, true).unwrap_or_else(|| link_target.to_string());
  let prefix = format!("{}-", from);
  let lower = link_name.to_ascii_lowercase();

  let mut line = program;
  if lower.starts_with(&prefix) && link_name.len() > prefix.len() {
    line.push(' ');
    line.push_str(&link_name[prefix.len()..]);
  }
  format!("#!/bin/sh\n{} \"$@\"\n", line)
}

fn replace_links(root: &Path, from: &str, to: &str) -> Result<Vec<PathBuf>, RenameError> {
  if !root.is_dir() {
    return Ok(Vec::new());
  }

  let mut scripts = Vec::new();
  for entry in walk(root)? {
    if !entry.path_is_symlink() {
      continue;
    }
    let link = entry.path();
    let Some(name) = file_name(link) else {
      continue;
    };
    let Some(new_name) = substitute(name, from, to, true) else {
      continue;
    };

    let target = fs::read_link(link).map_err(|e| RenameError::Io {
      path: link.to_path_buf(),
      source: e,
    })?;
    let body = dispatch_script(name, &target.to_string_lossy(), from, to);

    let dest = link.with_file_name(new_name);
    fs::remove_file(link).map_err(|e| RenameError::Io {
      path: link.to_path_buf(),
      source: e,
    })?;
    fs::write(&dest, body).map_err(|e| RenameError::Script {
      path: dest.clone(),
      source: e,
    })?;
    debug!(link = %link.display(), script = %dest.display(), "replaced symlink with dispatch script");
    scripts.push(dest);
  }
  Ok(scripts)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), RenameError> {
  use std::os::unix::fs::PermissionsExt;

  let io_err = |e| RenameError::Io {
    path: path.to_path_buf(),
    source: e,
  };
  let mut perms = fs::metadata(path).map_err(io_err)?.permissions();
  perms.set_mode(perms.mode() | 0o111);
  fs::set_permissions(path, perms).map_err(io_err)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), RenameError> {
  Ok(())
}
