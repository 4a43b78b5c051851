//! Named default settings stored as `key=value` files.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProfileError {
  #[error("profile '{name}' not found at {}", path.display())]
  NotFound { name: String, path: PathBuf },

  #[error("invalid profile name '{0}'")]
  InvalidName(String),

  #[error("failed to read profile {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },
}

/// An immutable set of default settings, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
  pub name: String,
  entries: Vec<(String, String)>,
}

impl Profile {
  /// Parse profile text.
  ///
  /// Lines are trimmed; lines starting with `#` are skipped, as is any line
  /// that does not split into exactly two parts on `=`.
  pub fn parse(name: &str, content: &str) -> Self {
    let entries = content
      .lines()
      .map(str::trim)
      .filter(|line| !line.starts_with('#'))
      .filter_map(|line| {
        let mut parts = line.split('=');
        match (parts.next(), parts.next(), parts.next()) {
          (Some(key), Some(value), None) => Some((key.to_string(), value.to_string())),
          _ => None,
        }
      })
      .collect();

    Self {
      name: name.to_string(),
      entries,
    }
  }

  pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Looks up profiles by name in one directory.
#[derive(Debug, Clone)]
pub struct ProfileStore {
  dir: PathBuf,
}

impl ProfileStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn load(&self, name: &str) -> Result<Profile, ProfileError> {
    if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
      return Err(ProfileError::InvalidName(name.to_string()));
    }

    let path = self.dir.join(name);
    if !path.is_file() {
      return Err(ProfileError::NotFound {
        name: name.to_string(),
        path,
      });
    }

    let content = fs::read_to_string(&path).map_err(|e| ProfileError::Read {
      path: path.clone(),
      source: e,
    })?;

    let profile = Profile::parse(name, &content);
    debug!(profile = %name, settings = profile.len(), "loaded profile");
    Ok(profile)
  }
}
