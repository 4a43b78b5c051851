//! Version metadata read from the CMake-generated versions file.
//!
//! Only lines of the form `SET(<NAME> <value>)` are considered.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersionError {
  #[error("failed to read version file {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("version file {} does not define {key}", path.display())]
  Missing { path: PathBuf, key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionValue {
  Int(i64),
  Str(String),
}

impl fmt::Display for VersionValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VersionValue::Int(v) => write!(f, "{}", v),
      VersionValue::Str(v) => f.write_str(v),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct VersionInfo {
  path: PathBuf,
  values: BTreeMap<String, VersionValue>,
}

impl VersionInfo {
  pub fn load(path: &Path) -> Result<Self, VersionError> {
    let content = fs::read_to_string(path).map_err(|e| VersionError::Read {
      path: path.to_path_buf(),
      source: e,
    })?;
    Ok(Self::parse(path, &content))
  }

  pub fn parse(path: &Path, content: &str) -> Self {
    let mut values = BTreeMap::new();

    for line in content.lines().map(str::trim) {
      let Some(body) = line.strip_prefix("SET(").and_then(|l| l.strip_suffix(')')) else {
        continue;
      };
      let mut parts = body.trim().splitn(2, char::is_whitespace);
      let (Some(name), Some(raw)) = (parts.next(), parts.next()) else {
        continue;
      };
      let raw = raw.trim();
      let value = raw
        .parse::<i64>()
        .map(VersionValue::Int)
        .unwrap_or_else(|_| VersionValue::Str(raw.to_string()));
      values.insert(name.to_string(), value);
    }

    Self {
      path: path.to_path_buf(),
      values,
    }
  }

  pub fn get(&self, key: &str) -> Option<&VersionValue> {
    self.values.get(key)
  }

  /// The `VERSION_STRING` used in artifact names.
  pub fn version_string(&self) -> Result<String, VersionError> {
    self
      .get("VERSION_STRING")
      .map(ToString::to_string)
      .ok_or_else(|| VersionError::Missing {
        path: self.path.clone(),
        key: "VERSION_STRING".to_string(),
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  const VERSIONS: &str = "\
# This variables autochanged by tests/ci/version_helper.py:

# NOTE: has nothing common with DBMS_TCP_PROTOCOL_VERSION,
# only DBMS_TCP_PROTOCOL_VERSION should be incremented on protocol changes.
SET(VERSION_REVISION 54472)
SET(VERSION_MAJOR 23)
SET(VERSION_DESCRIBE v23.3.1.1-testing)
SET(VERSION_STRING 23.3.1.1)
SET(BROKEN)
# end of autochange
";

  #[test]
  fn parse_coerces_integers() {
    let info = VersionInfo::parse(Path::new("versions.txt"), VERSIONS);
    assert_eq!(info.get("VERSION_REVISION"), Some(&VersionValue::Int(54472)));
    assert_eq!(info.get("VERSION_MAJOR"), Some(&VersionValue::Int(23)));
    assert_eq!(
      info.get("VERSION_DESCRIBE"),
      Some(&VersionValue::Str("v23.3.1.1-testing".to_string()))
    );
    assert_eq!(info.get("BROKEN"), None);
  }

  #[test]
  fn version_string_is_kept_as_text() {
    let info = VersionInfo::parse(Path::new("versions.txt"), VERSIONS);
    assert_eq!(info.version_string().unwrap(), "23.3.1.1");
  }

  #[test]
  fn missing_version_string_is_an_error() {
    let info = VersionInfo::parse(Path::new("versions.txt"), "SET(VERSION_MAJOR 1)\n");
    let err = info.version_string().unwrap_err();
    assert!(matches!(err, VersionError::Missing { .. }));
  }

  #[test]
  fn load_reports_unreadable_file() {
    let temp = TempDir::new().unwrap();
    let result = VersionInfo::load(&temp.path().join("missing.txt"));
    assert!(matches!(result, Err(VersionError::Read { .. })));
  }
}
