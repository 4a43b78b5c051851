//! User-declared build choices.
//!
//! [`BuildOptions`] is the only input to composition besides the profile. It is
//! built once per invocation and never mutated.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
  #[error("invalid architecture '{0}': expected <os>-<cpu>, e.g. linux-x86_64")]
  InvalidArch(String),

  #[error("unknown build type '{0}': expected Debug, Release, RelWithDebInfo or MinSizeRel")]
  InvalidBuildType(String),

  #[error("unknown sanitizer '{0}': expected address, thread, memory or undefined")]
  InvalidSanitizer(String),

  #[error("invalid product name '{0}': use ASCII letters, digits, '-', '_' or '.'")]
  InvalidProductName(String),
}

/// Target platform identifier such as `linux-aarch64`.
///
/// Any well-formed `<os>-<cpu>` pair parses; whether an overlay exists for it
/// is decided during composition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Arch {
  pub os: String,
  pub cpu: String,
}

impl Arch {
  pub fn new(os: &str, cpu: &str) -> Self {
    Self {
      os: os.to_string(),
      cpu: cpu.to_string(),
    }
  }

  /// CPU name as used by Debian-style package tooling.
  pub fn package_cpu(&self) -> &str {
    match self.cpu.as_str() {
      "x86_64" => "amd64",
      "aarch64" => "arm64",
      other => other,
    }
  }
}

impl FromStr for Arch {
  type Err = OptionsError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.split_once('-') {
      Some((os, cpu)) if !os.is_empty() && !cpu.is_empty() => Ok(Self::new(os, cpu)),
      _ => Err(OptionsError::InvalidArch(s.to_string())),
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.os, self.cpu)
  }
}

/// CMake build type, spelled the way CMake expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum BuildType {
  Debug,
  #[default]
  Release,
  RelWithDebInfo,
  MinSizeRel,
}

impl BuildType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Debug => "Debug",
      Self::Release => "Release",
      Self::RelWithDebInfo => "RelWithDebInfo",
      Self::MinSizeRel => "MinSizeRel",
    }
  }

  /// Optimized builds that ship to users.
  pub fn is_release_like(&self) -> bool {
    matches!(self, Self::Release | Self::RelWithDebInfo)
  }

  /// Debug info is already embedded in the binaries.
  pub fn has_embedded_debug_info(&self) -> bool {
    matches!(self, Self::RelWithDebInfo)
  }
}

impl FromStr for BuildType {
  type Err = OptionsError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Debug" => Ok(Self::Debug),
      "Release" => Ok(Self::Release),
      "RelWithDebInfo" => Ok(Self::RelWithDebInfo),
      "MinSizeRel" => Ok(Self::MinSizeRel),
      _ => Err(OptionsError::InvalidBuildType(s.to_string())),
    }
  }
}

impl fmt::Display for BuildType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Sanitizer {
  Address,
  Thread,
  Memory,
  Undefined,
}

impl Sanitizer {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Address => "address",
      Self::Thread => "thread",
      Self::Memory => "memory",
      Self::Undefined => "undefined",
    }
  }

  /// Short tag appended to package versions.
  pub fn version_tag(&self) -> &'static str {
    match self {
      Self::Address => "asan",
      Self::Thread => "tsan",
      Self::Memory => "msan",
      Self::Undefined => "ubsan",
    }
  }
}

impl FromStr for Sanitizer {
  type Err = OptionsError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "address" => Ok(Self::Address),
      "thread" => Ok(Self::Thread),
      "memory" => Ok(Self::Memory),
      "undefined" => Ok(Self::Undefined),
      _ => Err(OptionsError::InvalidSanitizer(s.to_string())),
    }
  }
}

impl fmt::Display for Sanitizer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Product the artifacts are branded as.
///
/// Restricted to characters that are safe in file names and package versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProductName(String);

impl ProductName {
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Lowercase form used for every path and artifact name.
  pub fn lower(&self) -> String {
    self.0.to_lowercase()
  }

  pub fn is_same_product(&self, other: &str) -> bool {
    self.0.eq_ignore_ascii_case(other)
  }
}

impl FromStr for ProductName {
  type Err = OptionsError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let valid = !s.is_empty()
      && !s.starts_with(['-', '.'])
      && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
      Ok(Self(s.to_string()))
    } else {
      Err(OptionsError::InvalidProductName(s.to_string()))
    }
  }
}

impl fmt::Display for ProductName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Everything the user decided for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOptions {
  pub arch: Arch,
  /// C compiler identifier, e.g. `clang-15`.
  pub compiler: String,
  /// Base profile name under `profile.d/`.
  pub profile: String,
  pub product: ProductName,
  pub build_type: BuildType,
  /// Ninja job count; zero leaves the choice to ninja.
  pub jobs: u32,
  pub with_test: bool,
  pub with_shared_libraries: bool,
  pub with_clang_tidy: bool,
  pub sanitizer: Option<Sanitizer>,
  pub with_coverage: bool,
  pub package: bool,
  pub official: bool,
}

impl BuildOptions {
  /// Defaults matching a plain release build of the canonical product.
  pub fn new(arch: Arch, product: ProductName) -> Self {
    Self {
      arch,
      compiler: "clang-15".to_string(),
      profile: "default".to_string(),
      product,
      build_type: BuildType::Release,
      jobs: 0,
      with_test: false,
      with_shared_libraries: false,
      with_clang_tidy: false,
      sanitizer: None,
      with_coverage: false,
      package: false,
      official: false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn arch_splits_on_first_dash() {
    let arch: Arch = "linux-x86_64".parse().unwrap();
    assert_eq!(arch, Arch::new("linux", "x86_64"));
    assert_eq!(arch.to_string(), "linux-x86_64");
  }

  #[test]
  fn arch_rejects_missing_parts() {
    for bad in ["linux", "-x86_64", "linux-", ""] {
      assert!(bad.parse::<Arch>().is_err(), "{bad} should be rejected");
    }
  }

  #[test]
  fn package_cpu_normalizes_known_names() {
    assert_eq!(Arch::new("linux", "x86_64").package_cpu(), "amd64");
    assert_eq!(Arch::new("linux", "aarch64").package_cpu(), "arm64");
    assert_eq!(Arch::new("linux", "ppc64le").package_cpu(), "ppc64le");
  }

  #[test]
  fn build_type_release_classification() {
    assert!(BuildType::Release.is_release_like());
    assert!(BuildType::RelWithDebInfo.is_release_like());
    assert!(!BuildType::Debug.is_release_like());
    assert!(!BuildType::MinSizeRel.is_release_like());
    assert!(BuildType::RelWithDebInfo.has_embedded_debug_info());
    assert!(!BuildType::Release.has_embedded_debug_info());
  }

  #[test]
  fn sanitizer_parses_cmake_spelling() {
    assert_eq!("memory".parse::<Sanitizer>().unwrap(), Sanitizer::Memory);
    assert_eq!(Sanitizer::Thread.version_tag(), "tsan");
    assert!("leak".parse::<Sanitizer>().is_err());
  }

  #[test]
  fn product_name_validation() {
    let name: ProductName = "MyScale".parse().unwrap();
    assert_eq!(name.lower(), "myscale");
    assert!(name.is_same_product("myscale"));
    assert!("my scale".parse::<ProductName>().is_err());
    assert!("../etc".parse::<ProductName>().is_err());
    assert!("-rf".parse::<ProductName>().is_err());
  }
}
