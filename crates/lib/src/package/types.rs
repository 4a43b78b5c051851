use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::options::{Arch, BuildOptions, BuildType, ProductName, Sanitizer};

/// Kind of artifact the pipeline produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageFormat {
  /// Primary distributable tarball.
  Tgz,
  /// Debug-symbol companion tarball.
  DebugTgz,
  Deb,
  Rpm,
  Apk,
}

impl PackageFormat {
  /// Formats built by the external packager, in invocation order.
  pub const NATIVE: [PackageFormat; 3] = [PackageFormat::Deb, PackageFormat::Rpm, PackageFormat::Apk];

  pub fn as_str(&self) -> &'static str {
    match self {
      PackageFormat::Tgz => "tgz",
      PackageFormat::DebugTgz => "debug-tgz",
      PackageFormat::Deb => "deb",
      PackageFormat::Rpm => "rpm",
      PackageFormat::Apk => "apk",
    }
  }

  /// File extension of artifacts of this format.
  pub fn extension(&self) -> &'static str {
    match self {
      PackageFormat::Tgz | PackageFormat::DebugTgz => "tgz",
      PackageFormat::Deb => "deb",
      PackageFormat::Rpm => "rpm",
      PackageFormat::Apk => "apk",
    }
  }
}

impl fmt::Display for PackageFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Version annotation for the build flavor: the sanitizer tag, then `+debug`
/// for debug builds. Empty for plain release builds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VariantSuffix(String);

impl VariantSuffix {
  pub fn new(sanitizer: Option<Sanitizer>, build_type: BuildType) -> Self {
    let mut suffix = String::new();
    if let Some(sanitizer) = sanitizer {
      suffix.push('+');
      suffix.push_str(sanitizer.version_tag());
    }
    if build_type == BuildType::Debug {
      suffix.push_str("+debug");
    }
    Self(suffix)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// `version` with this suffix appended.
  pub fn apply(&self, version: &str) -> String {
    format!("{}{}", version, self.0)
  }
}

impl fmt::Display for VariantSuffix {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Everything the pipeline needs to know about the build being packaged.
#[derive(Debug, Clone)]
pub struct PackageRequest {
  pub product: ProductName,
  /// Base version string, without variant suffix.
  pub version: String,
  pub arch: Arch,
  pub variant: VariantSuffix,
  /// Also build native packages and sweep the output directory.
  pub package: bool,
}

impl PackageRequest {
  pub fn from_options(options: &BuildOptions, version: impl Into<String>) -> Self {
    Self {
      product: options.product.clone(),
      version: version.into(),
      arch: options.arch.clone(),
      variant: VariantSuffix::new(options.sanitizer, options.build_type),
      package: options.package,
    }
  }

  /// Stem of the primary archive, `<product>-<version>-<cpu>`.
  pub fn archive_stem(&self) -> String {
    format!("{}-{}-{}", self.product.lower(), self.version, self.arch.package_cpu())
  }

  /// Stem of the debug-symbol archive, `<product>-dbg-<version>-<cpu>`.
  pub fn debug_archive_stem(&self) -> String {
    format!("{}-dbg-{}-{}", self.product.lower(), self.version, self.arch.package_cpu())
  }

  /// Version handed to the native packager.
  pub fn package_version(&self) -> String {
    self.variant.apply(&self.version)
  }
}

/// One produced artifact.
///
/// `version` is the base version; `variant` is the build flavor suffix, which
/// native package versions carry and tarball names do not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDescriptor {
  pub product: String,
  pub version: String,
  pub arch: String,
  pub variant: VariantSuffix,
  pub format: PackageFormat,
  pub path: PathBuf,
}
