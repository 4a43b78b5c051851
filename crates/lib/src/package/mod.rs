//! Turning the staging tree into distributable artifacts.
//!
//! # Submodules
//!
//! - [`archive`] - tarball writing
//!
//! The pipeline documents the tree, always writes the two tarballs, and in
//! packaging mode additionally runs the native packager and sweeps the output
//! directory down to artifacts only.

pub mod archive;
mod types;

pub use types::*;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::consts::{ARTIFACT_EXTENSIONS, DOC_FILES, PACKAGER};
use crate::environment::Environment;
use crate::process::{CommandRunner, CommandSpec, ProcessError};

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("failed to walk {}: {source}", path.display())]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("I/O error on {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write archive {}: {source}", path.display())]
  Archive {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("no package descriptors matching {prefix}* in {}", dir.display())]
  NoDescriptors { dir: PathBuf, prefix: String },

  #[error(transparent)]
  Process(#[from] ProcessError),
}

fn io_err(path: &Path) -> impl Fn(std::io::Error) -> PackageError + '_ {
  move |e| PackageError::Io {
    path: path.to_path_buf(),
    source: e,
  }
}

fn has_extension(name: &str, extensions: &[&str]) -> bool {
  Path::new(name)
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|e| extensions.contains(&e))
}

/// Packages the staging tree in [`Environment::output_dir`].
///
/// A run owns the output directory for its whole duration. Two runs against
/// the same output directory at once are not supported and nothing here
/// locks it; callers must serialize them.
pub struct PackagingPipeline<'a> {
  env: &'a Environment,
  runner: &'a dyn CommandRunner,
}

impl<'a> PackagingPipeline<'a> {
  pub fn new(env: &'a Environment, runner: &'a dyn CommandRunner) -> Self {
    Self { env, runner }
  }

  /// Run every step for `request` and describe what was produced.
  ///
  /// Any failing step aborts the run. In packaging mode the final sweep
  /// deletes everything in the output directory that is not an artifact,
  /// including leftovers of earlier runs.
  pub fn package(&self, request: &PackageRequest) -> Result<Vec<PackageDescriptor>, PackageError> {
    self.stage_docs(request)?;

    let mut produced = self.write_archives(request)?;
    if request.package {
      let descriptors = self.copy_descriptors(request)?;
      produced.extend(self.build_packages(request, &descriptors)?);
      self.sweep()?;
    }

    info!(
      product = %request.product,
      version = %request.version,
      variant = %request.variant,
      artifacts = produced.len(),
      "packaging complete"
    );
    Ok(produced)
  }

  /// Install the documentation files, drop build-system metadata and prune
  /// foreign shell completions.
  pub fn stage_docs(&self, request: &PackageRequest) -> Result<(), PackageError> {
    let output = &self.env.output_dir;
    let product = request.product.lower();

    let docs = output.join("usr/share/doc").join(&product);
    fs::create_dir_all(&docs).map_err(io_err(&docs))?;
    for doc in DOC_FILES {
      let src = self.env.work_dir.join(doc);
      fs::copy(&src, docs.join(doc)).map_err(io_err(&src))?;
    }

    let cmake = output.join("usr/cmake");
    if cmake.exists() {
      debug!(path = %cmake.display(), "removing build-system metadata");
      fs::remove_dir_all(&cmake).map_err(io_err(&cmake))?;
    }

    let completions = output.join("usr/share/bash-completion/completions");
    if completions.is_dir() {
      for entry in WalkDir::new(&completions).min_depth(1) {
        let entry = entry.map_err(|e| PackageError::Walk {
          path: completions.clone(),
          source: e,
        })?;
        let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
        if entry.file_type().is_file() && !name.starts_with(&product) {
          debug!(path = %entry.path().display(), "pruning completion");
          fs::remove_file(entry.path()).map_err(io_err(entry.path()))?;
        }
      }
    }
    Ok(())
  }

  /// Write the primary and debug-symbol tarballs.
  pub fn write_archives(&self, request: &PackageRequest) -> Result<Vec<PackageDescriptor>, PackageError> {
    let output = &self.env.output_dir;

    let primary = archive::collect_entries(output, |name| {
      !(name.ends_with(".debug") || name.ends_with(".a") || has_extension(name, &ARTIFACT_EXTENSIONS))
    })?;
    let symbols = archive::collect_entries(output, |name| name.ends_with(".debug") || DOC_FILES.contains(&name))?;

    let primary_archive = archive::write_tgz(output, &request.archive_stem(), &primary)?;
    let debug_archive = archive::write_tgz(output, &request.debug_archive_stem(), &symbols)?;
    info!(
      primary = %primary_archive.display(),
      symbols = %debug_archive.display(),
      "wrote archives"
    );

    Ok(vec![
      self.descriptor(request, PackageFormat::Tgz, primary_archive),
      self.descriptor(request, PackageFormat::DebugTgz, debug_archive),
    ])
  }

  /// Copy `<package_dir>/<product>-*` into the output directory.
  pub fn copy_descriptors(&self, request: &PackageRequest) -> Result<Vec<PathBuf>, PackageError> {
    let dir = self.env.package_dir();
    let prefix = format!("{}-", request.product.lower());

    let mut copied = Vec::new();
    let entries = fs::read_dir(&dir).map_err(io_err(&dir))?;
    for entry in entries {
      let entry = entry.map_err(io_err(&dir))?;
      let name = entry.file_name().to_string_lossy().into_owned();
      if !name.starts_with(&prefix) || !entry.path().is_file() {
        continue;
      }
      let dest = self.env.output_dir.join(&name);
      fs::copy(entry.path(), &dest).map_err(io_err(&entry.path()))?;
      copied.push(dest);
    }

    if copied.is_empty() {
      return Err(PackageError::NoDescriptors { dir, prefix });
    }
    copied.sort();
    debug!(count = copied.len(), "copied package descriptors");
    Ok(copied)
  }

  /// The packager invocation for one config and format.
  pub fn packager_command(&self, request: &PackageRequest, config: &Path, format: PackageFormat) -> CommandSpec {
    CommandSpec::new(PACKAGER)
      .args(["package", "--config"])
      .arg(config.display().to_string())
      .args(["--packager", format.as_str()])
      .current_dir(&self.env.output_dir)
      .env("OS", request.arch.os.as_str())
      .env("ARCH", request.arch.package_cpu())
      .env("VERSION_STRING", request.package_version())
  }

  /// Run the packager for every copied descriptor and native format.
  pub fn build_packages(
    &self,
    request: &PackageRequest,
    configs: &[PathBuf],
  ) -> Result<Vec<PackageDescriptor>, PackageError> {
    let mut produced = Vec::new();
    for format in PackageFormat::NATIVE {
      let before = self.artifacts_with_extension(format.extension())?;
      for config in configs {
        info!(config = %config.display(), format = %format, version = %request.package_version(), "packaging");
        self.runner.run(&self.packager_command(request, config, format))?;
      }
      let after = self.artifacts_with_extension(format.extension())?;
      produced.extend(
        after
          .difference(&before)
          .map(|path| self.descriptor(request, format, path.clone())),
      );
    }
    Ok(produced)
  }

  fn artifacts_with_extension(&self, extension: &str) -> Result<BTreeSet<PathBuf>, PackageError> {
    let output = &self.env.output_dir;
    let mut found = BTreeSet::new();
    for entry in fs::read_dir(output).map_err(io_err(output))? {
      let entry = entry.map_err(io_err(output))?;
      let name = entry.file_name().to_string_lossy().into_owned();
      if has_extension(&name, &[extension]) {
        found.insert(entry.path());
      }
    }
    Ok(found)
  }

  /// Delete everything in the output directory that is not an artifact.
  /// Directories left empty are removed too.
  pub fn sweep(&self) -> Result<usize, PackageError> {
    let output = &self.env.output_dir;
    let mut removed = 0;
    for entry in WalkDir::new(output).min_depth(1).contents_first(true) {
      let entry = entry.map_err(|e| PackageError::Walk {
        path: output.clone(),
        source: e,
      })?;
      let path = entry.path();
      if entry.file_type().is_dir() {
        let empty = fs::read_dir(path).map_err(io_err(path))?.next().is_none();
        if empty {
          fs::remove_dir(path).map_err(io_err(path))?;
        }
        continue;
      }
      let name = entry.file_name().to_string_lossy();
      if !has_extension(&name, &ARTIFACT_EXTENSIONS) {
        fs::remove_file(path).map_err(io_err(path))?;
        removed += 1;
      }
    }
    debug!(removed, "swept output directory");
    Ok(removed)
  }

  fn descriptor(&self, request: &PackageRequest, format: PackageFormat, path: PathBuf) -> PackageDescriptor {
    PackageDescriptor {
      product: request.product.lower(),
      version: request.version.clone(),
      arch: request.arch.package_cpu().to_string(),
      variant: request.variant.clone(),
      format,
      path,
    }
  }
}
