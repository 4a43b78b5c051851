//! Gzip-compressed tarballs of the staging tree.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::debug;
use walkdir::WalkDir;

use super::PackageError;

/// Regular files and symlinks under `root` accepted by `include`, as paths
/// relative to `root`, sorted.
pub fn collect_entries(root: &Path, include: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>, PackageError> {
  let mut entries = Vec::new();
  for entry in WalkDir::new(root).min_depth(1) {
    let entry = entry.map_err(|e| PackageError::Walk {
      path: root.to_path_buf(),
      source: e,
    })?;
    let file_type = entry.file_type();
    if !(file_type.is_file() || file_type.is_symlink()) {
      continue;
    }
    let Some(name) = entry.file_name().to_str() else {
      continue;
    };
    if !include(name) {
      continue;
    }
    if let Ok(rel) = entry.path().strip_prefix(root) {
      entries.push(rel.to_path_buf());
    }
  }
  entries.sort();
  Ok(entries)
}

/// Write `<root>/<stem>.tgz` holding `entries`, each stored under `<stem>/`.
///
/// Symlinks are stored as links. Ownership and timestamps are normalized so
/// the archive depends only on the tree contents.
pub fn write_tgz(root: &Path, stem: &str, entries: &[PathBuf]) -> Result<PathBuf, PackageError> {
  let path = root.join(format!("{}.tgz", stem));
  let archive_err = |e| PackageError::Archive {
    path: path.clone(),
    source: e,
  };

  let file = File::create(&path).map_err(archive_err)?;
  let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
  let mut builder = tar::Builder::new(encoder);
  builder.mode(tar::HeaderMode::Deterministic);
  builder.follow_symlinks(false);

  for rel in entries {
    let name = Path::new(stem).join(rel);
    builder.append_path_with_name(root.join(rel), &name).map_err(archive_err)?;
  }

  let encoder = builder.into_inner().map_err(archive_err)?;
  encoder.finish().map_err(archive_err)?;
  debug!(path = %path.display(), entries = entries.len(), "wrote archive");
  Ok(path)
}
