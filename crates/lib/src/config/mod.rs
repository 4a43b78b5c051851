//! Configuration composition.
//!
//! A build configuration is the base profile with every overlay stage of
//! [`stages::STAGES`] applied on top, in order. Later stages overwrite earlier
//! ones; re-ordering them changes the resulting configuration.
//!
//! # Submodules
//!
//! - [`stages`] - the individual overlay stages

pub mod stages;
mod types;

pub use types::*;

use thiserror::Error;
use tracing::{debug, info};

use crate::environment::Environment;
use crate::options::BuildOptions;
use crate::process::{CommandRunner, ProcessError};
use crate::profile::{ProfileError, ProfileStore};
use crate::vcs;

use stages::{STAGES, StageContext};

#[derive(Debug, Error)]
pub enum ComposeError {
  #[error(transparent)]
  Profile(#[from] ProfileError),

  #[error("failed to read version metadata from the repository: {0}")]
  VersionMetadata(#[source] ProcessError),
}

/// Compose the configuration for one build.
///
/// Loads the base profile, registers the work tree with git and captures the
/// current revision, then applies every overlay stage in order.
pub fn compose(
  store: &ProfileStore,
  runner: &dyn CommandRunner,
  env: &Environment,
  options: &BuildOptions,
) -> Result<ConfigurationSet, ComposeError> {
  let profile = store.load(&options.profile)?;
  let revision = vcs::current_revision(runner, &env.work_dir).map_err(ComposeError::VersionMetadata)?;

  let base: ConfigurationSet = profile.entries().collect();
  let ctx = StageContext {
    options,
    work_dir: &env.work_dir,
    revision: &revision,
  };

  let set = STAGES.iter().fold(base, |set, (name, stage)| {
    let before = set.len();
    let set = stage(set, &ctx);
    debug!(stage = %name, added = set.len() - before, "applied overlay");
    set
  });

  info!(profile = %profile.name, arch = %options.arch, settings = set.len(), "composed configuration");
  Ok(set)
}
