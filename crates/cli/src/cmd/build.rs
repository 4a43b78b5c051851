//! Implementation of the `relkit build` command.
//!
//! Runs the whole pipeline on the host, or hands the invocation to the builder
//! container when `--docker` is given.

use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use relkit_lib::config::compose;
use relkit_lib::consts::CANONICAL_NAME;
use relkit_lib::docker::{DockerDelegate, DockerOptions};
use relkit_lib::environment::Environment;
use relkit_lib::invoke::BuildInvoker;
use relkit_lib::options::BuildOptions;
use relkit_lib::package::{PackageRequest, PackagingPipeline};
use relkit_lib::process::SystemRunner;
use relkit_lib::profile::ProfileStore;
use relkit_lib::rename::rename;
use relkit_lib::version::VersionInfo;

use crate::output::{format_bytes, format_duration, print_info, print_stat, print_success};

/// Execute the build command.
///
/// On the host this composes the configuration, configures and builds, installs
/// into `output`, rebrands the staged tree and packages it. With `docker` set,
/// the same command line is re-run inside the builder container instead.
pub fn cmd_build(
  options: &BuildOptions,
  docker: Option<DockerOptions>,
  work_dir: Option<&Path>,
  output: &Path,
) -> Result<()> {
  let started = Instant::now();
  let env = Environment::discover(work_dir, output).context("Failed to resolve directories")?;
  let runner = SystemRunner;

  if let Some(docker) = docker {
    // Mounted as-is; docker would create a missing one owned by root.
    fs::create_dir_all(&env.output_dir)
      .with_context(|| format!("Failed to create output directory: {}", env.output_dir.display()))?;

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let delegate = DockerDelegate::new(&env, &runner, docker);
    print_info(&format!("Building in container {}", delegate.options().image()));
    delegate.run(&argv).context("Containerized build failed")?;
    print_success(&format!("Build complete in {}", format_duration(started.elapsed())));
    return Ok(());
  }

  let store = ProfileStore::new(env.profile_dir());
  let set = compose(&store, &runner, &env, options).context("Failed to compose configuration")?;

  let invoker = BuildInvoker::new(&env, &runner);
  invoker
    .invoke(&set, &options.arch, options.jobs)
    .context("Native build failed")?;
  invoker.show_cache_stats();
  invoker.install().context("Install failed")?;

  rename(&env.output_dir, CANONICAL_NAME, options.product.as_str()).context("Failed to rename artifacts")?;

  let version = VersionInfo::load(&env.version_file())
    .and_then(|v| v.version_string())
    .context("Failed to read version metadata")?;
  info!(version = %version, "packaging");

  let request = PackageRequest::from_options(options, version);
  let produced = PackagingPipeline::new(&env, &runner)
    .package(&request)
    .context("Packaging failed")?;

  print_success(&format!(
    "Built {} {}{} in {}",
    options.product,
    request.version,
    request.variant,
    format_duration(started.elapsed())
  ));
  for artifact in &produced {
    let size = fs::metadata(&artifact.path).map(|m| m.len()).unwrap_or(0);
    print_stat(artifact.format.as_str(), &format!("{} ({})", artifact.path.display(), format_bytes(size)));
  }

  Ok(())
}
