use std::path::Path;

use anyhow::{Context, Result};

use relkit_lib::consts::APP_NAME;
use relkit_lib::docker::default_entrypoint;
use relkit_lib::environment::Environment;
use relkit_lib::version::VersionInfo;

use crate::output::{print_info, print_json, print_stat, print_warning};

pub fn cmd_info(work_dir: Option<&Path>, json: bool) -> Result<()> {
  let env = Environment::discover(work_dir, Path::new("output")).context("Failed to resolve directories")?;
  let version = VersionInfo::load(&env.version_file()).and_then(|v| v.version_string());

  if json {
    let json_output = serde_json::json!({
      "environment": env,
      "profile_dir": env.profile_dir(),
      "package_dir": env.package_dir(),
      "version": version.as_ref().ok(),
      "container_entrypoint": default_entrypoint(),
    });
    return print_json(&json_output);
  }

  print_info(&format!("{} v{}", APP_NAME, env!("CARGO_PKG_VERSION")));
  print_stat("Work dir", &env.work_dir.display().to_string());
  print_stat("Builder dir", &env.builder_dir.display().to_string());
  print_stat("Profiles", &env.profile_dir().display().to_string());
  print_stat("Packages", &env.package_dir().display().to_string());
  print_stat("Build dir", &env.build_dir.display().to_string());
  match version {
    Ok(version) => print_stat("Version", &version),
    Err(e) => print_warning(&format!("No version metadata: {}", e)),
  }

  Ok(())
}
