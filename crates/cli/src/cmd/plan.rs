//! Implementation of the `relkit plan` command.
//!
//! Composes the configuration exactly as `build` would and prints it together
//! with the toolchain invocations, without running them.

use std::path::Path;

use anyhow::{Context, Result};

use relkit_lib::config::compose;
use relkit_lib::environment::Environment;
use relkit_lib::invoke::BuildInvoker;
use relkit_lib::options::BuildOptions;
use relkit_lib::process::SystemRunner;
use relkit_lib::profile::ProfileStore;

use crate::output::{print_command, print_info, print_json, print_stat, short_revision};

pub fn cmd_plan(options: &BuildOptions, work_dir: Option<&Path>, output: &Path, json: bool) -> Result<()> {
  let env = Environment::discover(work_dir, output).context("Failed to resolve directories")?;
  let runner = SystemRunner;

  let store = ProfileStore::new(env.profile_dir());
  let set = compose(&store, &runner, &env, options).context("Failed to compose configuration")?;

  let invoker = BuildInvoker::new(&env, &runner);
  let configure = invoker.configure_command(&set);
  let build = invoker.build_command(&set, options.jobs);
  let install = invoker.install_command();

  if json {
    let json_output = serde_json::json!({
      "environment": env,
      "options": options,
      "configuration": set,
      "commands": {
        "configure": configure.to_string(),
        "build": build.to_string(),
        "install": install.to_string(),
      },
    });
    return print_json(&json_output);
  }

  print_info(&format!("Plan for {} ({}, {})", options.product, options.arch, options.build_type));
  print_stat("Profile", &options.profile);
  if let Some(hash) = set.get("-DVERSION_GITHASH") {
    print_stat("Revision", short_revision(hash));
  }
  print_stat("Settings", &set.len().to_string());
  println!();

  for (key, value) in set.iter() {
    println!("  {}={}", key, value);
  }
  println!();

  println!("Commands:");
  print_command(&configure.to_string());
  print_command(&build.to_string());
  print_command(&install.to_string());

  Ok(())
}
