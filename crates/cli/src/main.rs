mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use relkit_lib::docker::{DEFAULT_IMAGE_VERSION, DEFAULT_REPOSITORY, DockerOptions};
use relkit_lib::options::{Arch, BuildOptions, BuildType, ProductName, Sanitizer};

use crate::cmd::{cmd_build, cmd_info, cmd_plan};
use crate::output::print_error;

/// relkit - configure, build and package the native database tree
#[derive(Parser)]
#[command(name = "relkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Options that decide what gets built.
#[derive(Args, Debug)]
struct BuildArgs {
  /// C compiler; the C++ compiler is derived from it
  #[arg(long, default_value = "clang-15")]
  compiler: String,

  /// Target as <os>-<cpu>, e.g. linux-aarch64
  #[arg(long, default_value = "linux-x86_64")]
  arch: Arch,

  /// Base profile under profile.d/
  #[arg(long, default_value = "default")]
  profile: String,

  /// Product name the artifacts are branded as
  #[arg(long, default_value = "ClickHouse")]
  name: ProductName,

  #[arg(long, default_value = "Release")]
  build_type: BuildType,

  /// Ninja job count (0 = ninja default)
  #[arg(long, default_value_t = 0)]
  build_jobs: u32,

  #[arg(long)]
  with_test: bool,

  #[arg(long)]
  with_shared_libraries: bool,

  #[arg(long)]
  with_clang_tidy: bool,

  /// One of address, thread, memory, undefined
  #[arg(long)]
  with_sanitizer: Option<Sanitizer>,

  #[arg(long)]
  with_coverage: bool,

  /// Build native packages and leave only artifacts in the output directory
  #[arg(long)]
  package: bool,

  #[arg(long)]
  official: bool,

  /// Source tree root (default: $RELKIT_WORK_DIR or the current directory)
  #[arg(long)]
  work_dir: Option<PathBuf>,
}

impl BuildArgs {
  fn options(&self) -> BuildOptions {
    BuildOptions {
      compiler: self.compiler.clone(),
      profile: self.profile.clone(),
      build_type: self.build_type,
      jobs: self.build_jobs,
      with_test: self.with_test,
      with_shared_libraries: self.with_shared_libraries,
      with_clang_tidy: self.with_clang_tidy,
      sanitizer: self.with_sanitizer,
      with_coverage: self.with_coverage,
      package: self.package,
      official: self.official,
      ..BuildOptions::new(self.arch.clone(), self.name.clone())
    }
  }
}

/// Options for running the build inside the builder container.
#[derive(Args, Debug)]
struct DockerArgs {
  /// Re-run this build inside the builder container
  #[arg(long)]
  docker: bool,

  /// Builder image repository
  #[arg(long, default_value = DEFAULT_REPOSITORY)]
  image: String,

  #[arg(long, default_value = DEFAULT_IMAGE_VERSION)]
  image_version: String,

  /// Build the image from the local Dockerfile instead of pulling it
  #[arg(long)]
  force_build_image: bool,

  /// Run the container as root instead of the calling user
  #[arg(long)]
  as_root: bool,

  /// Compiler cache directory (default: $HOME/.ccache)
  #[arg(long)]
  ccache: Option<PathBuf>,
}

impl DockerArgs {
  fn options(&self) -> Option<DockerOptions> {
    if !self.docker {
      return None;
    }
    let ccache = self.ccache.clone().unwrap_or_else(|| {
      let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
      home.join(".ccache")
    });
    Some(DockerOptions {
      repository: self.image.clone(),
      image_version: self.image_version.clone(),
      force_build_image: self.force_build_image,
      as_root: self.as_root,
      ..DockerOptions::new(ccache)
    })
  }
}

#[derive(Subcommand)]
enum Commands {
  /// Configure, build, install and package
  Build {
    #[command(flatten)]
    build: BuildArgs,

    #[command(flatten)]
    docker: DockerArgs,

    /// Staging and artifact directory
    #[arg(long)]
    output: PathBuf,
  },

  /// Show the composed configuration and commands without running them
  Plan {
    #[command(flatten)]
    build: BuildArgs,

    /// Staging and artifact directory
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show the resolved directories
  Info {
    /// Source tree root (default: $RELKIT_WORK_DIR or the current directory)
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Build { build, docker, output } => {
      cmd_build(&build.options(), docker.options(), build.work_dir.as_deref(), &output)
    }
    Commands::Plan { build, output, json } => cmd_plan(&build.options(), build.work_dir.as_deref(), &output, json),
    Commands::Info { work_dir, json } => cmd_info(work_dir.as_deref(), json),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
