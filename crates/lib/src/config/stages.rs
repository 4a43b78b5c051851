//! Overlay stages of configuration composition.
//!
//! Each stage is a pure function from one [`ConfigurationSet`] to the next.
//! [`STAGES`] fixes their order; a later stage always wins on key collision.

use std::path::Path;

use tracing::warn;

use super::ConfigurationSet;
use crate::consts::CONTAINER_ROOT;
use crate::options::{Arch, BuildOptions, Sanitizer};
use crate::vcs::Revision;

/// Inputs shared by every stage.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
  pub options: &'a BuildOptions,
  pub work_dir: &'a Path,
  pub revision: &'a Revision,
}

pub type Stage = fn(ConfigurationSet, &StageContext<'_>) -> ConfigurationSet;

/// Composition pipeline, applied in order on top of the base profile.
pub const STAGES: [(&str, Stage); 7] = [
  ("layout", layout),
  ("compiler", compiler),
  ("metadata", metadata),
  ("arch", arch),
  ("features", features),
  ("sanitizer", sanitizer),
  ("packaging", packaging),
];

/// Programs that stay enabled under MemorySanitizer. The umbrella
/// `ENABLE_CLICKHOUSE_ALL` bundle does not build with it.
pub const MSAN_COMPONENTS: [&str; 13] = [
  "-DENABLE_CLICKHOUSE_SERVER",
  "-DENABLE_CLICKHOUSE_CLIENT",
  "-DENABLE_CLICKHOUSE_FORMAT",
  "-DENABLE_CLICKHOUSE_LOCAL",
  "-DENABLE_CLICKHOUSE_COMPRESSOR",
  "-DENABLE_CLICKHOUSE_KEEPER",
  "-DENABLE_CLICKHOUSE_COPIER",
  "-DENABLE_CLICKHOUSE_EXTRACT_FROM_CONFIG",
  "-DENABLE_CLICKHOUSE_ODBC_BRIDGE",
  "-DENABLE_CLICKHOUSE_KEEPER_CONVERTER",
  "-DENABLE_CLICKHOUSE_LIBRARY_BRIDGE",
  "-DENABLE_CLICKHOUSE_OBFUSCATOR",
  "-DENABLE_CLICKHOUSE_INSTALL",
];

/// Settings only the packaging stage writes.
pub const PACKAGING_KEYS: [&str; 5] = [
  "-DCMAKE_EXPORT_NO_PACKAGE_REGISTRY",
  "-DCMAKE_FIND_PACKAGE_NO_PACKAGE_REGISTRY",
  "-DCMAKE_AUTOGEN_VERBOSE",
  "-DSPLIT_DEBUG_SYMBOLS",
  "-DBUILD_STANDALONE_KEEPER",
];

pub fn layout(set: ConfigurationSet, _ctx: &StageContext<'_>) -> ConfigurationSet {
  set
    .with("-DCMAKE_INSTALL_PREFIX", "/usr")
    .with("-DCMAKE_INSTALL_SYSCONFDIR", "/etc")
    .with("-DCMAKE_INSTALL_LOCALSTATEDIR", "/var")
    .with("-DENABLE_THINLTO", "OFF")
    .with("-DENABLE_RUST", "OFF")
}

pub fn compiler(set: ConfigurationSet, ctx: &StageContext<'_>) -> ConfigurationSet {
  let cc = &ctx.options.compiler;
  set
    .with("-DCMAKE_C_COMPILER", cc.as_str())
    .with("-DCMAKE_CXX_COMPILER", cxx_compiler(cc))
}

/// Companion C++ compiler: the first `gcc` becomes `g++`, then the first
/// `clang` becomes `clang++`.
pub fn cxx_compiler(cc: &str) -> String {
  cc.replacen("gcc", "g++", 1).replacen("clang", "clang++", 1)
}

pub fn metadata(set: ConfigurationSet, ctx: &StageContext<'_>) -> ConfigurationSet {
  set
    .with("-DCMAKE_BUILD_TYPE", ctx.options.build_type.as_str())
    // Quoted: CMake hands the date to the compiler through a shell.
    .with("-DVERSION_DATE", format!("'{}'", ctx.revision.date))
    .with("-DVERSION_GITHASH", ctx.revision.hash.as_str())
}

pub fn arch(set: ConfigurationSet, ctx: &StageContext<'_>) -> ConfigurationSet {
  let Arch { os, cpu } = &ctx.options.arch;
  let toolchain = |os: &str| {
    ctx
      .work_dir
      .join("cmake")
      .join(os)
      .join(format!("toolchain-{}.cmake", cpu))
      .display()
      .to_string()
  };

  match (os.as_str(), cpu.as_str()) {
    ("linux", "x86_64" | "aarch64" | "ppc64le") | ("freebsd", "x86_64") => {
      set.with("-DCMAKE_TOOLCHAIN_FILE", toolchain(os.as_str()))
    }
    ("darwin", "x86_64" | "aarch64") => {
      let cctools = format!("{}/cctools/bin/{}-apple-darwin", CONTAINER_ROOT, cpu);
      set
        .with("-DCMAKE_AR:FILEPATH", format!("{}-ar", cctools))
        .with("-DCMAKE_INSTALL_NAME_TOOL", format!("{}-install_name_tool", cctools))
        .with("-DCMAKE_RANLIB:FILEPATH", format!("{}-ranlib", cctools))
        .with("-DLINKER_NAME", format!("{}-ld", cctools))
        .with("-DCMAKE_TOOLCHAIN_FILE", toolchain(os.as_str()))
        .with(
          "-DCMAKE_OSX_SYSROOT",
          format!("{}/toolchain/darwin-{}", CONTAINER_ROOT, cpu),
        )
    }
    _ => {
      warn!(arch = %ctx.options.arch, "no toolchain overlay for architecture, using host toolchain");
      set
    }
  }
}

pub fn features(mut set: ConfigurationSet, ctx: &StageContext<'_>) -> ConfigurationSet {
  let options = ctx.options;

  if options.with_test {
    set.set("-DENABLE_TESTS", "ON");
  }

  if options.with_shared_libraries {
    set.set("-DUSE_STATIC_LIBRARIES", "OFF");
    set.set("-DSPLIT_SHARED_LIBRARIES", "ON");
    set.set("-DENABLE_UTILS", "ON");
  }

  if options.with_clang_tidy {
    set.set("-DENABLE_CLANG_TIDY", "ON");
    set.set("-DENABLE_TESTS", "ON");
    set.set("-DENABLE_EXAMPLES", "ON");
    set.set("-DENABLE_UTILS", "ON");
  }

  if options.with_coverage {
    set.set("-DWITH_COVERAGE", "ON");
  }

  if options.official {
    set.set("-DCLICKHOUSE_OFFICIAL_BUILD", "ON");
  }

  set
}

pub fn sanitizer(mut set: ConfigurationSet, ctx: &StageContext<'_>) -> ConfigurationSet {
  let Some(sanitizer) = ctx.options.sanitizer else {
    return set;
  };

  set.set("-DSANITIZE", sanitizer.as_str());

  if sanitizer == Sanitizer::Memory {
    set.set("-DENABLE_EMBEDDED_COMPILER", "OFF");
    set.set("-DENABLE_CLICKHOUSE_ALL", "OFF");
    for component in MSAN_COMPONENTS {
      set.set(component, "ON");
    }
  }

  set
}

pub fn packaging(mut set: ConfigurationSet, ctx: &StageContext<'_>) -> ConfigurationSet {
  let options = ctx.options;
  if !options.package {
    return set;
  }

  set.set("-DENABLE_TESTS", "OFF");
  set.set("-DENABLE_UTILS", "OFF");
  set.set("-DCMAKE_EXPORT_NO_PACKAGE_REGISTRY", "ON");
  set.set("-DCMAKE_FIND_PACKAGE_NO_PACKAGE_REGISTRY", "ON");
  set.set("-DCMAKE_AUTOGEN_VERBOSE", "ON");

  if options.build_type.is_release_like() {
    if !options.build_type.has_embedded_debug_info() {
      set.set("-DSPLIT_DEBUG_SYMBOLS", "ON");
    }
    if options.sanitizer.is_none() {
      set.set("-DBUILD_STANDALONE_KEEPER", "ON");
    }
  }

  set
}
