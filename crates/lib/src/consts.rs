//! Fixed names and paths shared across the pipeline.

/// Application name, used for environment variable prefixes.
pub const APP_NAME: &str = "relkit";

/// Product name the native tree installs under before any renaming.
pub const CANONICAL_NAME: &str = "ClickHouse";

/// Root of the builder layout inside the container image.
pub const CONTAINER_ROOT: &str = "/builder";

/// Version metadata file, relative to the work directory.
pub const VERSION_FILE: &str = "cmake/autogenerated_versions.txt";

/// Aggregate ninja target that builds every distributable binary.
pub const BUILD_TARGET: &str = "clickhouse-bundle";

/// Documentation files copied into the product doc directory and shipped in
/// both archives.
pub const DOC_FILES: [&str; 2] = ["LICENSE", "NOTICE.txt"];

/// Extensions of files that survive the final cleanup.
pub const ARTIFACT_EXTENSIONS: [&str; 4] = ["tgz", "deb", "rpm", "apk"];

/// External packager binary.
pub const PACKAGER: &str = "nfpm";
