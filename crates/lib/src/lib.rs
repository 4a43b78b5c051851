//! relkit-lib: build configuration and artifact packaging for the native tree
//!
//! This crate turns a small set of declared build options into:
//! - `ConfigurationSet`: the fully-resolved CMake settings for one build
//! - configure/build/install invocations of the external toolchain
//! - renamed, archived and packaged artifacts under an output directory
//!
//! Every invocation is a one-shot, synchronous transformation. External tools
//! are reached through the [`process::CommandRunner`] seam.

pub mod config;
pub mod consts;
pub mod docker;
pub mod environment;
pub mod invoke;
pub mod options;
pub mod package;
pub mod process;
pub mod profile;
pub mod rename;
pub mod vcs;
pub mod version;

#[cfg(test)]
pub mod testutil;
