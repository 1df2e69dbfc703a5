//! curlpack - a packaging recipe for libcurl
//!
//! This crate resolves build options for a target configuration, drives the
//! upstream build through the right toolchain, and assembles a
//! distributable package with its link metadata.

pub mod builder;
pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

/// Test utilities and mocks for curlpack unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a recording command runner and source tree
/// fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{CppInfo, OptionSet, Recipe, Settings};
pub use util::Shell;
