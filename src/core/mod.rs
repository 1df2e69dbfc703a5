//! Core data structures.
//!
//! This module contains the types that describe one build configuration:
//! - Settings (OS, architecture, compiler, build type)
//! - The declared library version and its feature gates
//! - The resolved option set
//! - Dependency declarations and their install information
//! - Consumer-facing link metadata

pub mod cpp_info;
pub mod dependency;
pub mod deps_info;
pub mod errors;
pub mod options;
pub mod recipe;
pub mod settings;
pub mod version;

pub use cpp_info::CppInfo;
pub use dependency::{declare_build_requirements, declare_requirements, Requirement};
pub use deps_info::{DepCppInfo, DepPrefix, DepsCppInfo};
pub use errors::ConfigError;
pub use options::{OptionKey, OptionOverride, OptionSet};
pub use recipe::Recipe;
pub use settings::{Arch, BuildType, Compiler, Os, Settings};
pub use version::LibVersion;
