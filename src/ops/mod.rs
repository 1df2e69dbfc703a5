//! High-level operations.
//!
//! This module contains the implementation of curlpack commands.

pub mod ci;
pub mod create;
pub mod matrix;
pub mod package;
pub mod upload;

pub use ci::CiIdentity;
pub use create::{create, CreateOptions, CreateResult};
pub use matrix::{generate, plan_json, MatrixAxes, MatrixEntry, MatrixOptions, MatrixReport};
pub use package::{package, PackageError, PackageInfo, PackageOptions};
pub use upload::{upload_package, Credentials};
