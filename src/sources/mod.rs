//! Package sources.
//!
//! Fetching and unpacking the upstream release, plus the CA bundle that
//! ships with every package.

pub mod archive;

pub use archive::{fetch_cacert, fetch_sources, prepare_sources, CACERT_FILE};
