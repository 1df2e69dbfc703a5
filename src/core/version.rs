//! Library version and the feature gates that depend on it.

use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::errors::ConfigError;

/// First release whose configure script understands `--with-libpsl`.
pub const LIBPSL_MIN_VERSION: Version = Version::new(7, 46, 0);

/// First release that switched IDN support to libidn2.
pub const IDN2_MIN_VERSION: Version = Version::new(7, 53, 0);

/// Declared version of the packaged library.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LibVersion(Version);

impl LibVersion {
    /// Parse a version string, failing on anything that is not `major.minor.patch`.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        Version::parse(s.trim())
            .map(LibVersion)
            .map_err(|source| ConfigError::InvalidVersion {
                version: s.to_string(),
                source,
            })
    }

    pub fn semver(&self) -> &Version {
        &self.0
    }

    /// Whether the `with_libpsl` option exists for this version.
    pub fn supports_libpsl(&self) -> bool {
        self.0 >= LIBPSL_MIN_VERSION
    }

    /// Whether IDN support is spelled `libidn2` for this version.
    pub fn uses_idn2(&self) -> bool {
        self.0 >= IDN2_MIN_VERSION
    }
}

impl fmt::Display for LibVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for LibVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LibVersion::parse(s)
    }
}

impl TryFrom<String> for LibVersion {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        LibVersion::parse(&s)
    }
}

impl From<LibVersion> for String {
    fn from(v: LibVersion) -> String {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_gates() {
        let old = LibVersion::parse("7.44.0").unwrap();
        assert!(!old.supports_libpsl());
        assert!(!old.uses_idn2());

        let mid = LibVersion::parse("7.52.1").unwrap();
        assert!(mid.supports_libpsl());
        assert!(!mid.uses_idn2());

        let new = LibVersion::parse("7.60.0").unwrap();
        assert!(new.supports_libpsl());
        assert!(new.uses_idn2());
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        assert!(LibVersion::parse("7.46.0").unwrap().supports_libpsl());
        assert!(!LibVersion::parse("7.45.9").unwrap().supports_libpsl());
        assert!(LibVersion::parse("7.53.0").unwrap().uses_idn2());
    }

    #[test]
    fn test_later_major_keeps_features() {
        let v = LibVersion::parse("8.1.2").unwrap();
        assert!(v.supports_libpsl());
        assert!(v.uses_idn2());
    }

    #[test]
    fn test_malformed_versions_fail() {
        for bad in ["", "7", "7.44", "seven.44.0", "7.x.0"] {
            let err = LibVersion::parse(bad).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidVersion { .. }), "{}", bad);
        }
    }
}
