//! Declared recipe metadata.

use std::path::PathBuf;

use url::Url;

use crate::core::errors::ConfigError;
use crate::core::version::LibVersion;

pub const RECIPE_NAME: &str = "libcurl";
pub const RECIPE_VERSION: &str = "7.52.1";
pub const RECIPE_URL: &str = "http://github.com/bincrafters/conan-libcurl";
pub const RECIPE_LICENSE: &str = "https://curl.haxx.se/docs/copyright.html";
pub const RECIPE_WEBSITE: &str = "https://curl.haxx.se";
pub const RECIPE_DESCRIPTION: &str =
    "command line tool and library for transferring data with URLs";

/// Source archive URL; `{version}` is substituted.
pub const DEFAULT_SOURCE_URL: &str = "https://curl.haxx.se/download/curl-{version}.tar.gz";

/// Trust-anchor bundle shipped with every package.
pub const DEFAULT_CACERT_URL: &str = "https://curl.haxx.se/ca/cacert.pem";

/// Recipe identity plus where its sources come from.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub name: String,
    pub version: LibVersion,
    pub source_url: String,
    pub cacert_url: String,
    /// Expected SHA-256 of the source archive, if pinned
    pub sha256: Option<String>,
    /// Directory whose patch files (`lib_Makefile.am.new`) replace the shipped ones
    pub patches_dir: Option<PathBuf>,
}

impl Recipe {
    /// Recipe for a given library version with default source locations.
    pub fn new(version: LibVersion) -> Self {
        Recipe {
            name: RECIPE_NAME.to_string(),
            version,
            source_url: DEFAULT_SOURCE_URL.to_string(),
            cacert_url: DEFAULT_CACERT_URL.to_string(),
            sha256: None,
            patches_dir: None,
        }
    }

    /// Recipe at its declared version.
    pub fn declared() -> Result<Self, ConfigError> {
        Ok(Recipe::new(LibVersion::parse(RECIPE_VERSION)?))
    }

    /// Archive URL with the version substituted.
    pub fn archive_url(&self) -> anyhow::Result<Url> {
        let raw = self.source_url.replace("{version}", &self.version.to_string());
        Ok(Url::parse(&raw)?)
    }

    pub fn cacert_url(&self) -> anyhow::Result<Url> {
        let raw = self.cacert_url.replace("{version}", &self.version.to_string());
        Ok(Url::parse(&raw)?)
    }

    /// Top-level directory inside the upstream archive.
    pub fn archive_root(&self) -> String {
        format!("curl-{}", self.version)
    }

    /// Descriptive fields published with the package, as `(key, value)`.
    pub fn about(&self) -> [(&'static str, &'static str); 4] {
        [
            ("description", RECIPE_DESCRIPTION),
            ("homepage", RECIPE_WEBSITE),
            ("license", RECIPE_LICENSE),
            ("recipe", RECIPE_URL),
        ]
    }

    /// `name/version` reference.
    pub fn reference(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_recipe() {
        let recipe = Recipe::declared().unwrap();
        assert_eq!(recipe.reference(), "libcurl/7.52.1");
        assert_eq!(recipe.archive_root(), "curl-7.52.1");
        assert!(recipe
            .about()
            .contains(&("license", "https://curl.haxx.se/docs/copyright.html")));
    }

    #[test]
    fn test_archive_url_is_templated() {
        let recipe = Recipe::new(LibVersion::parse("7.60.0").unwrap());
        assert_eq!(
            recipe.archive_url().unwrap().as_str(),
            "https://curl.haxx.se/download/curl-7.60.0.tar.gz"
        );
        assert_eq!(
            recipe.cacert_url().unwrap().as_str(),
            "https://curl.haxx.se/ca/cacert.pem"
        );
    }
}
