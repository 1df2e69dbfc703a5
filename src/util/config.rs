//! Configuration file support.
//!
//! Two configuration file locations are read:
//! - Global: `~/.curlpack/config.toml` - User-wide defaults
//! - Project: `.curlpack/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::recipe::Recipe;
use crate::core::version::LibVersion;

/// Tool configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Recipe metadata and source locations
    pub recipe: RecipeConfig,

    /// Build settings
    pub build: BuildConfig,

    /// Packaging settings
    pub package: PackageConfig,

    /// Matrix generation settings
    pub matrix: MatrixConfig,
}

/// Overrides for the declared recipe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeConfig {
    /// Library version to package (defaults to the declared version)
    pub version: Option<String>,

    /// Source archive URL template, `{version}` is substituted
    pub source_url: Option<String>,

    /// Trust-anchor bundle URL
    pub cacert_url: Option<String>,

    /// Expected SHA-256 of the source archive
    pub sha256: Option<String>,

    /// Directory with auxiliary patch files
    pub patches_dir: Option<PathBuf>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Parallel jobs passed to make/cmake
    pub jobs: Option<usize>,

    /// Dependency install information file
    pub deps_file: Option<PathBuf>,
}

/// Packaging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Fail when a library pattern matches nothing
    pub strict_artifacts: Option<bool>,
}

/// Matrix configuration. Empty lists fall back to environment variables and
/// then built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    pub archs: Vec<String>,
    pub build_types: Vec<String>,
    pub gcc_versions: Vec<String>,
    pub clang_versions: Vec<String>,
    pub apple_clang_versions: Vec<String>,
    pub visual_versions: Vec<String>,

    /// Configurations built concurrently
    pub jobs: Option<usize>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't exist
    /// or is invalid.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        merge_opt(&mut self.recipe.version, other.recipe.version);
        merge_opt(&mut self.recipe.source_url, other.recipe.source_url);
        merge_opt(&mut self.recipe.cacert_url, other.recipe.cacert_url);
        merge_opt(&mut self.recipe.sha256, other.recipe.sha256);
        merge_opt(&mut self.recipe.patches_dir, other.recipe.patches_dir);

        merge_opt(&mut self.build.jobs, other.build.jobs);
        merge_opt(&mut self.build.deps_file, other.build.deps_file);

        merge_opt(
            &mut self.package.strict_artifacts,
            other.package.strict_artifacts,
        );

        merge_vec(&mut self.matrix.archs, other.matrix.archs);
        merge_vec(&mut self.matrix.build_types, other.matrix.build_types);
        merge_vec(&mut self.matrix.gcc_versions, other.matrix.gcc_versions);
        merge_vec(&mut self.matrix.clang_versions, other.matrix.clang_versions);
        merge_vec(
            &mut self.matrix.apple_clang_versions,
            other.matrix.apple_clang_versions,
        );
        merge_vec(&mut self.matrix.visual_versions, other.matrix.visual_versions);
        merge_opt(&mut self.matrix.jobs, other.matrix.jobs);
    }

    /// Build the recipe description, applying configured overrides.
    ///
    /// A configured `sha256` pins the configured (or declared) version's
    /// archive only; it is dropped when another version is requested.
    pub fn recipe(&self, version_override: Option<&str>) -> Result<Recipe> {
        let pinned = match self.recipe.version.as_deref() {
            Some(v) => Recipe::new(LibVersion::parse(v)?),
            None => Recipe::declared()?,
        };
        let mut recipe = match version_override {
            Some(v) => Recipe::new(LibVersion::parse(v)?),
            None => pinned.clone(),
        };
        if let Some(ref url) = self.recipe.source_url {
            recipe.source_url = url.clone();
        }
        if let Some(ref url) = self.recipe.cacert_url {
            recipe.cacert_url = url.clone();
        }
        recipe.sha256 = match self.recipe.sha256 {
            Some(ref hash) if recipe.version != pinned.version => {
                tracing::warn!(
                    "ignoring sha256 {} pinned for {}, building {}",
                    hash,
                    pinned.version,
                    recipe.version
                );
                None
            }
            ref hash => hash.clone(),
        };
        recipe.patches_dir = self.recipe.patches_dir.clone();
        Ok(recipe)
    }

    pub fn strict_artifacts(&self) -> bool {
        self.package.strict_artifacts.unwrap_or(false)
    }
}

fn merge_opt<T>(dst: &mut Option<T>, src: Option<T>) {
    if src.is_some() {
        *dst = src;
    }
}

fn merge_vec<T>(dst: &mut Vec<T>, src: Vec<T>) {
    if !src.is_empty() {
        *dst = src;
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.curlpack/config.toml)
/// 2. Global config (~/.curlpack/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global config directory (~/.curlpack).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".curlpack"))
}

/// Get the global config path (~/.curlpack/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.curlpack/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".curlpack").join("config.toml")
}
