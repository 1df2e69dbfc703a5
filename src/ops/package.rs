//! Artifact collection.
//!
//! Copies the license, the CA bundle, the CMake find module and the built
//! libraries into the package directory, then records what was packaged in
//! `curlpack-info.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::builder::context::BuildContext;
use crate::builder::strategy::BuildStrategy;
use crate::core::cpp_info::CppInfo;
use crate::core::dependency::declare_requirements;
use crate::core::errors::ConfigError;
use crate::core::recipe::Recipe;
use crate::core::settings::{Os, Settings};
use crate::sources::CACERT_FILE;
use crate::util::fs::{ensure_dir, posix_path, relative_path, symlink, write_string};
use crate::util::shell::{Shell, Status};

/// Package metadata file written at the package root.
pub const INFO_FILE: &str = "curlpack-info.toml";

/// File name of the shipped CMake find module.
pub const FIND_MODULE: &str = "FindCURL.cmake";

const FIND_MODULE_TEMPLATE: &str = include_str!("../../assets/FindCURL.cmake");
const FIND_MODULE_VERSION_LINE: &str = r#"set(CURL_VERSION_STRING "0")"#;

/// Errors raised while assembling a package.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("no files matching `{pattern}` under {}", .src.display())]
    NoMatches { pattern: String, src: PathBuf },

    #[error("find module template has no `CURL_VERSION_STRING` line")]
    FindModuleVersion,
}

/// Copy every file matching `pattern` below `src` into `<package>/<dst>`,
/// flattening directory structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRule {
    pub pattern: String,
    pub src: PathBuf,
    pub dst: &'static str,
    /// Recreate symlinks instead of copying their targets
    pub links: bool,
    pub ignore_case: bool,
    /// Only search `src` itself, not its subdirectories
    pub shallow: bool,
    /// An empty match is reported (and fatal when strict)
    pub required: bool,
}

impl CopyRule {
    fn new(pattern: &str, src: impl Into<PathBuf>, dst: &'static str) -> Self {
        CopyRule {
            pattern: pattern.to_string(),
            src: src.into(),
            dst,
            links: false,
            ignore_case: false,
            shallow: false,
            required: true,
        }
    }

    fn links(mut self) -> Self {
        self.links = true;
        self
    }

    fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    fn optional(mut self) -> Self {
        self.required = false;
        self.shallow = true;
        self
    }

    /// Copy the matches into `package_dir`, returning the destination paths.
    pub fn copy(&self, package_dir: &Path) -> Result<Vec<PathBuf>> {
        let pattern = Pattern::new(&self.pattern)
            .with_context(|| format!("invalid copy pattern `{}`", self.pattern))?;
        let match_opts = MatchOptions {
            case_sensitive: !self.ignore_case,
            ..MatchOptions::default()
        };

        if !self.src.is_dir() {
            return Ok(Vec::new());
        }

        let mut walker = WalkDir::new(&self.src).follow_links(false).sort_by_file_name();
        if self.shallow {
            walker = walker.max_depth(1);
        }

        let dst_dir = package_dir.join(self.dst);
        let mut copied = Vec::new();
        for entry in walker {
            let entry = entry.with_context(|| format!("failed to walk {}", self.src.display()))?;
            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !pattern.matches_with(&name, match_opts) {
                continue;
            }

            ensure_dir(&dst_dir)?;
            let target = dst_dir.join(entry.file_name());
            if target.symlink_metadata().is_ok() {
                std::fs::remove_file(&target)
                    .with_context(|| format!("failed to replace {}", target.display()))?;
            }

            if self.links && file_type.is_symlink() {
                let link = std::fs::read_link(entry.path())
                    .with_context(|| format!("failed to read link {}", entry.path().display()))?;
                symlink(&link, &target)
                    .with_context(|| format!("failed to create symlink {}", target.display()))?;
            } else {
                std::fs::copy(entry.path(), &target).with_context(|| {
                    format!(
                        "failed to copy {} to {}",
                        entry.path().display(),
                        target.display()
                    )
                })?;
            }
            tracing::debug!("packaged {}", target.display());
            copied.push(target);
        }
        Ok(copied)
    }
}

/// Library patterns for a configuration.
///
/// Visual Studio builds install their libraries through CMake and get no
/// patterns.
pub fn library_rules(ctx: &BuildContext) -> Result<Vec<CopyRule>, ConfigError> {
    let shared = ctx.options.shared;
    let rules = match BuildStrategy::select(&ctx.settings)? {
        BuildStrategy::CMakeProject => Vec::new(),
        BuildStrategy::CrossAutotools { .. } if shared => {
            windows_shared_rules(&ctx.build_dir.join("lib"))
        }
        BuildStrategy::Manual if shared => windows_shared_rules(&ctx.source_dir.join("builds")),
        BuildStrategy::CrossAutotools { .. } | BuildStrategy::Manual => Vec::new(),
        BuildStrategy::Autotools => {
            let pattern = match (shared, ctx.settings.os) {
                (true, Os::Macos) => "*.dylib",
                (true, _) => "*.so*",
                (false, _) => "*.a",
            };
            vec![CopyRule::new(pattern, &ctx.build_dir, "lib").links()]
        }
    };
    Ok(rules)
}

fn windows_shared_rules(src: &Path) -> Vec<CopyRule> {
    vec![
        CopyRule::new("*.dll", src, "bin"),
        CopyRule::new("*dll.a", src, "lib"),
        CopyRule::new("*.def", src, "lib"),
        CopyRule::new("*.lib", src, "lib"),
    ]
}

/// What ended up in a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// `name/version`
    pub reference: String,
    pub requires: Vec<String>,
    /// Package-relative paths, `/`-separated
    pub files: Vec<String>,
    pub settings: Settings,
    pub options: BTreeMap<String, bool>,
    pub cpp_info: CppInfo,
}

impl PackageInfo {
    /// Package name without the version.
    pub fn reference_name(&self) -> &str {
        self.reference
            .split_once('/')
            .map_or(self.reference.as_str(), |(name, _)| name)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("failed to serialize package info")?;
        write_string(path, &contents)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = crate::util::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse package info: {}", path.display()))
    }
}

/// Packaging knobs.
#[derive(Debug, Clone)]
pub struct PackageOptions {
    /// Directory the CA bundle was downloaded to
    pub cacert_dir: PathBuf,
    /// Treat an empty required match as an error
    pub strict: bool,
}

/// Write the find module with the library version filled in.
pub fn write_find_module(package_dir: &Path, version: &str) -> Result<()> {
    if !FIND_MODULE_TEMPLATE.contains(FIND_MODULE_VERSION_LINE) {
        return Err(PackageError::FindModuleVersion.into());
    }
    let contents = FIND_MODULE_TEMPLATE.replace(
        FIND_MODULE_VERSION_LINE,
        &format!(r#"set(CURL_VERSION_STRING "{}")"#, version),
    );
    write_string(&package_dir.join(FIND_MODULE), &contents)
}

/// Assemble the package for a built configuration.
pub fn package(
    ctx: &BuildContext,
    recipe: &Recipe,
    cpp_info: &CppInfo,
    opts: &PackageOptions,
    shell: &Shell,
) -> Result<PackageInfo> {
    shell.status(Status::Packaging, ctx.package_dir.display());
    ensure_dir(&ctx.package_dir)?;

    let mut rules = vec![
        CopyRule::new("COPYING", &ctx.source_dir, "licenses").ignore_case(),
        CopyRule::new(CACERT_FILE, &opts.cacert_dir, ".").optional(),
    ];
    rules.extend(library_rules(ctx)?);

    for rule in &rules {
        let copied = rule.copy(&ctx.package_dir)?;
        if !copied.is_empty() || !rule.required {
            continue;
        }
        if opts.strict {
            return Err(PackageError::NoMatches {
                pattern: rule.pattern.clone(),
                src: rule.src.clone(),
            }
            .into());
        }
        shell.warn(format!(
            "no files matching `{}` under {}",
            rule.pattern,
            rule.src.display()
        ));
    }

    write_find_module(&ctx.package_dir, &ctx.version.to_string())?;

    let info = PackageInfo {
        reference: recipe.reference(),
        requires: declare_requirements(&ctx.options, &ctx.settings)
            .iter()
            .filter(|r| r.is_public())
            .map(|r| r.reference())
            .collect(),
        files: package_files(&ctx.package_dir)?,
        settings: ctx.settings.clone(),
        options: ctx.options.to_map(),
        cpp_info: cpp_info.clone(),
    };
    info.save(&ctx.package_dir.join(INFO_FILE))?;
    Ok(info)
}

fn package_files(package_dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(package_dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        let rel = posix_path(&relative_path(package_dir, entry.path()));
        if rel != INFO_FILE {
            files.push(rel);
        }
    }
    Ok(files)
}
