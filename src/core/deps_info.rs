//! Install information for resolved dependencies.
//!
//! Dependencies are built and installed by an external service; this module
//! only records where each one landed. The information comes either from a
//! TOML file:
//!
//! ```toml
//! [OpenSSL]
//! rootpath = "/opt/deps/openssl"
//! libs = ["ssl", "crypto"]
//!
//! [zlib]
//! rootpath = "/opt/deps/zlib"
//! ```
//!
//! or from `name=prefix` pairs on the command line, in which case the usual
//! `include`/`lib`/`bin` layout under the prefix is assumed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::dependency::Requirement;
use crate::core::errors::ConfigError;

/// Install information for one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepCppInfo {
    pub rootpath: PathBuf,
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,
    #[serde(default)]
    pub lib_paths: Vec<PathBuf>,
    #[serde(default)]
    pub bin_paths: Vec<PathBuf>,
    #[serde(default)]
    pub libs: Vec<String>,
    #[serde(default)]
    pub defines: Vec<String>,
}

impl DepCppInfo {
    /// Standard prefix layout for a named dependency.
    pub fn from_prefix(name: &str, root: impl Into<PathBuf>) -> Self {
        let mut info = DepCppInfo {
            rootpath: root.into(),
            include_paths: Vec::new(),
            lib_paths: Vec::new(),
            bin_paths: Vec::new(),
            libs: default_libs(name),
            defines: Vec::new(),
        };
        info.fill_layout();
        info
    }

    /// Fill empty path lists from the root.
    fn fill_layout(&mut self) {
        if self.include_paths.is_empty() {
            self.include_paths.push(self.rootpath.join("include"));
        }
        if self.lib_paths.is_empty() {
            self.lib_paths.push(self.rootpath.join("lib"));
        }
        if self.bin_paths.is_empty() {
            self.bin_paths.push(self.rootpath.join("bin"));
        }
    }
}

fn default_libs(name: &str) -> Vec<String> {
    let libs: &[&str] = match name.to_lowercase().as_str() {
        "openssl" => &["ssl", "crypto"],
        "libssh2" => &["ssh2"],
        "zlib" => &["z"],
        _ => &[],
    };
    libs.iter().map(|s| s.to_string()).collect()
}

/// A `name=prefix` pair from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepPrefix {
    pub name: String,
    pub prefix: PathBuf,
}

impl FromStr for DepPrefix {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (name, prefix) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=PATH, got `{}`", s))?;
        if name.is_empty() || prefix.is_empty() {
            return Err(format!("expected NAME=PATH, got `{}`", s));
        }
        Ok(DepPrefix {
            name: name.to_string(),
            prefix: PathBuf::from(prefix),
        })
    }
}

/// Install information for every resolved dependency, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepsCppInfo {
    deps: BTreeMap<String, DepCppInfo>,
}

impl DepsCppInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dependency info: {}", path.display()))?;
        let mut info: DepsCppInfo = toml::from_str(&contents)
            .with_context(|| format!("failed to parse dependency info: {}", path.display()))?;
        for (name, dep) in info.deps.iter_mut() {
            dep.fill_layout();
            if dep.libs.is_empty() {
                dep.libs = default_libs(name);
            }
        }
        Ok(info)
    }

    /// Add or replace a dependency.
    pub fn insert(&mut self, name: impl Into<String>, info: DepCppInfo) {
        self.deps.insert(name.into(), info);
    }

    /// Add dependencies from `name=prefix` pairs, overriding file entries.
    pub fn extend_prefixes(&mut self, prefixes: &[DepPrefix]) {
        for p in prefixes {
            self.insert(p.name.clone(), DepCppInfo::from_prefix(&p.name, &p.prefix));
        }
    }

    /// Look up a dependency by name.
    pub fn get(&self, name: &str) -> Result<&DepCppInfo, ConfigError> {
        self.deps
            .get(name)
            .ok_or_else(|| ConfigError::DependencyNotInstalled {
                name: name.to_string(),
            })
    }

    /// Every declared requirement must have install information.
    pub fn check(&self, requirements: &[Requirement]) -> Result<(), ConfigError> {
        for req in requirements {
            self.get(&req.name)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DepCppInfo)> {
        self.deps.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_prefix_layout() {
        let info = DepCppInfo::from_prefix("OpenSSL", "/opt/openssl");
        assert_eq!(info.lib_paths, vec![PathBuf::from("/opt/openssl/lib")]);
        assert_eq!(info.include_paths, vec![PathBuf::from("/opt/openssl/include")]);
        assert_eq!(info.libs, vec!["ssl", "crypto"]);
    }

    #[test]
    fn test_load_from_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("deps.toml");
        std::fs::write(
            &path,
            r#"
[zlib]
rootpath = "/deps/zlib"

[libssh2]
rootpath = "/deps/ssh2"
lib_paths = ["/deps/ssh2/lib64"]
libs = ["ssh2"]
"#,
        )
        .unwrap();

        let deps = DepsCppInfo::load(&path).unwrap();
        assert_eq!(deps.get("zlib").unwrap().libs, vec!["z"]);
        assert_eq!(
            deps.get("libssh2").unwrap().lib_paths,
            vec![PathBuf::from("/deps/ssh2/lib64")]
        );
    }

    #[test]
    fn test_missing_dependency() {
        let deps = DepsCppInfo::new();
        let err = deps.get("zlib").unwrap_err();
        assert!(matches!(err, ConfigError::DependencyNotInstalled { .. }));
    }

    #[test]
    fn test_parse_prefix() {
        let p: DepPrefix = "zlib=/opt/zlib".parse().unwrap();
        assert_eq!(p.name, "zlib");
        assert_eq!(p.prefix, PathBuf::from("/opt/zlib"));
        assert!("zlib".parse::<DepPrefix>().is_err());
        assert!("=/opt".parse::<DepPrefix>().is_err());
    }
}
