//! Consumer-facing link metadata for a built package.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::dependency::OPENSSL;
use crate::core::deps_info::DepsCppInfo;
use crate::core::options::OptionSet;
use crate::core::settings::{Os, Settings};
use crate::core::version::LibVersion;

/// Preprocessor define telling consumers the library is linked statically.
pub const STATIC_DEFINE: &str = "CURL_STATICLIB=1";

/// Platform frameworks needed by the Secure Transport backend.
pub const DARWIN_FRAMEWORKS: [&str; 2] = ["-framework Cocoa", "-framework Security"];

/// What a consumer needs to compile and link against the package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CppInfo {
    pub include_dirs: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub bin_dirs: Vec<String>,
    pub libs: Vec<String>,
    pub defines: Vec<String>,
    pub exelinkflags: Vec<String>,
    pub sharedlinkflags: Vec<String>,
}

impl CppInfo {
    /// Declare link metadata for a configuration.
    ///
    /// `deps` is only consulted for the OpenSSL libraries of a non-MinGW
    /// Windows build.
    pub fn declare(
        options: &OptionSet,
        settings: &Settings,
        version: &LibVersion,
        deps: &DepsCppInfo,
    ) -> Result<Self> {
        let mut info = CppInfo {
            include_dirs: vec!["include".to_string()],
            lib_dirs: vec!["lib".to_string()],
            bin_dirs: vec!["bin".to_string()],
            ..Default::default()
        };

        if settings.is_msvc() {
            info.push_lib(if options.shared { "libcurl_imp" } else { "libcurl" });
            info.push_windows_libs(options, deps)?;
        } else if settings.os == Os::Windows && !settings.is_mingw() {
            // winbuild names: libcurl.lib imports the dll, libcurl_a.lib is static
            info.push_lib(if options.shared { "libcurl" } else { "libcurl_a" });
            info.push_windows_libs(options, deps)?;
        } else {
            info.push_lib("curl");

            match settings.os {
                Os::Linux => {
                    info.push_lib("rt");
                    info.push_lib("pthread");
                    if options.with_libssh2 {
                        info.push_lib("ssh2");
                    }
                    if options.with_libidn {
                        info.push_lib(if version.uses_idn2() { "idn2" } else { "idn" });
                    }
                    if options.with_librtmp {
                        info.push_lib("rtmp");
                    }
                }
                Os::Macos => {
                    if options.with_ldap {
                        info.push_lib("ldap");
                    }
                    if options.uses_darwin_ssl() {
                        info.exelinkflags = DARWIN_FRAMEWORKS.iter().map(|s| s.to_string()).collect();
                        info.sharedlinkflags = info.exelinkflags.clone();
                    }
                }
                _ => {}
            }
        }

        if options.is_static() {
            info.defines.push(STATIC_DEFINE.to_string());
        }

        Ok(info)
    }

    fn push_windows_libs(&mut self, options: &OptionSet, deps: &DepsCppInfo) -> Result<()> {
        self.push_lib("Ws2_32");
        if options.with_ldap {
            self.push_lib("wldap32");
        }
        if options.uses_openssl() {
            for lib in &deps.get(OPENSSL)?.libs {
                self.push_lib(lib);
            }
        }
        Ok(())
    }

    fn push_lib(&mut self, lib: &str) {
        if !self.libs.iter().any(|l| l == lib) {
            self.libs.push(lib.to_string());
        }
    }

    /// Whether the static-linkage define is declared.
    pub fn declares_static(&self) -> bool {
        self.defines.iter().any(|d| d == STATIC_DEFINE)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize link metadata")
    }

    /// Write as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        crate::util::fs::write_string(path, &self.to_toml()?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = crate::util::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse link metadata: {}", path.display()))
    }
}
