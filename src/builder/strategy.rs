//! Selection of the external build invocation strategy.

use std::fmt;

use serde::Serialize;

use crate::core::errors::ConfigError;
use crate::core::settings::{Arch, Compiler, Os, Settings};

/// How the upstream build system is driven for a configuration.
///
/// Exactly one strategy applies to a configuration and it is chosen once,
/// from the compiler and operating system alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BuildStrategy {
    /// CMake project build with the Visual Studio toolchain.
    #[serde(rename = "cmake-project")]
    CMakeProject,
    /// `buildconf`, `configure`, `make` on a POSIX host.
    Autotools,
    /// Autotools under MSYS bash, cross-targeting MinGW.
    CrossAutotools { triple: &'static str },
    /// The bare `winbuild` nmake makefiles.
    Manual,
}

impl BuildStrategy {
    /// Pick the strategy for a configuration.
    pub fn select(settings: &Settings) -> Result<Self, ConfigError> {
        let strategy = match (settings.compiler, settings.os) {
            (Compiler::VisualStudio, _) => BuildStrategy::CMakeProject,
            (Compiler::Gcc, Os::Windows) => BuildStrategy::CrossAutotools {
                triple: mingw_triple(settings.arch)?,
            },
            (_, Os::Windows) => BuildStrategy::Manual,
            (_, _) => BuildStrategy::Autotools,
        };
        tracing::debug!("selected {} for {}", strategy, settings);
        Ok(strategy)
    }

    /// Executables that must be on PATH for this strategy.
    pub fn required_tools(&self) -> &'static [&'static str] {
        match self {
            BuildStrategy::CMakeProject => &["cmake"],
            BuildStrategy::Autotools => &["make"],
            BuildStrategy::CrossAutotools { .. } => &["bash"],
            BuildStrategy::Manual => &["nmake"],
        }
    }
}

fn mingw_triple(arch: Arch) -> Result<&'static str, ConfigError> {
    match arch {
        Arch::X86_64 => Ok("x86_64-w64-mingw32"),
        Arch::X86 => Ok("i686-w64-mingw32"),
        other => Err(ConfigError::Unsupported {
            reason: format!("MinGW builds are only available for x86 and x86_64, not {}", other),
        }),
    }
}

impl fmt::Display for BuildStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStrategy::CMakeProject => f.write_str("cmake project build"),
            BuildStrategy::Autotools => f.write_str("autotools build"),
            BuildStrategy::CrossAutotools { triple } => {
                write!(f, "cross autotools build ({})", triple)
            }
            BuildStrategy::Manual => f.write_str("winbuild nmake build"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(os: Os, arch: Arch, compiler: Compiler) -> BuildStrategy {
        BuildStrategy::select(&Settings::new(os, arch, compiler, "1")).unwrap()
    }

    #[test]
    fn test_serialized_kind() {
        let kind = |s: BuildStrategy| serde_json::to_value(s).unwrap()["kind"].clone();
        assert_eq!(kind(BuildStrategy::CMakeProject), "cmake-project");
        assert_eq!(kind(BuildStrategy::Manual), "manual");
        let cross = serde_json::to_value(BuildStrategy::CrossAutotools {
            triple: "i686-w64-mingw32",
        })
        .unwrap();
        assert_eq!(cross["kind"], "cross-autotools");
        assert_eq!(cross["triple"], "i686-w64-mingw32");
    }

    #[test]
    fn test_strategy_table() {
        assert_eq!(
            select(Os::Windows, Arch::X86_64, Compiler::VisualStudio),
            BuildStrategy::CMakeProject
        );
        assert_eq!(
            select(Os::Windows, Arch::X86_64, Compiler::Gcc),
            BuildStrategy::CrossAutotools {
                triple: "x86_64-w64-mingw32"
            }
        );
        assert_eq!(
            select(Os::Windows, Arch::X86, Compiler::Gcc),
            BuildStrategy::CrossAutotools {
                triple: "i686-w64-mingw32"
            }
        );
        assert_eq!(
            select(Os::Windows, Arch::X86_64, Compiler::Clang),
            BuildStrategy::Manual
        );
        assert_eq!(
            select(Os::Linux, Arch::X86_64, Compiler::Gcc),
            BuildStrategy::Autotools
        );
        assert_eq!(
            select(Os::Macos, Arch::X86_64, Compiler::AppleClang),
            BuildStrategy::Autotools
        );
    }

    #[test]
    fn test_mingw_arm_is_unsupported() {
        let settings = Settings::new(Os::Windows, Arch::Armv8, Compiler::Gcc, "7");
        assert!(matches!(
            BuildStrategy::select(&settings),
            Err(ConfigError::Unsupported { .. })
        ));
    }
}
