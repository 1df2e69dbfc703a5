//! Build settings: operating system, architecture, compiler and build type.
//!
//! Settings identify the platform half of a build configuration. Their
//! string forms follow the package-manager conventions used by the matrix
//! (`Macos`, `x86_64`, `apple-clang`, `Visual Studio`).

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::errors::ConfigError;
use crate::util::process::ProcessBuilder;

/// Target operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Os {
    Linux,
    Macos,
    Windows,
    FreeBSD,
}

impl Os {
    /// Operating system of the running host.
    pub fn host() -> Self {
        match std::env::consts::OS {
            "macos" => Os::Macos,
            "windows" => Os::Windows,
            "freebsd" => Os::FreeBSD,
            _ => Os::Linux,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "Linux",
            Os::Macos => "Macos",
            Os::Windows => "Windows",
            Os::FreeBSD => "FreeBSD",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Os {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Os::Linux),
            "macos" | "darwin" => Ok(Os::Macos),
            "windows" => Ok(Os::Windows),
            "freebsd" => Ok(Os::FreeBSD),
            _ => Err(ConfigError::UnknownSetting {
                kind: "os",
                value: s.to_string(),
            }),
        }
    }
}

/// Target CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arch {
    X86,
    X86_64,
    Armv7,
    Armv8,
}

impl Arch {
    /// Architecture of the running host.
    pub fn host() -> Self {
        match std::env::consts::ARCH {
            "x86" => Arch::X86,
            "arm" => Arch::Armv7,
            "aarch64" => Arch::Armv8,
            _ => Arch::X86_64,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Armv7 => "armv7",
            Arch::Armv8 => "armv8",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x86" | "i686" | "i386" => Ok(Arch::X86),
            "x86_64" | "amd64" | "x64" => Ok(Arch::X86_64),
            "armv7" | "arm" => Ok(Arch::Armv7),
            "armv8" | "aarch64" | "arm64" => Ok(Arch::Armv8),
            _ => Err(ConfigError::UnknownSetting {
                kind: "arch",
                value: s.to_string(),
            }),
        }
    }
}

/// Compiler family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compiler {
    Gcc,
    Clang,
    AppleClang,
    VisualStudio,
}

impl Compiler {
    /// Default compiler family for an operating system.
    pub fn default_for(os: Os) -> Self {
        match os {
            Os::Macos => Compiler::AppleClang,
            Os::Windows => Compiler::VisualStudio,
            Os::FreeBSD => Compiler::Clang,
            Os::Linux => Compiler::Gcc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Compiler::Gcc => "gcc",
            Compiler::Clang => "clang",
            Compiler::AppleClang => "apple-clang",
            Compiler::VisualStudio => "Visual Studio",
        }
    }

    /// Executable probed when detecting the compiler version.
    fn probe_program(&self) -> &'static str {
        match self {
            Compiler::Gcc => "gcc",
            Compiler::Clang | Compiler::AppleClang => "clang",
            Compiler::VisualStudio => "cl",
        }
    }

    /// Detect the installed compiler version as `major.minor`.
    ///
    /// Returns `None` when the compiler is not installed or its output
    /// cannot be parsed. MSVC prints its banner on stderr.
    pub fn detect_version(&self) -> Option<String> {
        let output = ProcessBuilder::new(self.probe_program())
            .arg(if *self == Compiler::VisualStudio { "/?" } else { "--version" })
            .exec()
            .ok()?;
        let text = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        parse_compiler_version(&text)
    }
}

/// Extract the first `major.minor` version number from compiler output.
pub fn parse_compiler_version(text: &str) -> Option<String> {
    let re = Regex::new(r"(\d+)\.(\d+)(?:\.\d+)*").ok()?;
    let caps = re.captures(text)?;
    Some(format!("{}.{}", &caps[1], &caps[2]))
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compiler {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gcc" | "mingw" => Ok(Compiler::Gcc),
            "clang" => Ok(Compiler::Clang),
            "apple-clang" | "apple_clang" => Ok(Compiler::AppleClang),
            "visual studio" | "visual_studio" | "msvc" | "vs" => Ok(Compiler::VisualStudio),
            _ => Err(ConfigError::UnknownSetting {
                kind: "compiler",
                value: s.to_string(),
            }),
        }
    }
}

/// Build type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BuildType {
    #[default]
    Release,
    Debug,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Release => "Release",
            BuildType::Debug => "Debug",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "release" => Ok(BuildType::Release),
            "debug" => Ok(BuildType::Debug),
            _ => Err(ConfigError::UnknownSetting {
                kind: "build type",
                value: s.to_string(),
            }),
        }
    }
}

/// The platform half of a build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Settings {
    pub os: Os,
    pub arch: Arch,
    pub compiler: Compiler,
    pub compiler_version: String,
    pub build_type: BuildType,
}

impl Settings {
    /// Create settings for an explicit platform.
    pub fn new(os: Os, arch: Arch, compiler: Compiler, compiler_version: impl Into<String>) -> Self {
        Settings {
            os,
            arch,
            compiler,
            compiler_version: compiler_version.into(),
            build_type: BuildType::Release,
        }
    }

    pub fn with_build_type(mut self, build_type: BuildType) -> Self {
        self.build_type = build_type;
        self
    }

    /// MinGW: gcc targeting Windows.
    pub fn is_mingw(&self) -> bool {
        self.os == Os::Windows && self.compiler == Compiler::Gcc
    }

    pub fn is_msvc(&self) -> bool {
        self.compiler == Compiler::VisualStudio
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.os, self.arch, self.compiler, self.compiler_version, self.build_type
        )
    }
}
