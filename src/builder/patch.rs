//! Source patches applied before configuring.
//!
//! Patches are literal search/replace edits on upstream files, plus whole
//! file replacements shipped with curlpack. A file of the same name in the
//! patches directory takes the place of the shipped one. A strict patch whose
//! search text is missing fails the build; a lenient one is skipped with a
//! debug log, since newer upstream releases already carry some of them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::core::options::OptionSet;
use crate::util::fs::{read_to_string, write_string};

/// Errors raised while patching sources.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("pattern `{pattern}` not found in {}", .file.display())]
    PatternNotFound { file: PathBuf, pattern: String },
}

/// One edit to the extracted sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePatch {
    /// Replace every occurrence of `search` in `file`.
    Replace {
        file: &'static str,
        search: &'static str,
        replace: &'static str,
        strict: bool,
    },
    /// Overwrite `file` with `contents`.
    WriteFile { file: &'static str, contents: String },
}

impl SourcePatch {
    fn replace(file: &'static str, search: &'static str, replace: &'static str) -> Self {
        SourcePatch::Replace {
            file,
            search,
            replace,
            strict: true,
        }
    }

    fn lenient(file: &'static str, search: &'static str, replace: &'static str) -> Self {
        SourcePatch::Replace {
            file,
            search,
            replace,
            strict: false,
        }
    }

    /// Target file, relative to the source directory.
    pub fn file(&self) -> &'static str {
        match self {
            SourcePatch::Replace { file, .. } | SourcePatch::WriteFile { file, .. } => *file,
        }
    }

    /// Apply to a source tree.
    pub fn apply(&self, source_dir: &Path) -> Result<()> {
        let target = source_dir.join(self.file());
        match self {
            SourcePatch::Replace {
                search,
                replace,
                strict,
                ..
            } => {
                replace_in_file(&target, search, replace, *strict)?;
            }
            SourcePatch::WriteFile { contents, .. } => {
                write_string(&target, contents)?;
                tracing::debug!("replaced {}", target.display());
            }
        }
        Ok(())
    }
}

/// Replace `search` with `replace` in a file.
///
/// Returns whether anything was replaced. A missing pattern is an error only
/// when `strict` is set.
pub fn replace_in_file(path: &Path, search: &str, replace: &str, strict: bool) -> Result<bool> {
    let contents = read_to_string(path)?;
    if !contents.contains(search) {
        if strict {
            return Err(PatchError::PatternNotFound {
                file: path.to_path_buf(),
                pattern: search.to_string(),
            }
            .into());
        }
        tracing::debug!("pattern `{}` not found in {}, skipping", search, path.display());
        return Ok(false);
    }
    write_string(path, &contents.replace(search, replace))?;
    Ok(true)
}

/// Patches applied regardless of the build strategy.
pub fn common_patches(options: &OptionSet) -> Vec<SourcePatch> {
    let mut patches = Vec::new();
    if options.with_largemaxwritesize {
        patches.push(SourcePatch::replace(
            "include/curl/curl.h",
            "define CURL_MAX_WRITE_SIZE 16384",
            "define CURL_MAX_WRITE_SIZE 10485760",
        ));
    }
    patches
}

const MINGW_SHARED_MAKEFILE: (&str, &str) = (
    "lib_Makefile.am.new",
    include_str!("../../assets/patches/lib_Makefile.am.new"),
);

/// Contents of a replacement file: `patches_dir/<name>` when it exists,
/// the shipped copy otherwise.
fn patch_file((name, shipped): (&str, &str), patches_dir: Option<&Path>) -> Result<String> {
    match patches_dir.map(|dir| dir.join(name)).filter(|p| p.is_file()) {
        Some(path) => {
            tracing::debug!("using {} from the patches directory", path.display());
            read_to_string(&path)
        }
        None => Ok(shipped.to_string()),
    }
}

/// Patches for the MinGW autotools build.
///
/// Shared builds replace `lib/Makefile.am` so libtool can link a DLL.
pub fn mingw_patches(options: &OptionSet, patches_dir: Option<&Path>) -> Result<Vec<SourcePatch>> {
    let mut patches = vec![SourcePatch::lenient("configure.ac", "-lz ", "-lzlib ")];

    if options.shared {
        patches.push(SourcePatch::WriteFile {
            file: "lib/Makefile.am",
            contents: patch_file(MINGW_SHARED_MAKEFILE, patches_dir)?,
        });
    }

    // only the library is built, not the curl tool
    patches.push(SourcePatch::replace(
        "Makefile.am",
        "SUBDIRS = lib src include",
        "SUBDIRS = lib include",
    ));
    patches.push(SourcePatch::replace(
        "Makefile.am",
        "include src/Makefile.inc",
        "",
    ));
    Ok(patches)
}

const CMAKE_PREAMBLE: &str = "project(CURL)\ncmake_minimum_required(VERSION 3.0)\n";

/// Patches for the Visual Studio CMake build.
pub fn cmake_patches() -> Vec<SourcePatch> {
    vec![
        SourcePatch::replace(
            "CMakeLists.txt",
            "cmake_minimum_required(VERSION 2.8 FATAL_ERROR)",
            CMAKE_PREAMBLE,
        ),
        SourcePatch::replace("CMakeLists.txt", "project( CURL C )", ""),
        SourcePatch::replace("CMakeLists.txt", "include(CurlSymbolHiding)", ""),
        SourcePatch::lenient(
            "lib/CMakeLists.txt",
            "  DEBUG_POSTFIX \"-d\"",
            "  DEBUG_POSTFIX \"\"",
        ),
        SourcePatch::replace("src/CMakeLists.txt", "add_executable(", "IF(0)\n add_executable("),
        SourcePatch::replace(
            "src/CMakeLists.txt",
            "install(TARGETS ${EXE_NAME} DESTINATION bin)",
            "ENDIF()",
        ),
    ]
}

/// Apply patches in order, stopping at the first failure.
pub fn apply_all(patches: &[SourcePatch], source_dir: &Path) -> Result<()> {
    for patch in patches {
        patch
            .apply(source_dir)
            .with_context(|| format!("failed to patch {}", patch.file()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::{OptionKey, OptionOverride};
    use crate::core::settings::{Arch, Compiler, Os, Settings};
    use crate::core::version::LibVersion;
    use tempfile::TempDir;

    fn options(overrides: &[(OptionKey, bool)]) -> OptionSet {
        let settings = Settings::new(Os::Windows, Arch::X86_64, Compiler::Gcc, "7");
        let overrides: Vec<_> = overrides
            .iter()
            .map(|(k, v)| OptionOverride::new(*k, *v))
            .collect();
        OptionSet::resolve(&LibVersion::parse("7.52.1").unwrap(), &settings, &overrides).unwrap()
    }

    #[test]
    fn test_replace_in_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("curl.h");
        std::fs::write(&path, "#define CURL_MAX_WRITE_SIZE 16384\n").unwrap();

        assert!(replace_in_file(&path, "16384", "10485760", true).unwrap());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "#define CURL_MAX_WRITE_SIZE 10485760\n"
        );
    }

    #[test]
    fn test_strict_missing_pattern_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Makefile.am");
        std::fs::write(&path, "SUBDIRS = lib include\n").unwrap();

        let err = replace_in_file(&path, "SUBDIRS = lib src include", "", true).unwrap_err();
        assert!(err.downcast_ref::<PatchError>().is_some());
        assert!(!replace_in_file(&path, "-lz ", "-lzlib ", false).unwrap());
    }

    #[test]
    fn test_largemaxwritesize_patch() {
        assert!(common_patches(&options(&[])).is_empty());

        let tmp = TempDir::new().unwrap();
        let header = tmp.path().join("include/curl/curl.h");
        write_string(&header, "#define CURL_MAX_WRITE_SIZE 16384\n").unwrap();

        let patches = common_patches(&options(&[(OptionKey::WithLargemaxwritesize, true)]));
        apply_all(&patches, tmp.path()).unwrap();
        assert!(read_to_string(&header).unwrap().contains("10485760"));
    }

    #[test]
    fn test_mingw_shared_uses_shipped_makefile() {
        let shared = options(&[(OptionKey::Shared, true)]);
        let tmp = TempDir::new().unwrap();
        let src = tmp.path();
        write_string(&src.join("configure.ac"), "LIBS=\"-lz $LIBS\"\n").unwrap();
        write_string(&src.join("lib/Makefile.am"), "lib_LTLIBRARIES = libcurl.la\n").unwrap();
        write_string(
            &src.join("Makefile.am"),
            "SUBDIRS = lib src include\ninclude src/Makefile.inc\n",
        )
        .unwrap();

        apply_all(&mingw_patches(&shared, None).unwrap(), src).unwrap();
        let makefile = read_to_string(&src.join("lib/Makefile.am")).unwrap();
        assert!(makefile.contains("-no-undefined"));
        assert!(makefile.contains("-lws2_32"));

        assert_eq!(mingw_patches(&options(&[]), None).unwrap().len(), 3);
    }

    #[test]
    fn test_patches_dir_overrides_shipped_makefile() {
        let shared = options(&[(OptionKey::Shared, true)]);
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("lib_Makefile.am.new"), "# local\n").unwrap();

        let patches = mingw_patches(&shared, Some(tmp.path())).unwrap();
        assert!(patches.iter().any(|p| matches!(
            p,
            SourcePatch::WriteFile { file: "lib/Makefile.am", contents } if contents == "# local\n"
        )));

        let empty = TempDir::new().unwrap();
        let patches = mingw_patches(&shared, Some(empty.path())).unwrap();
        assert!(patches.iter().any(|p| matches!(
            p,
            SourcePatch::WriteFile { contents, .. } if contents.contains("-no-undefined")
        )));
    }

    #[test]
    fn test_mingw_patches_apply() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path();
        write_string(&src.join("configure.ac"), "LIBS=\"-lz $LIBS\"\n").unwrap();
        write_string(
            &src.join("Makefile.am"),
            "SUBDIRS = lib src include\ninclude src/Makefile.inc\n",
        )
        .unwrap();

        apply_all(&mingw_patches(&options(&[]), None).unwrap(), src).unwrap();
        assert_eq!(
            read_to_string(&src.join("configure.ac")).unwrap(),
            "LIBS=\"-lzlib $LIBS\"\n"
        );
        assert_eq!(
            read_to_string(&src.join("Makefile.am")).unwrap(),
            "SUBDIRS = lib include\n\n"
        );
    }
}
