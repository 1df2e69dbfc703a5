//! Test fixtures for common test scenarios.
//!
//! Upstream source trees are reduced to the handful of files the source
//! patches touch, with the exact text those patches search for.

use std::path::{Path, PathBuf};

use crate::core::dependency::{LIBSSH2, OPENSSL, ZLIB};
use crate::core::deps_info::{DepCppInfo, DepsCppInfo};

/// Fixture for an extracted libcurl source tree.
#[derive(Debug, Clone)]
pub struct SourceFixture {
    files: Vec<(PathBuf, String)>,
}

impl SourceFixture {
    /// Files of an autotools/CMake source release.
    pub fn curl() -> Self {
        let files = [
            ("configure", "#!/bin/sh\n"),
            ("buildconf", "#!/bin/sh\n"),
            ("COPYING", "COPYRIGHT AND PERMISSION NOTICE\n"),
            ("configure.ac", "LIBS=\"-lz $LIBS\"\n"),
            (
                "Makefile.am",
                "SUBDIRS = lib src include\ninclude src/Makefile.inc\n",
            ),
            (
                "include/curl/curl.h",
                "#define CURL_MAX_WRITE_SIZE 16384\n",
            ),
            (
                "CMakeLists.txt",
                "cmake_minimum_required(VERSION 2.8 FATAL_ERROR)\nproject( CURL C )\ninclude(CurlSymbolHiding)\n",
            ),
            (
                "lib/CMakeLists.txt",
                "set_target_properties(${LIB_NAME} PROPERTIES\n  DEBUG_POSTFIX \"-d\"\n)\n",
            ),
            (
                "src/CMakeLists.txt",
                "add_executable(\n  ${EXE_NAME}\n)\ninstall(TARGETS ${EXE_NAME} DESTINATION bin)\n",
            ),
        ];
        SourceFixture {
            files: files
                .iter()
                .map(|(p, c)| (PathBuf::from(p), c.to_string()))
                .collect(),
        }
    }

    /// Add or replace a file.
    pub fn file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let path = path.into();
        self.files.retain(|(p, _)| *p != path);
        self.files.push((path, contents.into()));
        self
    }

    /// Write the tree under `dir`.
    pub fn write(&self, dir: &Path) {
        for (path, contents) in &self.files {
            let full = dir.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&full, contents).unwrap();
        }
    }
}

/// Install information for every dependency the recipe can declare,
/// rooted at `/deps/<name>`.
pub fn all_deps() -> DepsCppInfo {
    let mut deps = DepsCppInfo::new();
    for name in [OPENSSL, LIBSSH2, ZLIB] {
        deps.insert(name, DepCppInfo::from_prefix(name, format!("/deps/{}", name)));
    }
    deps
}
