//! Build context - one resolved configuration plus its directories.

use std::path::PathBuf;

use crate::core::deps_info::DepsCppInfo;
use crate::core::options::OptionSet;
use crate::core::settings::Settings;
use crate::core::version::LibVersion;

/// Everything a build backend needs for one configuration.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Extracted upstream sources
    pub source_dir: PathBuf,

    /// Out-of-tree build directory
    pub build_dir: PathBuf,

    /// Install prefix; becomes the package
    pub package_dir: PathBuf,

    /// Directory holding extra source files copied over upstream ones
    pub patches_dir: Option<PathBuf>,

    pub settings: Settings,
    pub options: OptionSet,
    pub version: LibVersion,

    /// Install information of the declared dependencies
    pub deps: DepsCppInfo,

    /// Parallel job count
    pub jobs: Option<usize>,
}

impl BuildContext {
    /// Create a context with the default `sources/`, `build/` and
    /// `package/` layout under a work directory.
    pub fn new(
        work_dir: impl Into<PathBuf>,
        settings: Settings,
        options: OptionSet,
        version: LibVersion,
        deps: DepsCppInfo,
    ) -> Self {
        let work_dir = work_dir.into();
        BuildContext {
            source_dir: work_dir.join("sources"),
            build_dir: work_dir.join("build"),
            package_dir: work_dir.join("package"),
            patches_dir: None,
            settings,
            options,
            version,
            deps,
            jobs: None,
        }
    }

    pub fn with_package_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.package_dir = dir.into();
        self
    }

    pub fn with_patches_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.patches_dir = dir;
        self
    }

    /// Set job count.
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Job count, falling back to the available parallelism.
    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}
