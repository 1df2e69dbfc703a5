//! Dependency declarations derived from the option set.

use std::fmt;

use serde::Serialize;

use crate::core::options::OptionSet;
use crate::core::settings::{Os, Settings};

pub const OPENSSL: &str = "OpenSSL";
pub const LIBSSH2: &str = "libssh2";
pub const ZLIB: &str = "zlib";

/// Whether a requirement propagates to consumers of the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// Linkage requested for a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    Shared,
    Static,
}

impl Linkage {
    pub fn from_shared(shared: bool) -> Self {
        if shared {
            Linkage::Shared
        } else {
            Linkage::Static
        }
    }

    pub fn is_shared(&self) -> bool {
        *self == Linkage::Shared
    }
}

/// A single dependency declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    /// Package name (`OpenSSL`, `zlib`, ...)
    pub name: String,
    /// Version range in the package repository's syntax
    pub version_req: String,
    /// Repository user/channel (`conan/stable`)
    pub channel: String,
    pub visibility: Visibility,
    /// Linkage forced onto the dependency; `None` leaves its default
    pub linkage: Option<Linkage>,
}

impl Requirement {
    pub fn new(name: &str, version_req: &str, channel: &str) -> Self {
        Requirement {
            name: name.to_string(),
            version_req: version_req.to_string(),
            channel: channel.to_string(),
            visibility: Visibility::Public,
            linkage: None,
        }
    }

    /// Hidden from consumers of the package.
    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = Some(linkage);
        self
    }

    /// Full reference, e.g. `zlib/[~=1.2]@conan/stable`.
    pub fn reference(&self) -> String {
        format!("{}/{}@{}", self.name, self.version_req, self.channel)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reference())?;
        if let Some(linkage) = self.linkage {
            write!(f, " ({})", if linkage.is_shared() { "shared" } else { "static" })?;
        }
        Ok(())
    }
}

/// Runtime requirements for a configuration, in declaration order.
pub fn declare_requirements(options: &OptionSet, settings: &Settings) -> Vec<Requirement> {
    let mut reqs = Vec::new();
    let linkage = Linkage::from_shared(options.shared);

    if options.uses_openssl() {
        reqs.push(Requirement::new(OPENSSL, "[>1.0.2a,<1.0.3]", "conan/stable").with_linkage(linkage));
    }

    // The MSVC build has no libssh2 support, so it is never requested there.
    if options.with_libssh2 && !settings.is_msvc() {
        reqs.push(Requirement::new(LIBSSH2, "[~=1.8]", "bincrafters/stable").with_linkage(linkage));
    }

    reqs.push(Requirement::new(ZLIB, "[~=1.2]", "conan/stable"));

    tracing::debug!(
        "declared requirements: {}",
        reqs.iter().map(|r| r.reference()).collect::<Vec<_>>().join(", ")
    );
    reqs
}

/// Tools needed only while building.
pub fn declare_build_requirements(settings: &Settings) -> Vec<Requirement> {
    if settings.os == Os::Windows && !settings.is_msvc() {
        vec![
            Requirement::new("mingw_installer", "1.0", "conan/stable").private(),
            Requirement::new("msys2_installer", "latest", "bincrafters/stable").private(),
        ]
    } else {
        Vec::new()
    }
}
