//! Package options and their resolution.
//!
//! The option set is resolved in two steps: first the keys that are valid
//! for the target platform and library version are selected (with their
//! defaults), then user overrides are applied. A key pruned in the first
//! step is absent from the set; reading or overriding it is an error rather
//! than a silent `false`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::core::errors::ConfigError;
use crate::core::recipe::RECIPE_NAME;
use crate::core::settings::{Os, Settings};
use crate::core::version::{LibVersion, LIBPSL_MIN_VERSION};

/// Name of a package option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionKey {
    Shared,
    WithOpenssl,
    DisableThreads,
    WithLdap,
    CustomCacert,
    DarwinSsl,
    WithLibssh2,
    WithLibidn,
    WithLibrtmp,
    WithLibmetalink,
    WithLibpsl,
    WithLargemaxwritesize,
    WithNghttp2,
}

impl OptionKey {
    /// Every option key, in declaration order.
    pub const ALL: [OptionKey; 13] = [
        OptionKey::Shared,
        OptionKey::WithOpenssl,
        OptionKey::DisableThreads,
        OptionKey::WithLdap,
        OptionKey::CustomCacert,
        OptionKey::DarwinSsl,
        OptionKey::WithLibssh2,
        OptionKey::WithLibidn,
        OptionKey::WithLibrtmp,
        OptionKey::WithLibmetalink,
        OptionKey::WithLibpsl,
        OptionKey::WithLargemaxwritesize,
        OptionKey::WithNghttp2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKey::Shared => "shared",
            OptionKey::WithOpenssl => "with_openssl",
            OptionKey::DisableThreads => "disable_threads",
            OptionKey::WithLdap => "with_ldap",
            OptionKey::CustomCacert => "custom_cacert",
            OptionKey::DarwinSsl => "darwin_ssl",
            OptionKey::WithLibssh2 => "with_libssh2",
            OptionKey::WithLibidn => "with_libidn",
            OptionKey::WithLibrtmp => "with_librtmp",
            OptionKey::WithLibmetalink => "with_libmetalink",
            OptionKey::WithLibpsl => "with_libpsl",
            OptionKey::WithLargemaxwritesize => "with_largemaxwritesize",
            OptionKey::WithNghttp2 => "with_nghttp2",
        }
    }

    /// Default value before overrides.
    pub fn default_value(&self) -> bool {
        matches!(self, OptionKey::WithOpenssl | OptionKey::DarwinSsl)
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OptionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for OptionKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OptionKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownOption {
                name: s.to_string(),
            })
    }
}

/// A single `key=value` override, optionally prefixed with the package name
/// (`libcurl:shared=True`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionOverride {
    pub key: OptionKey,
    pub value: bool,
}

impl OptionOverride {
    pub fn new(key: OptionKey, value: bool) -> Self {
        OptionOverride { key, value }
    }
}

impl FromStr for OptionOverride {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (name, value) = raw
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedOverride {
                raw: raw.to_string(),
            })?;
        let name = name.trim();
        let key: OptionKey = match name.split_once(':') {
            None => name.parse()?,
            Some((RECIPE_NAME, option)) => option.trim().parse()?,
            Some(_) => {
                return Err(ConfigError::UnknownOption {
                    name: name.to_string(),
                })
            }
        };
        let value = parse_bool(value.trim()).ok_or_else(|| ConfigError::InvalidOptionValue {
            name: name.to_string(),
            value: value.trim().to_string(),
        })?;
        Ok(OptionOverride { key, value })
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Resolved, platform-valid option set.
///
/// `darwin_ssl` and `with_libpsl` are `None` when pruned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSet {
    pub shared: bool,
    pub with_openssl: bool,
    pub disable_threads: bool,
    pub with_ldap: bool,
    pub custom_cacert: bool,
    pub darwin_ssl: Option<bool>,
    pub with_libssh2: bool,
    pub with_libidn: bool,
    pub with_librtmp: bool,
    pub with_libmetalink: bool,
    pub with_libpsl: Option<bool>,
    pub with_largemaxwritesize: bool,
    pub with_nghttp2: bool,
}

impl OptionSet {
    /// Default options pruned for a platform and library version.
    pub fn defaults_for(version: &LibVersion, settings: &Settings) -> Self {
        let darwin_ssl = (settings.os == Os::Macos).then(|| OptionKey::DarwinSsl.default_value());
        let with_libpsl = version
            .supports_libpsl()
            .then(|| OptionKey::WithLibpsl.default_value());

        OptionSet {
            shared: OptionKey::Shared.default_value(),
            with_openssl: OptionKey::WithOpenssl.default_value(),
            disable_threads: OptionKey::DisableThreads.default_value(),
            with_ldap: OptionKey::WithLdap.default_value(),
            custom_cacert: OptionKey::CustomCacert.default_value(),
            darwin_ssl,
            with_libssh2: OptionKey::WithLibssh2.default_value(),
            with_libidn: OptionKey::WithLibidn.default_value(),
            with_librtmp: OptionKey::WithLibrtmp.default_value(),
            with_libmetalink: OptionKey::WithLibmetalink.default_value(),
            with_libpsl,
            with_largemaxwritesize: OptionKey::WithLargemaxwritesize.default_value(),
            with_nghttp2: OptionKey::WithNghttp2.default_value(),
        }
    }

    /// Prune, default, then apply overrides in order.
    pub fn resolve(
        version: &LibVersion,
        settings: &Settings,
        overrides: &[OptionOverride],
    ) -> Result<Self, ConfigError> {
        let mut options = OptionSet::defaults_for(version, settings);
        for ov in overrides {
            options.set(ov.key, ov.value).map_err(|err| match err {
                ConfigError::OptionNotAvailable { name, .. } => ConfigError::OptionNotAvailable {
                    reason: pruned_reason(ov.key, version, settings),
                    name,
                },
                other => other,
            })?;
        }
        tracing::debug!("resolved options for {} on {}: {}", version, settings, options);
        Ok(options)
    }

    /// Value of an option, `None` when the key was pruned.
    pub fn get(&self, key: OptionKey) -> Option<bool> {
        match key {
            OptionKey::Shared => Some(self.shared),
            OptionKey::WithOpenssl => Some(self.with_openssl),
            OptionKey::DisableThreads => Some(self.disable_threads),
            OptionKey::WithLdap => Some(self.with_ldap),
            OptionKey::CustomCacert => Some(self.custom_cacert),
            OptionKey::DarwinSsl => self.darwin_ssl,
            OptionKey::WithLibssh2 => Some(self.with_libssh2),
            OptionKey::WithLibidn => Some(self.with_libidn),
            OptionKey::WithLibrtmp => Some(self.with_librtmp),
            OptionKey::WithLibmetalink => Some(self.with_libmetalink),
            OptionKey::WithLibpsl => self.with_libpsl,
            OptionKey::WithLargemaxwritesize => Some(self.with_largemaxwritesize),
            OptionKey::WithNghttp2 => Some(self.with_nghttp2),
        }
    }

    /// Set an option. Fails for a pruned key.
    pub fn set(&mut self, key: OptionKey, value: bool) -> Result<(), ConfigError> {
        let slot = match key {
            OptionKey::Shared => &mut self.shared,
            OptionKey::WithOpenssl => &mut self.with_openssl,
            OptionKey::DisableThreads => &mut self.disable_threads,
            OptionKey::WithLdap => &mut self.with_ldap,
            OptionKey::CustomCacert => &mut self.custom_cacert,
            OptionKey::WithLibssh2 => &mut self.with_libssh2,
            OptionKey::WithLibidn => &mut self.with_libidn,
            OptionKey::WithLibrtmp => &mut self.with_librtmp,
            OptionKey::WithLibmetalink => &mut self.with_libmetalink,
            OptionKey::WithLargemaxwritesize => &mut self.with_largemaxwritesize,
            OptionKey::WithNghttp2 => &mut self.with_nghttp2,
            OptionKey::DarwinSsl => Self::present(&mut self.darwin_ssl, key)?,
            OptionKey::WithLibpsl => Self::present(&mut self.with_libpsl, key)?,
        };
        *slot = value;
        Ok(())
    }

    fn present(slot: &mut Option<bool>, key: OptionKey) -> Result<&mut bool, ConfigError> {
        slot.as_mut().ok_or_else(|| ConfigError::OptionNotAvailable {
            name: key.as_str().to_string(),
            reason: "pruned for this configuration".to_string(),
        })
    }

    /// Keys present in this set, in declaration order.
    pub fn keys(&self) -> Vec<OptionKey> {
        OptionKey::ALL
            .iter()
            .copied()
            .filter(|k| self.get(*k).is_some())
            .collect()
    }

    /// Present options with their values.
    pub fn iter(&self) -> impl Iterator<Item = (OptionKey, bool)> + '_ {
        OptionKey::ALL
            .iter()
            .filter_map(|k| self.get(*k).map(|v| (*k, v)))
    }

    /// Present options keyed by name.
    pub fn to_map(&self) -> BTreeMap<String, bool> {
        self.iter().map(|(k, v)| (k.as_str().to_string(), v)).collect()
    }

    /// SSL is provided by the platform (Secure Transport) instead of OpenSSL.
    pub fn uses_darwin_ssl(&self) -> bool {
        self.with_openssl && self.darwin_ssl == Some(true)
    }

    /// SSL is provided by the OpenSSL dependency.
    pub fn uses_openssl(&self) -> bool {
        self.with_openssl && !self.uses_darwin_ssl()
    }

    /// The package is statically linked.
    pub fn is_static(&self) -> bool {
        !self.shared
    }
}

fn pruned_reason(key: OptionKey, version: &LibVersion, settings: &Settings) -> String {
    match key {
        OptionKey::DarwinSsl => format!("only exists when targeting Macos, not {}", settings.os),
        OptionKey::WithLibpsl => format!(
            "requires libcurl >= {}, declared version is {}",
            LIBPSL_MIN_VERSION, version
        ),
        _ => "pruned for this configuration".to_string(),
    }
}

impl fmt::Display for OptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        f.write_str(&parts.join(" "))
    }
}
