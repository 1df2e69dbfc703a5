//! Configuration error types.

use thiserror::Error;

/// Error raised while resolving a build configuration.
///
/// All of these are fatal: they are detected before any dependency is
/// looked up or any external tool is invoked.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid library version `{version}`: {source}")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("unknown option `{name}`")]
    UnknownOption { name: String },

    #[error("option `{name}` is not available: {reason}")]
    OptionNotAvailable { name: String, reason: String },

    #[error("invalid value `{value}` for option `{name}` (expected true or false)")]
    InvalidOptionValue { name: String, value: String },

    #[error("malformed option override `{raw}` (expected key=value)")]
    MalformedOverride { raw: String },

    #[error("unknown {kind} `{value}`")]
    UnknownSetting { kind: &'static str, value: String },

    #[error("unsupported configuration: {reason}")]
    Unsupported { reason: String },

    #[error("dependency `{name}` is required but its install location is unknown")]
    DependencyNotInstalled { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConfigError::UnknownOption {
            name: "with_gopher".to_string(),
        };
        assert_eq!(err.to_string(), "unknown option `with_gopher`");

        let err = ConfigError::UnknownSetting {
            kind: "os",
            value: "Plan9".to_string(),
        };
        assert_eq!(err.to_string(), "unknown os `Plan9`");
    }
}
