use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{setting} is required. Use .{builder_method}() to set it.")]
    MissingSetting {
        setting: &'static str,
        builder_method: &'static str,
    },

    #[error("Invalid {setting}: {message}")]
    InvalidSetting {
        setting: &'static str,
        message: String,
    },

    /// A feature flag is on but the bridge it drives was not injected.
    #[error(
        "{feature} enabled but no {bridge} provided. \
         Disable the feature or inject a {bridge} implementation."
    )]
    BridgeRequired {
        feature: &'static str,
        bridge: &'static str,
    },

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl Error {
    pub(crate) fn invalid(setting: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidSetting {
            setting,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_fix() {
        let missing = Error::MissingSetting {
            setting: "Cache directory",
            builder_method: "cache_dir",
        };
        assert_eq!(
            missing.to_string(),
            "Cache directory is required. Use .cache_dir() to set it."
        );

        let bridge = Error::BridgeRequired {
            feature: "Background caching",
            bridge: "BackgroundExecutor",
        };
        assert!(bridge
            .to_string()
            .ends_with("inject a BackgroundExecutor implementation."));

        assert_eq!(
            Error::invalid("default reciter", "cannot be empty").to_string(),
            "Invalid default reciter: cannot be empty"
        );
    }
}
