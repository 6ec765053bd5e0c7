use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),
}

impl CoreError {
    /// Whether the call was refused by the access-control gate.
    pub fn is_unknown_client(&self) -> bool {
        matches!(
            self,
            CoreError::Playback(core_playback::PlaybackError::UnknownClient(_))
        )
    }
}

impl From<core_runtime::Error> for CoreError {
    fn from(err: core_runtime::Error) -> Self {
        match err {
            core_runtime::Error::CapabilityMissing {
                capability,
                message,
            } => CoreError::CapabilityMissing {
                capability,
                message,
            },
            core_runtime::Error::Config(message) => CoreError::Config(message),
            core_runtime::Error::Logging(message) => CoreError::InitializationFailed(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use core_playback::PlaybackError;

    #[test]
    fn test_runtime_errors_keep_their_kind() {
        let err: CoreError = core_runtime::Error::CapabilityMissing {
            capability: "MediaIndex".to_string(),
            message: "inject one".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::CapabilityMissing { .. }));

        let err: CoreError = core_runtime::Error::Config("bad".to_string()).into();
        assert_eq!(err.to_string(), "Configuration error: bad");
    }

    #[test]
    fn test_unknown_client_detection() {
        let err: CoreError = PlaybackError::UnknownClient("com.example.rogue".into()).into();
        assert!(err.is_unknown_client());
        assert!(!CoreError::Config("x".into()).is_unknown_client());
    }
}
