use std::time::Duration;

use hearth_core::ModelName;

/// Failures of the shared channel itself.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,
    #[error("channel send queue full")]
    Full,
    #[error("failed to encode frame: {0}")]
    Encode(String),
    #[error("failed to decode frame: {0}")]
    Decode(String),
}

/// Outcome classification for a remote fetch.
#[derive(Clone, Debug, thiserror::Error)]
pub enum FetchError {
    /// A second fetch was issued while one is outstanding on the same model.
    #[error("call already in progress for {name}")]
    CallInProgress { name: ModelName },

    /// The host answered with an explicit error payload.
    #[error("remote error: {0}")]
    Remote(String),

    #[error("failed to hydrate reply: {0}")]
    Hydrate(String),

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("no reply after {0:?}")]
    Timeout(Duration),

    /// The hub went away before the reply arrived.
    #[error("reply channel closed")]
    Closed,
}

impl FetchError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::CallInProgress { .. } => "call_in_progress",
            Self::Remote(_) => "remote",
            Self::Hydrate(_) => "hydrate",
            Self::Channel(_) => "channel",
            Self::Timeout(_) => "timeout",
            Self::Closed => "closed",
        }
    }

    pub fn is_call_in_progress(&self) -> bool {
        matches!(self, Self::CallInProgress { .. })
    }
}

/// Integration error: a call went through a proxy that was never told about
/// the method.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DelegationError {
    #[error("method not configured for delegation: {method}")]
    NotConfigured { method: String },
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Two model types were registered under the same name.
    #[error("model {name} is registered with a different type")]
    TypeMismatch { name: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_in_progress_names_model() {
        let err = FetchError::CallInProgress {
            name: ModelName::from_raw("journal"),
        };
        assert_eq!(err.to_string(), "call already in progress for journal");
        assert!(err.is_call_in_progress());
        assert_eq!(err.error_kind(), "call_in_progress");
    }

    #[test]
    fn channel_error_converts() {
        let err: FetchError = ChannelError::Closed.into();
        assert!(matches!(err, FetchError::Channel(ChannelError::Closed)));
        assert!(!err.is_call_in_progress());
    }

    #[test]
    fn delegation_error_display() {
        let err = DelegationError::NotConfigured {
            method: "load_default_feed".into(),
        };
        assert!(err.to_string().contains("load_default_feed"));
    }
}
