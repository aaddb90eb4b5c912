use hearth_core::{MemberId, ModelName};
use hearth_sync::{DelegationError, FetchError, RegistryError};

#[derive(Clone, Debug, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Delegation(#[from] DelegationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The operation only makes sense for the local user.
    #[error("{model} does not support {operation}")]
    Unsupported {
        model: ModelName,
        operation: &'static str,
    },

    /// An alternate-context extension was asked to load before being scoped.
    #[error("{model} has no member selected")]
    NoMemberSelected { model: ModelName },

    #[error("unknown team member {member}")]
    UnknownMember { member: MemberId },
}

impl ModelError {
    pub fn is_call_in_progress(&self) -> bool {
        matches!(self, Self::Fetch(e) if e.is_call_in_progress())
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
