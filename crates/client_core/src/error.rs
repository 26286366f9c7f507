use shared::domain::UserId;
use thiserror::Error;

/// Why a group-creation request was rejected before reaching the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidGroupReason {
    MissingName,
    NoMembersSelected,
}

impl std::fmt::Display for InvalidGroupReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => f.write_str("group name must not be empty"),
            Self::NoMembersSelected => f.write_str("no members selected"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("directory search failed: {source}")]
    DirectoryUnavailable { source: anyhow::Error },
    #[error("failed to open conversation with user {target_user_id}: {source}")]
    ConversationAccessFailed {
        target_user_id: UserId,
        source: anyhow::Error,
    },
    #[error("group creation failed: {detail}")]
    GroupCreationFailed { detail: String },
    #[error("invalid group request: {reason}")]
    InvalidGroupRequest { reason: InvalidGroupReason },
}
