use thiserror::Error;

/// Domain error taxonomy. Constraint races (pair-key, message_index)
/// never appear here: the engine retries them internally and only a
/// non-constraint storage failure surfaces, as `Storage`.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("user not found")]
    UserNotFound,

    #[error("thread not found")]
    ThreadNotFound,

    #[error("message not found")]
    MessageNotFound,

    #[error("friend request not found")]
    FriendRequestNotFound,

    #[error("invite not found")]
    InviteNotFound,

    #[error("notification not found")]
    NotificationNotFound,

    #[error("not allowed")]
    Forbidden,

    #[error("message body is empty")]
    EmptyBody,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Plumbing-level state conflicts (duplicate friend request,
    /// already-accepted invite). Distinct from the internal
    /// constraint-race handling, which is never surfaced.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage unavailable: {0}")]
    Storage(anyhow::Error),
}

impl ChatError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

impl From<anyhow::Error> for ChatError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(err)
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
