pub mod auth;
pub mod friends;
pub mod invites;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod notify;
pub mod users;

use axum::http::StatusCode;
use nudge_core::ChatError;
use tracing::{error, warn};

/// Map a domain error onto an HTTP status. Storage failures are logged
/// here; everything else is the caller's mistake and logs at debug
/// level at most.
pub fn status_for(err: ChatError) -> StatusCode {
    match err {
        ChatError::UserNotFound
        | ChatError::ThreadNotFound
        | ChatError::MessageNotFound
        | ChatError::FriendRequestNotFound
        | ChatError::InviteNotFound
        | ChatError::NotificationNotFound => StatusCode::NOT_FOUND,
        ChatError::Forbidden => StatusCode::FORBIDDEN,
        ChatError::EmptyBody | ChatError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        ChatError::Conflict(msg) => {
            warn!("conflict: {}", msg);
            StatusCode::CONFLICT
        }
        ChatError::Storage(err) => {
            error!("storage failure: {:#}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Run a blocking engine call off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, StatusCode>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ChatError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(status_for)
}
