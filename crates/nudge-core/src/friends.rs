//! Friend-request bookkeeping. At most one request row exists per
//! unordered user pair; rejection allows a re-send (the row flips back
//! to pending). State changes fan out in-app notifications.

use nudge_db::parse_timestamp;
use nudge_types::api::{FriendEntry, PendingRequestEntry};
use nudge_types::models::FriendStatus;

use crate::engine::{ChatEngine, parse_uuid};
use crate::error::{ChatError, Result};

pub fn send_request(engine: &ChatEngine, from_username: &str, to_username: &str) -> Result<i64> {
    if from_username.eq_ignore_ascii_case(to_username) {
        return Err(ChatError::invalid("cannot send a friend request to yourself"));
    }
    let db = engine.db();
    let requester = db
        .get_user_by_username(from_username)?
        .ok_or(ChatError::UserNotFound)?;
    let recipient = db
        .get_user_by_username(to_username)?
        .ok_or(ChatError::UserNotFound)?;

    let request_id = match db.find_friend_request_between(&requester.id, &recipient.id)? {
        Some(existing) => match existing.status.as_str() {
            "accepted" => return Err(ChatError::conflict("already friends")),
            "pending" => return Err(ChatError::conflict("friend request already pending")),
            _ => {
                db.reset_friend_request_to_pending(existing.id)?;
                existing.id
            }
        },
        None => db.insert_friend_request(&requester.id, &recipient.id)?,
    };

    db.insert_notification(
        &recipient.id,
        "friend_request",
        "New Friend Request",
        &format!("{} sent you a friend request", requester.username),
        Some(&requester.id),
        Some(request_id),
    )?;
    Ok(request_id)
}

pub fn respond(
    engine: &ChatEngine,
    responder_id: &str,
    request_id: i64,
    accept: bool,
) -> Result<FriendStatus> {
    let db = engine.db();
    let responder = db.get_user_by_id(responder_id)?.ok_or(ChatError::UserNotFound)?;
    let request = db
        .get_friend_request(request_id)?
        .ok_or(ChatError::FriendRequestNotFound)?;

    if request.recipient_id != responder.id {
        return Err(ChatError::Forbidden);
    }
    if request.status != "pending" {
        return Err(ChatError::conflict(format!("request already {}", request.status)));
    }

    let status = if accept { "accepted" } else { "rejected" };
    db.set_friend_request_status(request_id, status)?;

    if accept {
        db.insert_notification(
            &request.requester_id,
            "friend_accepted",
            "Friend Request Accepted",
            &format!("{} accepted your friend request", responder.username),
            Some(&responder.id),
            Some(request_id),
        )?;
        Ok(FriendStatus::Friends)
    } else {
        Ok(FriendStatus::None)
    }
}

/// Relationship between two users from the first user's point of view.
pub fn relationship_status(
    engine: &ChatEngine,
    username: &str,
    other_username: &str,
) -> Result<(FriendStatus, Option<i64>)> {
    let db = engine.db();
    let user = db
        .get_user_by_username(username)?
        .ok_or(ChatError::UserNotFound)?;
    let other = db
        .get_user_by_username(other_username)?
        .ok_or(ChatError::UserNotFound)?;

    let Some(request) = db.find_friend_request_between(&user.id, &other.id)? else {
        return Ok((FriendStatus::None, None));
    };
    let status = match request.status.as_str() {
        "accepted" => FriendStatus::Friends,
        "pending" if request.requester_id == user.id => FriendStatus::PendingSent,
        "pending" => FriendStatus::PendingReceived,
        _ => FriendStatus::None,
    };
    Ok((status, Some(request.id)))
}

pub fn pending_requests(
    engine: &ChatEngine,
    user_id: &str,
) -> Result<(Vec<PendingRequestEntry>, Vec<PendingRequestEntry>)> {
    let db = engine.db();
    db.get_user_by_id(user_id)?.ok_or(ChatError::UserNotFound)?;

    let mut received = Vec::new();
    for request in db.pending_requests_received(user_id)? {
        let username = db
            .get_user_by_id(&request.requester_id)?
            .map(|u| u.username)
            .unwrap_or_else(|| "unknown".to_string());
        received.push(PendingRequestEntry {
            request_id: request.id,
            username,
            created_at: parse_timestamp(&request.created_at),
        });
    }

    let mut sent = Vec::new();
    for request in db.pending_requests_sent(user_id)? {
        let username = db
            .get_user_by_id(&request.recipient_id)?
            .map(|u| u.username)
            .unwrap_or_else(|| "unknown".to_string());
        sent.push(PendingRequestEntry {
            request_id: request.id,
            username,
            created_at: parse_timestamp(&request.created_at),
        });
    }

    Ok((received, sent))
}

pub fn friends_list(engine: &ChatEngine, user_id: &str) -> Result<Vec<FriendEntry>> {
    let db = engine.db();
    db.get_user_by_id(user_id)?.ok_or(ChatError::UserNotFound)?;

    let mut friends = Vec::new();
    for request in db.accepted_friendships(user_id)? {
        let friend_id = if request.requester_id == user_id {
            &request.recipient_id
        } else {
            &request.requester_id
        };
        let Some(friend) = db.get_user_by_id(friend_id)? else {
            continue;
        };
        let since = request.responded_at.as_deref().unwrap_or(&request.created_at);
        friends.push(FriendEntry {
            user_id: parse_uuid(&friend.id),
            username: friend.username,
            active: friend.active,
            friends_since: parse_timestamp(since),
        });
    }
    Ok(friends)
}

pub fn remove_friend(engine: &ChatEngine, user_id: &str, friend_username: &str) -> Result<()> {
    let db = engine.db();
    db.get_user_by_id(user_id)?.ok_or(ChatError::UserNotFound)?;
    let friend = db
        .get_user_by_username(friend_username)?
        .ok_or(ChatError::UserNotFound)?;

    let request = db
        .find_friend_request_between(user_id, &friend.id)?
        .filter(|r| r.status == "accepted")
        .ok_or(ChatError::FriendRequestNotFound)?;
    db.delete_friend_request(request.id)?;
    Ok(())
}
