//! Per-user notification rows. Creation happens from the friends and
//! invites flows (and the in-app notifier); this module covers the
//! read side and ownership checks.

use nudge_db::parse_timestamp;
use nudge_types::models::NotificationView;

use crate::engine::ChatEngine;
use crate::error::{ChatError, Result};

pub fn list(
    engine: &ChatEngine,
    user_id: &str,
    limit: u32,
    unread_only: bool,
) -> Result<Vec<NotificationView>> {
    let db = engine.db();
    db.get_user_by_id(user_id)?.ok_or(ChatError::UserNotFound)?;

    let mut views = Vec::new();
    for row in db.notifications_for_user(user_id, limit, unread_only)? {
        let from_username = match &row.from_user_id {
            Some(from) => db.get_user_by_id(from)?.map(|u| u.username),
            None => None,
        };
        views.push(NotificationView {
            id: row.id,
            kind: row.kind,
            title: row.title,
            body: row.body,
            from_username,
            related_id: row.related_id,
            is_read: row.is_read,
            created_at: parse_timestamp(&row.created_at),
        });
    }
    Ok(views)
}

pub fn unread_count(engine: &ChatEngine, user_id: &str) -> Result<i64> {
    let db = engine.db();
    db.get_user_by_id(user_id)?.ok_or(ChatError::UserNotFound)?;
    Ok(db.notification_unread_count(user_id)?)
}

/// Marks only the caller's notifications read; foreign ids in the
/// list are ignored.
pub fn mark_read(engine: &ChatEngine, user_id: &str, ids: &[i64]) -> Result<usize> {
    Ok(engine.db().mark_notifications_read(user_id, ids)?)
}

pub fn mark_all_read(engine: &ChatEngine, user_id: &str) -> Result<usize> {
    Ok(engine.db().mark_all_notifications_read(user_id)?)
}

pub fn delete(engine: &ChatEngine, user_id: &str, notification_id: i64) -> Result<()> {
    let db = engine.db();
    let notification = db
        .get_notification(notification_id)?
        .ok_or(ChatError::NotificationNotFound)?;
    if notification.user_id != user_id {
        return Err(ChatError::Forbidden);
    }
    db.delete_notification(notification_id)?;
    Ok(())
}
