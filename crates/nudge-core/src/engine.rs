use std::sync::Arc;

use chrono::{DateTime, Utc};
use nudge_db::models::{MessageRow, UserRow};
use nudge_db::{Database, is_constraint_violation, parse_timestamp};
use nudge_types::models::{MessageView, ThreadSummary};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ChatError, Result};
use crate::visibility;

/// Attempts for the two constraint-serialized operations (pair-key
/// insert, message_index insert) before giving up on the store.
const CONFLICT_RETRIES: usize = 3;

/// Canonical order-independent key for a direct thread's participant
/// pair. Backed by a UNIQUE constraint, so two concurrent first-contact
/// sends for the same pair serialize on the insert.
pub fn pair_key(user_a: &str, user_b: &str) -> String {
    if user_a <= user_b {
        format!("{user_a}:{user_b}")
    } else {
        format!("{user_b}:{user_a}")
    }
}

#[derive(Debug)]
pub struct SentMessage {
    pub thread_id: i64,
    pub message_id: i64,
    pub message_index: i64,
    pub created_at: DateTime<Utc>,
}

/// The thread resolution and message ordering engine. All methods are
/// synchronous; callers on an async runtime run them under
/// `spawn_blocking`.
pub struct ChatEngine {
    db: Arc<Database>,
}

impl ChatEngine {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    fn user_by_id(&self, user_id: &str) -> Result<UserRow> {
        self.db.get_user_by_id(user_id)?.ok_or(ChatError::UserNotFound)
    }

    fn user_by_username(&self, username: &str) -> Result<UserRow> {
        self.db
            .get_user_by_username(username)?
            .ok_or(ChatError::UserNotFound)
    }

    /// Find the direct thread between two users, or create it with
    /// both participant rows in one transaction. Idempotent under
    /// concurrent callers: a pair-key constraint violation means
    /// someone else won the race, so re-read and return theirs.
    pub fn resolve_or_create_direct_thread(&self, user_a: &str, user_b: &str) -> Result<i64> {
        if user_a == user_b {
            return Err(ChatError::invalid("cannot open a thread with yourself"));
        }
        self.user_by_id(user_a)?;
        self.user_by_id(user_b)?;

        let key = pair_key(user_a, user_b);
        for attempt in 0..CONFLICT_RETRIES {
            let existing = self.db.find_direct_threads(user_a, user_b)?;
            match existing.len() {
                0 => {}
                1 => return Ok(existing[0].id),
                n => {
                    // Duplicate threads for one pair should be impossible
                    // under the pair-key constraint; if legacy data has
                    // them, pick the earliest so sends keep working.
                    warn!(
                        "found {} direct threads for pair {}, using earliest (thread {})",
                        n, key, existing[0].id
                    );
                    return Ok(existing[0].id);
                }
            }

            match self.db.create_direct_thread(&key, user_a, user_a, user_b) {
                Ok(thread_id) => return Ok(thread_id),
                Err(err) if is_constraint_violation(&err) => {
                    debug!("pair {} lost creation race (attempt {}), re-reading", key, attempt + 1);
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ChatError::Storage(anyhow::anyhow!(
            "thread resolution for pair {key} did not converge after {CONFLICT_RETRIES} attempts"
        )))
    }

    /// Append a message to an existing thread. Assigns the next
    /// per-thread message_index and advances the sender's read cursor
    /// atomically; retries on an index collision with a concurrent
    /// sender.
    pub fn append_message(
        &self,
        thread_id: i64,
        sender_id: &str,
        body: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<SentMessage> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ChatError::EmptyBody);
        }
        self.db
            .get_thread(thread_id)?
            .ok_or(ChatError::ThreadNotFound)?;
        if self.db.get_participant(thread_id, sender_id)?.is_none() {
            return Err(ChatError::Forbidden);
        }
        if let Some(reply_to) = reply_to_message_id {
            let target = self
                .db
                .get_message(reply_to)?
                .ok_or(ChatError::MessageNotFound)?;
            if target.thread_id != thread_id {
                return Err(ChatError::invalid("reply target is in another thread"));
            }
        }

        let mut last_err = None;
        for attempt in 0..CONFLICT_RETRIES {
            match self.db.insert_message(thread_id, sender_id, body, reply_to_message_id) {
                Ok((message_id, message_index, created_at)) => {
                    return Ok(SentMessage {
                        thread_id,
                        message_id,
                        message_index,
                        created_at: parse_timestamp(&created_at),
                    });
                }
                Err(err) if is_constraint_violation(&err) => {
                    debug!(
                        "message_index collision in thread {} (attempt {}), retrying",
                        thread_id,
                        attempt + 1
                    );
                    last_err = Some(err);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ChatError::Storage(last_err.unwrap_or_else(|| {
            anyhow::anyhow!("message append to thread {thread_id} did not converge")
        })))
    }

    /// `send_message` as exposed to the HTTP layer: resolves both
    /// usernames, finds or creates their thread, and appends.
    pub fn send_message(
        &self,
        from_username: &str,
        to_username: &str,
        body: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<SentMessage> {
        let body_trimmed = body.trim();
        if body_trimmed.is_empty() {
            return Err(ChatError::EmptyBody);
        }
        let sender = self.user_by_username(from_username)?;
        let recipient = self.user_by_username(to_username)?;
        let thread_id = self.resolve_or_create_direct_thread(&sender.id, &recipient.id)?;
        self.append_message(thread_id, &sender.id, body_trimmed, reply_to_message_id)
    }

    /// Messages of the direct thread between two users, in
    /// message_index order. With a viewer: their soft-deleted messages
    /// are filtered out and their read cursor advances to the last
    /// message (forward only).
    pub fn get_thread_messages(
        &self,
        username_a: &str,
        username_b: &str,
        viewer_id: Option<&str>,
    ) -> Result<(Option<i64>, Vec<MessageView>)> {
        let user_a = self.user_by_username(username_a)?;
        let user_b = self.user_by_username(username_b)?;
        // A self-query would match any thread the user is in.
        if user_a.id == user_b.id {
            return Err(ChatError::invalid("cannot open a thread with yourself"));
        }

        let threads = self.db.find_direct_threads(&user_a.id, &user_b.id)?;
        let Some(thread) = threads.first() else {
            return Ok((None, Vec::new()));
        };

        let mut rows = self.db.messages_for_thread(thread.id)?;
        if let Some(viewer) = viewer_id {
            if self.db.get_participant(thread.id, viewer)?.is_some() {
                if let Some(last) = rows.last() {
                    self.db.advance_read_cursor(thread.id, viewer, last.id)?;
                }
            }
            rows = visibility::filter_messages(rows, viewer);
        }

        let messages = rows.into_iter().map(message_view).collect();
        Ok((Some(thread.id), messages))
    }

    pub fn unread_count(&self, thread_id: i64, viewer_id: &str) -> Result<i64> {
        if self.db.get_participant(thread_id, viewer_id)?.is_none() {
            return Err(ChatError::Forbidden);
        }
        Ok(self.db.unread_count(thread_id, viewer_id)?)
    }

    /// Advance the viewer's read cursor to a message in the thread.
    /// A backward move is a silent no-op.
    pub fn mark_read(&self, thread_id: i64, viewer_id: &str, upto_message_id: i64) -> Result<()> {
        if self.db.get_participant(thread_id, viewer_id)?.is_none() {
            return Err(ChatError::Forbidden);
        }
        let message = self
            .db
            .get_message(upto_message_id)?
            .ok_or(ChatError::MessageNotFound)?;
        if message.thread_id != thread_id {
            return Err(ChatError::MessageNotFound);
        }
        self.db.advance_read_cursor(thread_id, viewer_id, upto_message_id)?;
        Ok(())
    }

    /// The viewer's inbox: one summary per visible direct thread with
    /// at least one message, newest activity first. Read-only — never
    /// touches read cursors.
    pub fn list_inbox(&self, user_id: &str) -> Result<Vec<ThreadSummary>> {
        let viewer = self.user_by_id(user_id)?;

        let mut summaries = Vec::new();
        for thread_id in self.db.thread_ids_for_user(&viewer.id)? {
            let Some(thread) = self.db.get_thread(thread_id)? else {
                continue;
            };
            if thread.is_group || !visibility::thread_visible_to(&thread, &viewer.id) {
                continue;
            }

            let participants = self.db.get_participants(thread_id)?;
            let Some(other) = participants.iter().find(|p| p.user_id != viewer.id) else {
                continue;
            };
            let Some(other_user) = self.db.get_user_by_id(&other.user_id)? else {
                continue;
            };

            // A thread that was created but never messaged produces no
            // inbox entry.
            let Some(last) = self.db.last_message(thread_id)? else {
                continue;
            };

            let unread_count = self.db.unread_count(thread_id, &viewer.id)?;
            summaries.push(ThreadSummary {
                thread_id,
                other_user_id: parse_uuid(&other_user.id),
                other_username: other_user.username,
                last_message: last.body,
                last_message_at: parse_timestamp(&last.created_at),
                unread_count,
            });
        }

        // Chronological comparison on parsed timestamps, thread id as
        // the deterministic tie-break.
        summaries.sort_by(|a, b| {
            b.last_message_at
                .cmp(&a.last_message_at)
                .then(b.thread_id.cmp(&a.thread_id))
        });
        Ok(summaries)
    }

    /// Soft-delete a message for one viewer only. Idempotent; the
    /// other participant still sees the message.
    pub fn soft_delete_message(&self, message_id: i64, viewer_id: &str) -> Result<()> {
        let message = self
            .db
            .get_message(message_id)?
            .ok_or(ChatError::MessageNotFound)?;
        if self.db.get_participant(message.thread_id, viewer_id)?.is_none() {
            return Err(ChatError::Forbidden);
        }
        self.db.mark_message_deleted_for(message_id, viewer_id)?;
        Ok(())
    }

    /// Hide a thread from one viewer's inbox. Idempotent; the other
    /// participant's inbox is unaffected.
    pub fn hide_thread(&self, thread_id: i64, viewer_id: &str) -> Result<()> {
        self.db
            .get_thread(thread_id)?
            .ok_or(ChatError::ThreadNotFound)?;
        if self.db.get_participant(thread_id, viewer_id)?.is_none() {
            return Err(ChatError::Forbidden);
        }
        self.db.mark_thread_hidden_for(thread_id, viewer_id)?;
        Ok(())
    }
}

pub(crate) fn parse_uuid(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt user id '{}': {}", raw, e);
        Uuid::default()
    })
}

fn message_view(row: MessageRow) -> MessageView {
    MessageView {
        id: row.id,
        thread_id: row.thread_id,
        sender_id: parse_uuid(&row.sender_id),
        sender_username: row.sender_username,
        body: row.body,
        message_index: row.message_index,
        reply_to_message_id: row.reply_to_message_id,
        created_at: parse_timestamp(&row.created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::pair_key;

    #[test]
    fn pair_key_is_order_independent() {
        assert_eq!(pair_key("a", "b"), pair_key("b", "a"));
        assert_eq!(pair_key("a", "b"), "a:b");
    }
}
