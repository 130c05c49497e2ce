//! Per-viewer visibility: message soft-deletes and thread hides are
//! membership tests against the row's id-set, never mutations. The
//! same rows stay fully visible to the other participant.

use nudge_db::models::{MessageRow, ThreadRow};

pub fn message_visible_to(message: &MessageRow, viewer_id: &str) -> bool {
    !message.deleted_for.contains(viewer_id)
}

pub fn thread_visible_to(thread: &ThreadRow, viewer_id: &str) -> bool {
    !thread.hidden_for.contains(viewer_id)
}

pub fn filter_messages(messages: Vec<MessageRow>, viewer_id: &str) -> Vec<MessageRow> {
    messages
        .into_iter()
        .filter(|m| message_visible_to(m, viewer_id))
        .collect()
}

pub fn filter_threads(threads: Vec<ThreadRow>, viewer_id: &str) -> Vec<ThreadRow> {
    threads
        .into_iter()
        .filter(|t| thread_visible_to(t, viewer_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nudge_types::IdSet;

    fn message(deleted_for: IdSet) -> MessageRow {
        MessageRow {
            id: 1,
            thread_id: 1,
            sender_id: "a".into(),
            sender_username: "alice".into(),
            body: "hi".into(),
            message_index: 1,
            reply_to_message_id: None,
            deleted_for,
            created_at: "2026-01-01T00:00:00+00:00".into(),
        }
    }

    #[test]
    fn deleted_message_hidden_only_for_deleter() {
        let mut set = IdSet::new();
        set.insert("b");
        let msg = message(set);
        assert!(!message_visible_to(&msg, "b"));
        assert!(message_visible_to(&msg, "a"));
    }

    fn thread(id: i64, hidden_for: IdSet) -> ThreadRow {
        ThreadRow {
            id,
            is_group: false,
            created_by: "a".into(),
            pair_key: Some("a:b".into()),
            hidden_for,
            created_at: "2026-01-01T00:00:00+00:00".into(),
        }
    }

    #[test]
    fn hidden_thread_filtered_only_for_hider() {
        let mut set = IdSet::new();
        set.insert("b");

        let for_b = filter_threads(vec![thread(1, IdSet::new()), thread(2, set.clone())], "b");
        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].id, 1);

        let for_a = filter_threads(vec![thread(1, IdSet::new()), thread(2, set)], "a");
        assert_eq!(for_a.len(), 2);
    }

    #[test]
    fn filter_is_pure_and_order_preserving() {
        let mut set = IdSet::new();
        set.insert("v");
        let mut kept = message(IdSet::new());
        kept.id = 2;
        let dropped = message(set);
        let out = filter_messages(vec![dropped, kept], "v");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 2);
    }
}
