use std::collections::BTreeSet;
use std::sync::Arc;

use nudge_core::{ChatEngine, ChatError};
use nudge_db::Database;
use uuid::Uuid;

fn engine() -> Arc<ChatEngine> {
    Arc::new(ChatEngine::new(Arc::new(Database::open_in_memory().unwrap())))
}

fn engine_on_disk(dir: &tempfile::TempDir) -> Arc<ChatEngine> {
    let db = Database::open(&dir.path().join("nudge.db")).unwrap();
    Arc::new(ChatEngine::new(Arc::new(db)))
}

fn add_user(engine: &ChatEngine, username: &str) -> String {
    let id = Uuid::new_v4().to_string();
    engine
        .db()
        .create_user(&id, username, "hash", None, None)
        .unwrap();
    id
}

#[test]
fn concurrent_resolution_yields_exactly_one_thread() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_on_disk(&dir);
    let alice = add_user(&engine, "alice");
    let bob = add_user(&engine, "bob");

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            let (a, b) = if i % 2 == 0 {
                (alice.clone(), bob.clone())
            } else {
                (bob.clone(), alice.clone())
            };
            std::thread::spawn(move || engine.resolve_or_create_direct_thread(&a, &b).unwrap())
        })
        .collect();

    let ids: BTreeSet<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids.len(), 1, "all callers must converge on one thread");
}

#[test]
fn concurrent_appends_produce_gap_free_indices() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_on_disk(&dir);
    let alice = add_user(&engine, "alice");
    let bob = add_user(&engine, "bob");
    let thread_id = engine.resolve_or_create_direct_thread(&alice, &bob).unwrap();

    let senders = 4;
    let per_sender = 5;
    let handles: Vec<_> = (0..senders)
        .map(|i| {
            let engine = engine.clone();
            let sender = if i % 2 == 0 { alice.clone() } else { bob.clone() };
            std::thread::spawn(move || {
                (0..per_sender)
                    .map(|n| {
                        engine
                            .append_message(thread_id, &sender, &format!("msg {i}-{n}"), None)
                            .unwrap()
                            .message_index
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut indices: Vec<i64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    indices.sort_unstable();
    let expected: Vec<i64> = (1..=(senders * per_sender) as i64).collect();
    assert_eq!(indices, expected, "indices must be exactly 1..=M");
}

#[test]
fn unread_count_excludes_own_messages_and_is_monotone() {
    let engine = engine();
    let alice = add_user(&engine, "alice");
    let bob = add_user(&engine, "bob");

    let m1 = engine.send_message("alice", "bob", "one", None).unwrap();
    let m2 = engine.send_message("alice", "bob", "two", None).unwrap();
    let tid = m1.thread_id;

    assert_eq!(engine.unread_count(tid, &bob).unwrap(), 2);
    assert_eq!(engine.unread_count(tid, &alice).unwrap(), 0);

    engine.mark_read(tid, &bob, m1.message_id).unwrap();
    assert_eq!(engine.unread_count(tid, &bob).unwrap(), 1);

    engine.mark_read(tid, &bob, m2.message_id).unwrap();
    assert_eq!(engine.unread_count(tid, &bob).unwrap(), 0);

    // Backward cursor move is a silent no-op.
    engine.mark_read(tid, &bob, m1.message_id).unwrap();
    assert_eq!(engine.unread_count(tid, &bob).unwrap(), 0);
}

#[test]
fn soft_delete_hides_message_for_one_viewer_only() {
    let engine = engine();
    let alice = add_user(&engine, "alice");
    let bob = add_user(&engine, "bob");

    engine.send_message("alice", "bob", "keep", None).unwrap();
    let deleted = engine.send_message("alice", "bob", "gone", None).unwrap();

    engine.soft_delete_message(deleted.message_id, &bob).unwrap();
    // Idempotent.
    engine.soft_delete_message(deleted.message_id, &bob).unwrap();

    let (_, bob_view) = engine
        .get_thread_messages("alice", "bob", Some(&bob))
        .unwrap();
    assert_eq!(bob_view.len(), 1);
    assert_eq!(bob_view[0].body, "keep");

    let (_, alice_view) = engine
        .get_thread_messages("alice", "bob", Some(&alice))
        .unwrap();
    assert_eq!(alice_view.len(), 2);
}

#[test]
fn hiding_a_thread_is_idempotent_and_per_viewer() {
    let engine = engine();
    let alice = add_user(&engine, "alice");
    let bob = add_user(&engine, "bob");
    let sent = engine.send_message("alice", "bob", "hi", None).unwrap();

    engine.hide_thread(sent.thread_id, &bob).unwrap();
    engine.hide_thread(sent.thread_id, &bob).unwrap();

    assert!(engine.list_inbox(&bob).unwrap().is_empty());
    assert_eq!(engine.list_inbox(&alice).unwrap().len(), 1);
}

#[test]
fn end_to_end_alice_and_bob() {
    let engine = engine();
    let alice = add_user(&engine, "alice");
    add_user(&engine, "bob");

    let first = engine.send_message("alice", "bob", "hi", None).unwrap();
    assert_eq!(first.message_index, 1);

    let second = engine.send_message("bob", "alice", "hello", None).unwrap();
    assert_eq!(second.thread_id, first.thread_id, "thread is reused");
    assert_eq!(second.message_index, 2);

    let inbox = engine.list_inbox(&alice).unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].other_username, "bob");
    assert_eq!(inbox[0].last_message, "hello");
    assert_eq!(inbox[0].unread_count, 1);

    // Fetching the thread as alice advances her cursor.
    engine
        .get_thread_messages("alice", "bob", Some(&alice))
        .unwrap();
    let inbox = engine.list_inbox(&alice).unwrap();
    assert_eq!(inbox[0].unread_count, 0);
}

#[test]
fn inbox_orders_by_latest_activity() {
    let engine = engine();
    let alice = add_user(&engine, "alice");
    add_user(&engine, "bob");
    add_user(&engine, "carol");

    engine.send_message("alice", "bob", "to bob", None).unwrap();
    let later = engine.send_message("carol", "alice", "from carol", None).unwrap();

    let inbox = engine.list_inbox(&alice).unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0].thread_id, later.thread_id);
    assert_eq!(inbox[0].other_username, "carol");
}

#[test]
fn thread_without_messages_has_no_inbox_entry() {
    let engine = engine();
    let alice = add_user(&engine, "alice");
    let bob = add_user(&engine, "bob");

    engine.resolve_or_create_direct_thread(&alice, &bob).unwrap();
    assert!(engine.list_inbox(&alice).unwrap().is_empty());
    assert!(engine.list_inbox(&bob).unwrap().is_empty());
}

#[test]
fn validation_errors_do_not_touch_storage() {
    let engine = engine();
    add_user(&engine, "alice");
    add_user(&engine, "bob");

    assert!(matches!(
        engine.send_message("alice", "bob", "   ", None),
        Err(ChatError::EmptyBody)
    ));
    assert!(matches!(
        engine.send_message("alice", "nobody", "hi", None),
        Err(ChatError::UserNotFound)
    ));
    // Neither attempt may have created a thread.
    let (thread_id, messages) = engine.get_thread_messages("alice", "bob", None).unwrap();
    assert_eq!(thread_id, None);
    assert!(messages.is_empty());
}

#[test]
fn only_participants_may_append_or_read_counts() {
    let engine = engine();
    add_user(&engine, "alice");
    add_user(&engine, "bob");
    let mallory = add_user(&engine, "mallory");

    let sent = engine.send_message("alice", "bob", "secret", None).unwrap();

    assert!(matches!(
        engine.append_message(sent.thread_id, &mallory, "hi", None),
        Err(ChatError::Forbidden)
    ));
    assert!(matches!(
        engine.unread_count(sent.thread_id, &mallory),
        Err(ChatError::Forbidden)
    ));
    assert!(matches!(
        engine.soft_delete_message(sent.message_id, &mallory),
        Err(ChatError::Forbidden)
    ));
    assert!(matches!(
        engine.hide_thread(sent.thread_id, &mallory),
        Err(ChatError::Forbidden)
    ));
}

#[test]
fn self_thread_query_is_rejected() {
    let engine = engine();
    let alice = add_user(&engine, "alice");
    add_user(&engine, "bob");
    engine.send_message("bob", "alice", "hi", None).unwrap();

    // Must not leak the bob/alice thread or touch alice's cursor.
    let err = engine
        .get_thread_messages("alice", "alice", Some(&alice))
        .unwrap_err();
    assert!(matches!(err, ChatError::InvalidArgument(_)));

    let inbox = engine.list_inbox(&alice).unwrap();
    assert_eq!(inbox[0].unread_count, 1, "cursor must not have advanced");
}

#[test]
fn reply_target_must_be_in_the_same_thread() {
    let engine = engine();
    add_user(&engine, "alice");
    add_user(&engine, "bob");
    add_user(&engine, "carol");

    let in_ab = engine.send_message("alice", "bob", "root", None).unwrap();
    let reply = engine
        .send_message("bob", "alice", "reply", Some(in_ab.message_id))
        .unwrap();
    assert_eq!(reply.thread_id, in_ab.thread_id);

    let err = engine
        .send_message("alice", "carol", "bad reply", Some(in_ab.message_id))
        .unwrap_err();
    assert!(matches!(err, ChatError::InvalidArgument(_)));
}
