use std::sync::Arc;

use nudge_core::{ChatEngine, ChatError, friends, invites, notifications};
use nudge_db::Database;
use nudge_types::api::InviteRecipient;
use nudge_types::models::FriendStatus;
use uuid::Uuid;

fn engine() -> ChatEngine {
    ChatEngine::new(Arc::new(Database::open_in_memory().unwrap()))
}

fn add_user(engine: &ChatEngine, username: &str) -> String {
    let id = Uuid::new_v4().to_string();
    engine
        .db()
        .create_user(&id, username, "hash", Some(&format!("{username}@example.com")), None)
        .unwrap();
    id
}

fn recipient(username: &str) -> InviteRecipient {
    InviteRecipient {
        username: Some(username.to_string()),
        email: None,
        phone: None,
    }
}

#[test]
fn friend_request_lifecycle() {
    let engine = engine();
    let alice = add_user(&engine, "alice");
    let bob = add_user(&engine, "bob");

    let request_id = friends::send_request(&engine, "alice", "bob").unwrap();

    let (status, _) = friends::relationship_status(&engine, "alice", "bob").unwrap();
    assert_eq!(status, FriendStatus::PendingSent);
    let (status, _) = friends::relationship_status(&engine, "bob", "alice").unwrap();
    assert_eq!(status, FriendStatus::PendingReceived);

    // A duplicate while pending is a conflict.
    assert!(matches!(
        friends::send_request(&engine, "alice", "bob"),
        Err(ChatError::Conflict(_))
    ));
    // Only the recipient may respond.
    assert!(matches!(
        friends::respond(&engine, &alice, request_id, true),
        Err(ChatError::Forbidden)
    ));

    let status = friends::respond(&engine, &bob, request_id, true).unwrap();
    assert_eq!(status, FriendStatus::Friends);

    let list = friends::friends_list(&engine, &alice).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].username, "bob");

    friends::remove_friend(&engine, &alice, "bob").unwrap();
    let (status, _) = friends::relationship_status(&engine, "alice", "bob").unwrap();
    assert_eq!(status, FriendStatus::None);
}

#[test]
fn rejected_request_can_be_resent() {
    let engine = engine();
    add_user(&engine, "alice");
    let bob = add_user(&engine, "bob");

    let request_id = friends::send_request(&engine, "alice", "bob").unwrap();
    friends::respond(&engine, &bob, request_id, false).unwrap();

    let resent_id = friends::send_request(&engine, "alice", "bob").unwrap();
    assert_eq!(resent_id, request_id, "the pair keeps a single request row");
    let (status, _) = friends::relationship_status(&engine, "alice", "bob").unwrap();
    assert_eq!(status, FriendStatus::PendingSent);
}

#[test]
fn friend_flow_fans_out_notifications() {
    let engine = engine();
    let alice = add_user(&engine, "alice");
    let bob = add_user(&engine, "bob");

    let request_id = friends::send_request(&engine, "alice", "bob").unwrap();
    assert_eq!(notifications::unread_count(&engine, &bob).unwrap(), 1);

    friends::respond(&engine, &bob, request_id, true).unwrap();
    assert_eq!(notifications::unread_count(&engine, &alice).unwrap(), 1);

    let listed = notifications::list(&engine, &alice, 20, true).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].kind, "friend_accepted");
    assert_eq!(listed[0].from_username.as_deref(), Some("bob"));

    notifications::mark_all_read(&engine, &alice).unwrap();
    assert_eq!(notifications::unread_count(&engine, &alice).unwrap(), 0);
}

#[test]
fn notification_delete_checks_ownership() {
    let engine = engine();
    let alice = add_user(&engine, "alice");
    let bob = add_user(&engine, "bob");

    friends::send_request(&engine, "alice", "bob").unwrap();
    let listed = notifications::list(&engine, &bob, 20, false).unwrap();
    let id = listed[0].id;

    assert!(matches!(
        notifications::delete(&engine, &alice, id),
        Err(ChatError::Forbidden)
    ));
    notifications::delete(&engine, &bob, id).unwrap();
    assert!(matches!(
        notifications::delete(&engine, &bob, id),
        Err(ChatError::NotificationNotFound)
    ));
}

#[test]
fn invite_acceptance_creates_thread_once() {
    let engine = engine();
    let creator = add_user(&engine, "carol");
    let alice = add_user(&engine, "alice");
    let bob = add_user(&engine, "bob");

    let created = invites::create(
        &engine,
        &creator,
        &recipient("alice"),
        &recipient("bob"),
        Some(48),
    )
    .unwrap();

    let outcome = invites::accept(&engine, &created.code, &alice, 1).unwrap();
    assert!(!outcome.both_accepted);
    assert_eq!(outcome.thread_id, None);

    // Accepting the same slot twice is a conflict.
    assert!(matches!(
        invites::accept(&engine, &created.code, &alice, 1),
        Err(ChatError::Conflict(_))
    ));
    // The wrong user cannot accept a slot.
    assert!(matches!(
        invites::accept(&engine, &created.code, &alice, 2),
        Err(ChatError::Forbidden)
    ));

    let outcome = invites::accept(&engine, &created.code, &bob, 2).unwrap();
    assert!(outcome.both_accepted);
    let thread_id = outcome.thread_id.unwrap();

    // The invite thread and a direct send share the same thread.
    let sent = engine.send_message("alice", "bob", "hi", None).unwrap();
    assert_eq!(sent.thread_id, thread_id);

    let row = invites::status(&engine, &created.code).unwrap();
    assert!(row.recipient1_accepted && row.recipient2_accepted);
    assert_eq!(row.thread_id, Some(thread_id));
}

#[test]
fn invite_without_expiry_never_expires() {
    let engine = engine();
    let creator = add_user(&engine, "carol");
    let alice = add_user(&engine, "alice");
    add_user(&engine, "bob");

    let created = invites::create(
        &engine,
        &creator,
        &recipient("alice"),
        &recipient("bob"),
        None,
    )
    .unwrap();
    assert_eq!(created.expires_at, None);

    let row = invites::status(&engine, &created.code).unwrap();
    assert_eq!(row.expires_at, None);

    // Still redeemable.
    invites::accept(&engine, &created.code, &alice, 1).unwrap();
}

#[test]
fn invite_requires_recipient_identifiers() {
    let engine = engine();
    let creator = add_user(&engine, "carol");
    let empty = InviteRecipient {
        username: None,
        email: None,
        phone: None,
    };
    assert!(matches!(
        invites::create(&engine, &creator, &empty, &recipient("bob"), None),
        Err(ChatError::InvalidArgument(_))
    ));
}

#[test]
fn unknown_invite_code_is_not_found() {
    let engine = engine();
    let alice = add_user(&engine, "alice");
    assert!(matches!(
        invites::accept(&engine, "NOPE1234", &alice, 1),
        Err(ChatError::InviteNotFound)
    ));
}
