//! Invite links connecting two recipients. Each recipient may be
//! named by username, email, or phone; once both accept, the direct
//! thread is created through the thread resolver so pair uniqueness
//! holds even if the two users already messaged each other.

use chrono::{DateTime, Duration, Utc};
use nudge_db::models::{InviteRow, UserRow};
use nudge_db::parse_timestamp;
use nudge_types::api::InviteRecipient;
use rand::Rng;
use tracing::info;

use crate::engine::ChatEngine;
use crate::error::{ChatError, Result};

const CODE_LENGTH: usize = 8;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_EXPIRY_HOURS: i64 = 720;

pub struct InviteCreated {
    pub code: String,
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct AcceptOutcome {
    pub both_accepted: bool,
    pub thread_id: Option<i64>,
}

fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

fn validate_recipient(recipient: &InviteRecipient, which: u8) -> Result<()> {
    let has_identifier = [&recipient.username, &recipient.email, &recipient.phone]
        .iter()
        .any(|id| id.as_deref().is_some_and(|s| !s.trim().is_empty()));
    if has_identifier {
        Ok(())
    } else {
        Err(ChatError::invalid(format!(
            "recipient {which} must have at least one identifier (username, email, or phone)"
        )))
    }
}

fn matches_user(recipient: &InviteRecipient, user: &UserRow) -> bool {
    if let Some(username) = &recipient.username {
        if user.username.eq_ignore_ascii_case(username) {
            return true;
        }
    }
    if let (Some(email), Some(user_email)) = (&recipient.email, &user.email) {
        if email == user_email {
            return true;
        }
    }
    if let (Some(phone), Some(user_phone)) = (&recipient.phone, &user.phone) {
        if phone == user_phone {
            return true;
        }
    }
    false
}

fn resolve_recipient(engine: &ChatEngine, recipient: &InviteRecipient) -> Result<Option<UserRow>> {
    let db = engine.db();
    if let Some(username) = &recipient.username {
        if let Some(user) = db.get_user_by_username(username)? {
            return Ok(Some(user));
        }
    }
    if let Some(email) = &recipient.email {
        if let Some(user) = db.get_user_by_email(email)? {
            return Ok(Some(user));
        }
    }
    if let Some(phone) = &recipient.phone {
        if let Some(user) = db.get_user_by_phone(phone)? {
            return Ok(Some(user));
        }
    }
    Ok(None)
}

pub fn create(
    engine: &ChatEngine,
    created_by: &str,
    recipient1: &InviteRecipient,
    recipient2: &InviteRecipient,
    expires_in_hours: Option<i64>,
) -> Result<InviteCreated> {
    validate_recipient(recipient1, 1)?;
    validate_recipient(recipient2, 2)?;
    // Omitted expiry means the link never expires.
    let expires_at = match expires_in_hours {
        Some(hours) if !(1..=MAX_EXPIRY_HOURS).contains(&hours) => {
            return Err(ChatError::invalid(format!(
                "expires_in_hours must be between 1 and {MAX_EXPIRY_HOURS}"
            )));
        }
        Some(hours) => Some(Utc::now() + Duration::hours(hours)),
        None => None,
    };

    let db = engine.db();
    db.get_user_by_id(created_by)?.ok_or(ChatError::UserNotFound)?;

    let mut code = generate_code();
    while db.get_invite_by_code(&code)?.is_some() {
        code = generate_code();
    }

    let expires_text = expires_at.map(|t| t.to_rfc3339());
    db.insert_invite(
        &code,
        created_by,
        (
            recipient1.username.as_deref(),
            recipient1.email.as_deref(),
            recipient1.phone.as_deref(),
        ),
        (
            recipient2.username.as_deref(),
            recipient2.email.as_deref(),
            recipient2.phone.as_deref(),
        ),
        expires_text.as_deref(),
    )?;

    info!("invite {} created by {}", code, created_by);
    Ok(InviteCreated { code, expires_at })
}

pub fn accept(
    engine: &ChatEngine,
    code: &str,
    user_id: &str,
    recipient_number: u8,
) -> Result<AcceptOutcome> {
    if !(1..=2).contains(&recipient_number) {
        return Err(ChatError::invalid("recipient_number must be 1 or 2"));
    }

    let db = engine.db();
    let invite = db.get_invite_by_code(code)?.ok_or(ChatError::InviteNotFound)?;

    if let Some(expires_at) = &invite.expires_at {
        if Utc::now() > parse_timestamp(expires_at) {
            return Err(ChatError::invalid("invite link has expired"));
        }
    }

    let user = db.get_user_by_id(user_id)?.ok_or(ChatError::UserNotFound)?;

    let (recipient, already_accepted) = recipient_slot(&invite, recipient_number);
    if already_accepted {
        return Err(ChatError::conflict(format!(
            "recipient {recipient_number} has already accepted"
        )));
    }
    if !matches_user(&recipient, &user) {
        return Err(ChatError::Forbidden);
    }

    db.set_invite_accepted(invite.id, recipient_number)?;

    // Both slots accepted: materialize the thread (through the
    // resolver, so an existing thread between the pair is reused).
    let other_accepted = match recipient_number {
        1 => invite.recipient2_accepted,
        _ => invite.recipient1_accepted,
    };
    if other_accepted && invite.thread_id.is_none() {
        let (other_recipient, _) = recipient_slot(&invite, 3 - recipient_number);
        if let Some(other_user) = resolve_recipient(engine, &other_recipient)? {
            let thread_id = engine.resolve_or_create_direct_thread(&user.id, &other_user.id)?;
            db.set_invite_thread(invite.id, thread_id)?;
            info!("invite {} completed, thread {}", invite.code, thread_id);
            return Ok(AcceptOutcome {
                both_accepted: true,
                thread_id: Some(thread_id),
            });
        }
    }

    Ok(AcceptOutcome {
        both_accepted: other_accepted,
        thread_id: invite.thread_id,
    })
}

pub fn status(engine: &ChatEngine, code: &str) -> Result<InviteRow> {
    engine
        .db()
        .get_invite_by_code(code)?
        .ok_or(ChatError::InviteNotFound)
}

fn recipient_slot(invite: &InviteRow, number: u8) -> (InviteRecipient, bool) {
    match number {
        1 => (
            InviteRecipient {
                username: invite.recipient1_username.clone(),
                email: invite.recipient1_email.clone(),
                phone: invite.recipient1_phone.clone(),
            },
            invite.recipient1_accepted,
        ),
        _ => (
            InviteRecipient {
                username: invite.recipient2_username.clone(),
                email: invite.recipient2_email.clone(),
                phone: invite.recipient2_phone.clone(),
            },
            invite.recipient2_accepted,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_shape() {
        let code = generate_code();
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.bytes().all(|b| CODE_CHARSET.contains(&b)));
    }

    #[test]
    fn recipient_needs_an_identifier() {
        let empty = InviteRecipient {
            username: None,
            email: Some("  ".into()),
            phone: None,
        };
        assert!(validate_recipient(&empty, 1).is_err());
        let ok = InviteRecipient {
            username: Some("alice".into()),
            email: None,
            phone: None,
        };
        assert!(validate_recipient(&ok, 1).is_ok());
    }
}
