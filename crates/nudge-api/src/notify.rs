//! Invite delivery glue. Each invite recipient gets exactly one
//! channel, picked by which identifiers they provided: a username
//! that resolves to an account gets an in-app notification, otherwise
//! an email address wins over a phone number. Email and SMS delivery
//! adapters are stubs that log; provider integration lives outside
//! this service.

use anyhow::Result;
use nudge_db::Database;
use nudge_types::api::InviteRecipient;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    InApp { user_id: String },
    Email { address: String },
    Sms { number: String },
}

impl Channel {
    /// Pick the delivery channel for a recipient, preferring in-app.
    /// Returns None when no identifier is usable (the invite is still
    /// valid; the recipient can redeem the code out of band).
    pub fn select(db: &Database, recipient: &InviteRecipient) -> Result<Option<Channel>> {
        if let Some(username) = recipient.username.as_deref() {
            if let Some(user) = db.get_user_by_username(username)? {
                return Ok(Some(Channel::InApp { user_id: user.id }));
            }
        }
        if let Some(address) = recipient.email.as_deref() {
            if !address.trim().is_empty() {
                return Ok(Some(Channel::Email {
                    address: address.to_string(),
                }));
            }
        }
        if let Some(number) = recipient.phone.as_deref() {
            if !number.trim().is_empty() {
                return Ok(Some(Channel::Sms {
                    number: number.to_string(),
                }));
            }
        }
        Ok(None)
    }

    pub fn deliver(&self, db: &Database, from_username: &str, code: &str) -> Result<()> {
        match self {
            Channel::InApp { user_id } => {
                db.insert_notification(
                    user_id,
                    "invite",
                    "New Invite",
                    &format!("{from_username} invited you to connect (code {code})"),
                    None,
                    None,
                )?;
            }
            Channel::Email { address } => {
                info!("invite {} queued for email delivery to {}", code, address);
            }
            Channel::Sms { number } => {
                info!("invite {} queued for SMS delivery to {}", code, number);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient(
        username: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> InviteRecipient {
        InviteRecipient {
            username: username.map(Into::into),
            email: email.map(Into::into),
            phone: phone.map(Into::into),
        }
    }

    #[test]
    fn prefers_in_app_for_known_usernames() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "alice", "hash", None, None).unwrap();

        let channel = Channel::select(&db, &recipient(Some("alice"), Some("a@x.com"), None))
            .unwrap()
            .unwrap();
        assert_eq!(channel, Channel::InApp { user_id: "u1".into() });
    }

    #[test]
    fn falls_back_to_email_then_sms() {
        let db = Database::open_in_memory().unwrap();

        let channel = Channel::select(&db, &recipient(Some("ghost"), Some("a@x.com"), Some("+1")))
            .unwrap()
            .unwrap();
        assert_eq!(channel, Channel::Email { address: "a@x.com".into() });

        let channel = Channel::select(&db, &recipient(None, None, Some("+15550100")))
            .unwrap()
            .unwrap();
        assert_eq!(channel, Channel::Sms { number: "+15550100".into() });

        assert_eq!(Channel::select(&db, &recipient(None, None, None)).unwrap(), None);
    }
}
